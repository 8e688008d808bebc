//! wgpu implementation of [`GraphicsContext`].
//!
//! Calls made by the [`Renderer`](super::Renderer) are recorded during the
//! frame: every `draw_indexed` snapshots the bound program, buffers, textures
//! and uniform block into a queued draw. [`WgpuContext::finish_frame`] then
//! encodes all queued draws into one render pass over the given target.
//!
//! Deleted buffers and textures stay alive until the frame that used them has
//! been submitted.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use winit::window::Window;

use crate::gfx::math::{matrix::OPENGL_TO_WGPU_MATRIX, Color};
use crate::gfx::resources::texture::{TextureUpload, WrapMode};
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::resources::{MagFilter, MinFilter};
use crate::wgpu_utils::{self, UniformBuffer};

use super::context::{
    BufferHandle, GraphicsContext, ProgramHandle, RenderError, ShaderHandle, ShaderStage,
    TextureHandle, Uniform, VertexSlot,
};
use super::shaders;

/// Number of texture units exposed to programs.
pub const TEXTURE_UNITS: usize = 4;

/// GPU layout of the shared uniform block. Mirrors `Uniforms` in
/// `shaders/uniforms.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub view_projection: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
    /// Columns padded to vec4
    pub normal_matrix: [[f32; 4]; 3],
    pub light_position: [f32; 3],
    pub light_radius: f32,
    pub light_direction: [f32; 3],
    pub shininess: f32,
    pub camera_position: [f32; 3],
    pub _pad: f32,
    pub light_color: [f32; 4],
    pub color: [f32; 4],
    pub ambient_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub ambient_coef: f32,
    pub specular_coef: f32,
    pub displacement_coef: f32,
    pub use_vertex_color: u32,
    pub use_maps: [u32; TEXTURE_UNITS],
}

impl Default for UniformBlock {
    fn default() -> Self {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Self {
            view_projection: identity,
            world: identity,
            normal_matrix: [identity[0], identity[1], identity[2]],
            ..Zeroable::zeroed()
        }
    }
}

impl UniformBlock {
    /// Writes a named uniform into its slot. Returns false when the name has
    /// no slot or the value has the wrong type.
    pub fn set(&mut self, name: &str, value: &Uniform) -> bool {
        match (name, *value) {
            ("uViewProjectionMatrix", Uniform::Mat4(m)) => {
                self.view_projection = (OPENGL_TO_WGPU_MATRIX * m).into()
            }
            ("uWorldMatrix", Uniform::Mat4(m)) => self.world = m.into(),
            ("uNormalMatrix", Uniform::Mat3(m)) => {
                self.normal_matrix = [
                    [m.x.x, m.x.y, m.x.z, 0.0],
                    [m.y.x, m.y.y, m.y.z, 0.0],
                    [m.z.x, m.z.y, m.z.z, 0.0],
                ]
            }
            ("uLightPosition", Uniform::Vec3(v)) => self.light_position = v.into(),
            ("uLightDirection", Uniform::Vec3(v)) => self.light_direction = v.into(),
            ("uCameraPosition", Uniform::Vec3(v)) => self.camera_position = v.into(),
            ("uLightRadius", Uniform::Float(f)) => self.light_radius = f,
            ("uLightColor", Uniform::Vec4(v)) => self.light_color = v.into(),
            ("uColor", Uniform::Vec4(v)) => self.color = v.into(),
            ("uAmbientColor", Uniform::Vec4(v)) => self.ambient_color = v.into(),
            ("uDiffuseColor", Uniform::Vec4(v)) => self.diffuse_color = v.into(),
            ("uSpecularColor", Uniform::Vec4(v)) => self.specular_color = v.into(),
            ("uShininess", Uniform::Float(f)) => self.shininess = f,
            ("uAmbientCoef", Uniform::Float(f)) => self.ambient_coef = f,
            ("uSpecularCoef", Uniform::Float(f)) => self.specular_coef = f,
            ("uDisplacementCoef", Uniform::Float(f)) => self.displacement_coef = f,
            ("uUseVertexColor", Uniform::Bool(b)) => self.use_vertex_color = b as u32,
            ("uUseDiffuseMap", Uniform::Bool(b)) => self.use_maps[0] = b as u32,
            ("uUseSpecularMap", Uniform::Bool(b)) => self.use_maps[1] = b as u32,
            ("uUseNormalMap", Uniform::Bool(b)) => self.use_maps[2] = b as u32,
            ("uUseDisplacementMap", Uniform::Bool(b)) => self.use_maps[3] = b as u32,
            // Sampler units are fixed by the bind group layout
            ("uDiffuseMap" | "uSpecularMap" | "uNormalMap" | "uDisplacementMap", Uniform::Int(_)) => {}
            _ => return false,
        }
        true
    }
}

fn vertex_format(slot: VertexSlot) -> wgpu::VertexFormat {
    match slot.components() {
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

struct QueuedDraw {
    program: ProgramHandle,
    vertex_buffers: [BufferHandle; 5],
    index_buffer: BufferHandle,
    index_count: u32,
    uniforms: wgpu::BindGroup,
    textures: wgpu::BindGroup,
}

/// A window surface paired with its configuration.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures the surface. Zero sizes are ignored.
    pub fn resize(&mut self, context: &mut WgpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&context.device, &self.config);
        context.resize(width, height);
    }

    /// Next frame to draw into.
    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, RenderError> {
        self.surface
            .get_current_texture()
            .map_err(|e| RenderError::Backend(format!("failed to acquire surface texture: {}", e)))
    }
}

/// [`GraphicsContext`] backed by a wgpu device.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    size: (u32, u32),
    depth: TextureResource,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    fallback_texture: TextureResource,

    shaders: HashMap<ShaderHandle, (ShaderStage, wgpu::ShaderModule)>,
    programs: HashMap<ProgramHandle, wgpu::RenderPipeline>,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    textures: HashMap<TextureHandle, TextureResource>,
    retired_buffers: HashMap<BufferHandle, wgpu::Buffer>,
    retired_textures: Vec<TextureResource>,
    uniform_buffers: Vec<UniformBuffer<UniformBlock>>,

    current_program: Option<ProgramHandle>,
    vertex_bindings: [Option<BufferHandle>; 5],
    index_binding: Option<BufferHandle>,
    texture_units: [Option<TextureHandle>; TEXTURE_UNITS],
    block: UniformBlock,
    pending_clear: Option<Color>,
    queued: Vec<QueuedDraw>,
    next_id: u32,
}

impl WgpuContext {
    /// Creates a context over an existing device.
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `queue` - WGPU queue for uploads and submission
    /// * `target_format` - Color format of the render targets
    /// * `width` - Initial target width in pixels
    /// * `height` - Initial target height in pixels
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Block Layout"),
            entries: &[wgpu_utils::entry(0, wgpu_utils::uniform())],
        });
        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_UNITS as u32)
            .flat_map(|unit| {
                [
                    wgpu_utils::entry(unit * 2, wgpu_utils::texture_2d()),
                    wgpu_utils::entry(
                        unit * 2 + 1,
                        wgpu_utils::sampler(wgpu::SamplerBindingType::Filtering),
                    ),
                ]
            })
            .collect();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Texture Layout"),
            entries: &texture_entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let fallback_texture = TextureResource::from_upload(
            &device,
            &queue,
            &TextureUpload {
                label: "fallback".into(),
                width: 1,
                height: 1,
                pixels: Color::WHITE.to_rgba8().to_vec(),
                wrap_s: WrapMode::ClampToEdge,
                wrap_t: WrapMode::ClampToEdge,
                min_filter: MinFilter::Nearest,
                mag_filter: MagFilter::Nearest,
                generate_mipmaps: false,
            },
        );
        let depth = TextureResource::create_depth_texture(&device, width, height, "depth_texture");

        log::info!("wgpu context ready: {}x{} {:?}", width, height, target_format);

        Self {
            device,
            queue,
            target_format,
            size: (width, height),
            depth,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            fallback_texture,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            retired_buffers: HashMap::new(),
            retired_textures: Vec::new(),
            uniform_buffers: Vec::new(),
            current_program: None,
            vertex_bindings: [None; 5],
            index_binding: None,
            texture_units: [None; TEXTURE_UNITS],
            block: UniformBlock::default(),
            pending_clear: None,
            queued: Vec::new(),
            next_id: 0,
        }
    }

    async fn request_device(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Backend(format!("failed to request adapter: {}", e)))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::Backend(format!("failed to request device: {}", e)))?;
        Ok((adapter, device, queue))
    }

    /// Creates a context without a window. Render with
    /// [`create_offscreen_target`](Self::create_offscreen_target) and
    /// [`finish_frame`](Self::finish_frame).
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let (_, device, queue) = pollster::block_on(Self::request_device(&instance, None))?;
        Ok(Self::new(
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            width,
            height,
        ))
    }

    /// Creates a context and a configured surface for `window`.
    pub async fn for_window(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<(Self, WindowSurface), RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Backend(format!("failed to create surface: {}", e)))?;
        let (adapter, device, queue) = Self::request_device(&instance, Some(&surface)).await?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| RenderError::Backend("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let context = Self::new(device, queue, format, config.width, config.height);
        Ok((context, WindowSurface { surface, config }))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Recreates the depth buffer for a new target size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.size {
            return;
        }
        self.size = (width, height);
        self.depth = TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
    }

    /// Color target matching the context size and format.
    pub fn create_offscreen_target(&self) -> TextureResource {
        TextureResource::create_render_target(
            &self.device,
            self.size.0,
            self.size.1,
            self.target_format,
            "offscreen_target",
        )
    }

    /// Number of draws recorded since the last [`finish_frame`](Self::finish_frame).
    pub fn queued_draws(&self) -> usize {
        self.queued.len()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn with_error_scope<T>(&self, create: impl FnOnce() -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }

    fn lookup_buffer(&self, handle: BufferHandle) -> Result<&wgpu::Buffer, RenderError> {
        self.buffers
            .get(&handle)
            .or_else(|| self.retired_buffers.get(&handle))
            .ok_or(RenderError::UnknownHandle {
                kind: "buffer",
                id: handle.0,
            })
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> BufferHandle {
        use wgpu::util::DeviceExt;
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, buffer);
        handle
    }

    fn texture_bind_group(&self) -> wgpu::BindGroup {
        let units: Vec<&TextureResource> = self
            .texture_units
            .iter()
            .map(|unit| {
                unit.and_then(|handle| self.textures.get(&handle))
                    .unwrap_or(&self.fallback_texture)
            })
            .collect();
        let entries: Vec<wgpu::BindGroupEntry> = units
            .iter()
            .enumerate()
            .flat_map(|(unit, texture)| {
                [
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: unit as u32 * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Textures"),
            layout: &self.texture_layout,
            entries: &entries,
        })
    }

    /// Encodes every queued draw into one pass over `target` and submits it.
    ///
    /// Color and depth are cleared when [`GraphicsContext::clear`] was called
    /// this frame and loaded otherwise.
    pub fn finish_frame(&mut self, target: &wgpu::TextureView) -> Result<usize, RenderError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let (color_load, depth_load) = match self.pending_clear.take() {
            Some(color) => (wgpu::LoadOp::Clear(clear_color(color)), wgpu::LoadOp::Clear(1.0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &self.queued {
                let pipeline = self.programs.get(&draw.program).ok_or(RenderError::UnknownHandle {
                    kind: "program",
                    id: draw.program.0,
                })?;
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &draw.uniforms, &[]);
                pass.set_bind_group(1, &draw.textures, &[]);
                for (slot, handle) in draw.vertex_buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, self.lookup_buffer(*handle)?.slice(..));
                }
                pass.set_index_buffer(
                    self.lookup_buffer(draw.index_buffer)?.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        let draws = self.queued.len();
        self.queued.clear();
        self.retired_buffers.clear();
        self.retired_textures.clear();
        log::trace!("Submitted frame with {} draws", draws);
        Ok(draws)
    }
}

impl GraphicsContext for WgpuContext {
    fn clear(&mut self, color: Color) {
        self.pending_clear = Some(color);
        self.queued.clear();
    }

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, RenderError> {
        let label = match stage {
            ShaderStage::Vertex => "Vertex Shader",
            ShaderStage::Fragment => "Fragment Shader",
        };
        let module = self
            .with_error_scope(|| {
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })
            .map_err(|message| RenderError::ShaderCompile { stage, message })?;
        let handle = ShaderHandle(self.next_id());
        self.shaders.insert(handle, (stage, module));
        Ok(handle)
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, RenderError> {
        let module = |handle: ShaderHandle, expected: ShaderStage| match self.shaders.get(&handle) {
            Some((stage, module)) if *stage == expected => Ok(module),
            Some((stage, _)) => Err(RenderError::ProgramLink(format!(
                "shader {} is a {:?} shader, expected {:?}",
                handle.0, stage, expected
            ))),
            None => Err(RenderError::UnknownHandle {
                kind: "shader",
                id: handle.0,
            }),
        };
        let vertex_module = module(vertex, ShaderStage::Vertex)?;
        let fragment_module = module(fragment, ShaderStage::Fragment)?;

        let attributes: Vec<wgpu::VertexAttribute> = VertexSlot::ALL
            .iter()
            .map(|slot| wgpu::VertexAttribute {
                format: vertex_format(*slot),
                offset: 0,
                shader_location: slot.location(),
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = VertexSlot::ALL
            .iter()
            .zip(&attributes)
            .map(|(slot, attribute)| wgpu::VertexBufferLayout {
                array_stride: (slot.components() as usize * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(attribute),
            })
            .collect();

        let pipeline = self
            .with_error_scope(|| {
                self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Material Pipeline"),
                    layout: Some(&self.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: vertex_module,
                        entry_point: Some(shaders::VERTEX_ENTRY),
                        buffers: &vertex_buffers,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: fragment_module,
                        entry_point: Some(shaders::FRAGMENT_ENTRY),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.target_format,
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: TextureResource::DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
            .map_err(RenderError::ProgramLink)?;

        let handle = ProgramHandle(self.next_id());
        self.programs.insert(handle, pipeline);
        log::debug!("Linked program {}", handle.0);
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferHandle, RenderError> {
        Ok(self.create_buffer(
            "Vertex Buffer",
            bytemuck::cast_slice(data),
            wgpu::BufferUsages::VERTEX,
        ))
    }

    fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferHandle, RenderError> {
        Ok(self.create_buffer(
            "Index Buffer",
            bytemuck::cast_slice(data),
            wgpu::BufferUsages::INDEX,
        ))
    }

    fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle, _components: u32) {
        self.vertex_bindings[slot.location() as usize] = Some(buffer);
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.index_binding = Some(buffer);
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(retired) = self.buffers.remove(&buffer) {
            self.retired_buffers.insert(buffer, retired);
        }
    }

    fn create_texture(&mut self, upload: &TextureUpload) -> Result<TextureHandle, RenderError> {
        let resource = self
            .with_error_scope(|| TextureResource::from_upload(&self.device, &self.queue, upload))
            .map_err(RenderError::Backend)?;
        let handle = TextureHandle(self.next_id());
        self.textures.insert(handle, resource);
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        match self.texture_units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => log::warn!("Texture unit {} is out of range", unit),
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(retired) = self.textures.remove(&texture) {
            self.retired_textures.push(retired);
        }
        for unit in self.texture_units.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn set_uniform(&mut self, name: &str, value: &Uniform) {
        if !self.block.set(name, value) {
            log::trace!("Uniform `{}` has no slot in the uniform block", name);
        }
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        let program = self
            .current_program
            .ok_or_else(|| RenderError::Backend("draw without a program in use".into()))?;
        let mut vertex_buffers = [BufferHandle(0); 5];
        for (slot, binding) in VertexSlot::ALL.iter().zip(self.vertex_bindings) {
            let handle = binding.ok_or_else(|| {
                RenderError::Backend(format!("no buffer bound to vertex slot {:?}", slot))
            })?;
            self.lookup_buffer(handle)?;
            vertex_buffers[slot.location() as usize] = handle;
        }
        let index_buffer = self
            .index_binding
            .ok_or_else(|| RenderError::Backend("no index buffer bound".into()))?;
        self.lookup_buffer(index_buffer)?;

        let draw_index = self.queued.len();
        if self.uniform_buffers.len() <= draw_index {
            self.uniform_buffers.push(UniformBuffer::new(&self.device));
        }
        let uniform_buffer = &mut self.uniform_buffers[draw_index];
        uniform_buffer.update_content(&self.queue, self.block);
        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Block"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.binding_resource(),
            }],
        });
        let textures = self.texture_bind_group();

        self.queued.push(QueuedDraw {
            program,
            vertex_buffers,
            index_buffer,
            index_count,
            uniforms,
            textures,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{Camera, CameraType};
    use cgmath::{Matrix3, Matrix4, Vector3, Vector4};

    #[test]
    fn test_uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 336);
        assert_eq!(std::mem::size_of::<UniformBlock>() % 16, 0);
    }

    #[test]
    fn test_uniform_block_slots() {
        let mut block = UniformBlock::default();
        assert!(block.set("uLightPosition", &Uniform::Vec3(Vector3::new(1.0, 2.0, 3.0))));
        assert!(block.set("uColor", &Uniform::Vec4(Vector4::new(0.5, 0.5, 0.5, 1.0))));
        assert!(block.set("uUseNormalMap", &Uniform::Bool(true)));
        assert!(block.set("uNormalMap", &Uniform::Int(2)));
        assert!(block.set("uNormalMatrix", &Uniform::Mat3(Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0))));

        assert_eq!(block.light_position, [1.0, 2.0, 3.0]);
        assert_eq!(block.color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(block.use_maps, [0, 0, 1, 0]);
        assert_eq!(block.normal_matrix[1], [4.0, 5.0, 6.0, 0.0]);
    }

    #[test]
    fn test_uniform_block_rejects_unknown_or_mistyped() {
        let mut block = UniformBlock::default();
        assert!(!block.set("uTint", &Uniform::Float(1.0)));
        assert!(!block.set("uShininess", &Uniform::Int(3)));
        assert_eq!(block, UniformBlock::default());
    }

    fn clip_depth(block: &UniformBlock, world_z: f32) -> f32 {
        let clip = Matrix4::from(block.view_projection) * Vector4::new(0.0, 0.0, world_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn test_parallel_projection_depth_lands_in_wgpu_range() {
        for camera_type in [CameraType::Orthographic, CameraType::Oblique] {
            let camera = Camera::new(camera_type, 4.0, 0.0);
            let mut block = UniformBlock::default();
            assert!(block.set(
                "uViewProjectionMatrix",
                &Uniform::Mat4(camera.view_projection_matrix())
            ));

            // Eye sits at z = 4, the parallel volume spans -100..100 around it
            for world_z in [-50.0, 0.0, 3.0, 10.0, 90.0] {
                let z = clip_depth(&block, world_z);
                assert!((0.0..=1.0).contains(&z), "{:?} z={} -> {}", camera_type, world_z, z);
            }
            assert!(clip_depth(&block, 200.0) < 0.0);
        }
    }

    #[test]
    fn test_perspective_depth_spans_zero_to_one() {
        let camera = Camera::new(CameraType::Perspective, 10.0, 0.0);
        let mut block = UniformBlock::default();
        block.set("uViewProjectionMatrix", &Uniform::Mat4(camera.view_projection_matrix()));

        // Near plane is 0.1 in front of the eye, far plane 1000
        assert!(clip_depth(&block, 9.9).abs() < 1e-4);
        assert!((clip_depth(&block, -990.0) - 1.0).abs() < 1e-4);
        let mid = clip_depth(&block, 0.0);
        assert!(mid > 0.0 && mid < 1.0);
    }
}
