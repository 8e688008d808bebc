//! Per-frame render orchestration over a [`GraphicsContext`].
//!
//! The renderer walks the scene depth-first from the root and issues one
//! indexed draw per mesh node. Geometry is uploaded into fresh buffers for
//! every draw and released right after it; textures go through the
//! [`TexturePool`] and persist across frames.

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};

use crate::gfx::camera::Camera;
use crate::gfx::geometry::{
    BufferGeometry, ATTR_COLOR, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT, ATTR_TEX_COORD,
};
use crate::gfx::math::{matrix::translation_of, Color};
use crate::gfx::resources::{
    material::{Material, PhongMaterial, UniformValue},
    texture::Texture,
    texture_pool::{TexturePool, DEFAULT_POOL_CAPACITY},
};
use crate::gfx::scene::{LightKind, Node, NodeId, Scene};

use super::context::{
    BufferHandle, GraphicsContext, ProgramHandle, RenderError, ShaderStage, Uniform, VertexSlot,
};
use super::shaders;

/// Result of one [`Renderer::render`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub skipped: usize,
}

/// Light values handed to the shaders. Defaults apply when no light is bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightUniforms {
    pub position: Vector3<f32>,
    pub color: Color,
    pub direction: Vector3<f32>,
    pub radius: f32,
}

impl Default for LightUniforms {
    fn default() -> Self {
        Self {
            position: Vector3::new(1.0, 1.0, 1.0),
            color: Color::BLACK,
            direction: Vector3::new(0.0, 0.0, 0.0),
            radius: 0.0,
        }
    }
}

impl LightUniforms {
    /// Reads a light node. Position is the node's world translation and the
    /// color is premultiplied by intensity.
    pub fn from_node(node: &Node) -> Self {
        let Some(light) = node.light() else {
            return Self::default();
        };
        let c = light.color;
        let i = light.intensity;
        let mut uniforms = Self {
            position: translation_of(node.world_matrix()),
            color: Color::new(c.r * i, c.g * i, c.b * i, c.a),
            ..Self::default()
        };
        match light.kind {
            LightKind::Ambient => {}
            LightKind::Directional { direction } => uniforms.direction = direction,
            LightKind::Point { radius } => uniforms.radius = radius,
        }
        uniforms
    }
}

/// Material values handed to the shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MaterialUniforms {
    color: Color,
    diffuse: Color,
    specular: Color,
    shininess: f32,
    ambient_coef: f32,
    specular_coef: f32,
    displacement_coef: f32,
}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            shininess: 10.0,
            ambient_coef: 0.9,
            specular_coef: 0.9,
            displacement_coef: 0.1,
        }
    }
}

fn non_zero_or(value: f32, fallback: f32) -> f32 {
    if value == 0.0 {
        fallback
    } else {
        value
    }
}

impl MaterialUniforms {
    fn from_material(material: &Material) -> Self {
        let defaults = Self::default();
        match material {
            Material::Basic(basic) => Self {
                color: basic.color,
                ..defaults
            },
            Material::Phong(phong) => Self {
                color: phong.ambient_color,
                diffuse: phong.diffuse_color,
                specular: phong.specular_color,
                shininess: phong.shininess,
                ambient_coef: non_zero_or(phong.ambient_coef, defaults.ambient_coef),
                specular_coef: non_zero_or(phong.specular_coef, defaults.specular_coef),
                displacement_coef: non_zero_or(phong.displacement_coef, defaults.displacement_coef),
            },
            Material::Shader(_) => defaults,
        }
    }
}

fn color_uniform(color: Color) -> Uniform {
    Uniform::Vec4(Vector4::from(color.to_array()))
}

/// Texture units of the four Phong maps, with their sampler and flag names.
const TEXTURE_SLOTS: [(u32, &str, &str); 4] = [
    (0, "uDiffuseMap", "uUseDiffuseMap"),
    (1, "uSpecularMap", "uUseSpecularMap"),
    (2, "uNormalMap", "uUseNormalMap"),
    (3, "uDisplacementMap", "uUseDisplacementMap"),
];

fn phong_maps(phong: &PhongMaterial) -> [Option<&Texture>; 4] {
    [
        phong.diffuse_map.as_ref(),
        phong.specular_map.as_ref(),
        phong.normal_map.as_ref(),
        phong.displacement_map.as_ref(),
    ]
}

/// Draws scenes through a [`GraphicsContext`].
pub struct Renderer {
    default_program: ProgramHandle,
    programs: HashMap<String, ProgramHandle>,
    pool: TexturePool,
    pub clear_color: Color,
}

impl Renderer {
    /// Compiles the default program. Fails if the backend rejects it.
    pub fn new(ctx: &mut dyn GraphicsContext) -> Result<Self, RenderError> {
        Self::with_pool_capacity(ctx, DEFAULT_POOL_CAPACITY)
    }

    pub fn with_pool_capacity(
        ctx: &mut dyn GraphicsContext,
        capacity: usize,
    ) -> Result<Self, RenderError> {
        let default_program = compile_program(ctx, shaders::BASIC, shaders::BASIC)?;
        log::info!("Renderer ready, texture pool capacity {}", capacity);
        Ok(Self {
            default_program,
            programs: HashMap::new(),
            pool: TexturePool::new(capacity),
            clear_color: Color::BLACK,
        })
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn pool(&self) -> &TexturePool {
        &self.pool
    }

    /// Number of cached per-material programs.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Releases every pooled texture.
    pub fn release(&mut self, ctx: &mut dyn GraphicsContext) {
        self.pool.clear(ctx);
    }

    /// Program for `material`, linked on first use and cached by material id.
    fn program_for(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        material: &Material,
    ) -> Result<ProgramHandle, RenderError> {
        if let Some(&program) = self.programs.get(material.id()) {
            return Ok(program);
        }
        let program = if material.vertex_shader() == shaders::BASIC
            && material.fragment_shader() == shaders::BASIC
        {
            self.default_program
        } else {
            compile_program(ctx, material.vertex_shader(), material.fragment_shader())?
        };
        self.programs.insert(material.id().to_string(), program);
        Ok(program)
    }

    /// Clears the target and draws every mesh reachable from the root.
    ///
    /// A failing draw is logged and counted in [`FrameStats::skipped`]; the
    /// remaining meshes are still drawn. An invalid camera fails the frame.
    pub fn render(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: NodeId,
        light: Option<NodeId>,
    ) -> Result<FrameStats, RenderError> {
        let camera = scene
            .node(camera)
            .and_then(Node::camera)
            .ok_or(RenderError::NotACamera(camera.0))?;
        let light = light
            .and_then(|id| scene.node(id))
            .map(LightUniforms::from_node)
            .unwrap_or_default();
        let view_projection = camera.view_projection_matrix();

        ctx.clear(self.clear_color);

        let mut stats = FrameStats::default();
        for id in scene.node_ids_depth_first() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            if node.mesh().is_none() {
                continue;
            }
            match self.draw_mesh(ctx, node, &view_projection, camera, &light) {
                Ok(()) => stats.draws += 1,
                Err(e) => {
                    log::warn!("Skipped mesh `{}` ({}): {}", node.name, id, e);
                    stats.skipped += 1;
                }
            }
        }
        log::debug!("Frame drawn: {} draws, {} skipped", stats.draws, stats.skipped);
        Ok(stats)
    }

    /// Uploads one mesh node, sets its uniforms and draws it. Non-mesh nodes
    /// are a no-op.
    pub fn draw_mesh(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        node: &Node,
        view_projection: &Matrix4<f32>,
        camera: &Camera,
        light: &LightUniforms,
    ) -> Result<(), RenderError> {
        let Some(mesh) = node.mesh() else {
            return Ok(());
        };
        if let Some(attribute) = mesh.geometry.missing_for_render() {
            return Err(RenderError::MissingAttribute {
                node: node.id().0,
                attribute,
            });
        }

        let program = self.program_for(ctx, &mesh.material)?;
        ctx.use_program(program);

        let mut buffers = Vec::with_capacity(VertexSlot::ALL.len() + 1);
        let result = self.draw_uploaded(ctx, node, view_projection, camera, light, &mut buffers);
        for buffer in buffers {
            ctx.delete_buffer(buffer);
        }
        result
    }

    fn draw_uploaded(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        node: &Node,
        view_projection: &Matrix4<f32>,
        camera: &Camera,
        light: &LightUniforms,
        buffers: &mut Vec<BufferHandle>,
    ) -> Result<(), RenderError> {
        let Some(mesh) = node.mesh() else {
            return Ok(());
        };
        let index_count = upload_geometry(ctx, node.id(), &mesh.geometry, buffers)?;

        let world = node.world_matrix();
        let camera_position = camera
            .view_matrix()
            .invert()
            .map(|inverse| translation_of(&inverse))
            .unwrap_or_else(|| Vector3::new(0.0, 0.0, 0.0));
        let model_view = camera.model_view_matrix(world);
        ctx.set_uniform("uViewProjectionMatrix", &Uniform::Mat4(*view_projection));
        ctx.set_uniform("uWorldMatrix", &Uniform::Mat4(*world));
        ctx.set_uniform("uNormalMatrix", &Uniform::Mat3(camera.normal_matrix(&model_view)));
        ctx.set_uniform("uCameraPosition", &Uniform::Vec3(camera_position));

        ctx.set_uniform("uLightPosition", &Uniform::Vec3(light.position));
        ctx.set_uniform("uLightColor", &color_uniform(light.color));
        ctx.set_uniform("uLightDirection", &Uniform::Vec3(light.direction));
        ctx.set_uniform("uLightRadius", &Uniform::Float(light.radius));

        let params = MaterialUniforms::from_material(&mesh.material);
        ctx.set_uniform("uColor", &color_uniform(params.color));
        ctx.set_uniform("uAmbientColor", &color_uniform(params.color));
        ctx.set_uniform("uDiffuseColor", &color_uniform(params.diffuse));
        ctx.set_uniform("uSpecularColor", &color_uniform(params.specular));
        ctx.set_uniform("uShininess", &Uniform::Float(params.shininess));
        ctx.set_uniform("uAmbientCoef", &Uniform::Float(params.ambient_coef));
        ctx.set_uniform("uSpecularCoef", &Uniform::Float(params.specular_coef));
        ctx.set_uniform("uDisplacementCoef", &Uniform::Float(params.displacement_coef));
        ctx.set_uniform("uUseVertexColor", &Uniform::Bool(mesh.use_vertex_color));

        let maps = match &mesh.material {
            Material::Phong(phong) => phong_maps(phong),
            _ => [None; 4],
        };
        for ((unit, sampler, flag), map) in TEXTURE_SLOTS.into_iter().zip(maps) {
            match map {
                Some(texture) => {
                    let handle = self.pool.acquire(texture, ctx)?;
                    ctx.bind_texture(unit, handle);
                    ctx.set_uniform(sampler, &Uniform::Int(unit as i32));
                    ctx.set_uniform(flag, &Uniform::Bool(true));
                }
                None => ctx.set_uniform(flag, &Uniform::Bool(false)),
            }
        }

        if let Material::Shader(shader) = &mesh.material {
            for (name, value) in &shader.uniforms {
                set_custom_uniform(ctx, name, value);
            }
        }

        ctx.draw_indexed(index_count)
    }
}

fn compile_program(
    ctx: &mut dyn GraphicsContext,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<ProgramHandle, RenderError> {
    let vertex = ctx.create_shader(ShaderStage::Vertex, vertex_source).map_err(|e| {
        log::error!("{}", e);
        e
    })?;
    let fragment = ctx.create_shader(ShaderStage::Fragment, fragment_source).map_err(|e| {
        log::error!("{}", e);
        e
    })?;
    ctx.link_program(vertex, fragment).map_err(|e| {
        log::error!("{}", e);
        e
    })
}

/// Uploads the five vertex streams and the index buffer. Returns the index
/// count. Every created buffer is pushed to `buffers` for later release.
fn upload_geometry(
    ctx: &mut dyn GraphicsContext,
    node: NodeId,
    geometry: &BufferGeometry,
    buffers: &mut Vec<BufferHandle>,
) -> Result<u32, RenderError> {
    let vertex_count = geometry.vertex_count();
    for slot in VertexSlot::ALL {
        let name = match slot {
            VertexSlot::Position => ATTR_POSITION,
            VertexSlot::Normal => ATTR_NORMAL,
            VertexSlot::Color => ATTR_COLOR,
            VertexSlot::TexCoord => ATTR_TEX_COORD,
            VertexSlot::Tangent => ATTR_TANGENT,
        };
        let data = match geometry.get_attribute(name) {
            Some(attribute) => attribute.to_f32_vec(),
            // Only texture coordinates are optional
            None => vec![0.0; vertex_count * slot.components() as usize],
        };
        let buffer = ctx.create_vertex_buffer(&data)?;
        buffers.push(buffer);
        ctx.bind_vertex_buffer(slot, buffer, slot.components());
    }

    let indices = geometry
        .indices()
        .map(|i| i.to_u32_vec())
        .ok_or(RenderError::MissingAttribute {
            node: node.0,
            attribute: "indices",
        })?;
    let buffer = ctx.create_index_buffer(&indices)?;
    buffers.push(buffer);
    ctx.bind_index_buffer(buffer);
    Ok(indices.len() as u32)
}

fn set_custom_uniform(ctx: &mut dyn GraphicsContext, name: &str, value: &UniformValue) {
    let uniform = match value {
        UniformValue::Float(v) => Uniform::Float(*v),
        UniformValue::Bool(v) => Uniform::Bool(*v),
        UniformValue::Vector(v) if v.len() == 3 => Uniform::Vec3(Vector3::new(v[0], v[1], v[2])),
        UniformValue::Vector(v) if v.len() == 4 => Uniform::Vec4(Vector4::new(v[0], v[1], v[2], v[3])),
        UniformValue::Vector(v) => {
            log::warn!("Uniform `{}` has {} components, expected 3 or 4", name, v.len());
            return;
        }
        UniformValue::Texture(_) => {
            log::debug!("Texture uniform `{}` is not bound for shader materials", name);
            return;
        }
    };
    ctx.set_uniform(name, &uniform);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::Camera;
    use crate::gfx::geometry::primitives::box_geometry;
    use crate::gfx::rendering::context::mock::{Call, MockContext};
    use crate::gfx::resources::material::{BasicMaterial, ShaderMaterial};
    use crate::gfx::scene::{Light, Mesh, NodeKind};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn mesh_node(name: &str, material: impl Into<Material>) -> Node {
        Node::new(name, NodeKind::Mesh(Mesh::new(box_geometry(1.0, 1.0, 1.0), material)))
    }

    fn scene_with_camera() -> (Scene, NodeId) {
        let mut scene = Scene::new("root");
        let camera = scene
            .insert(Node::new("cam", NodeKind::Camera(Camera::default())), Some(scene.root()))
            .unwrap();
        (scene, camera)
    }

    #[test]
    fn test_renders_one_draw_per_mesh() {
        let (mut scene, camera) = scene_with_camera();
        let root = scene.root();
        let a = scene.insert(mesh_node("a", BasicMaterial::default()), Some(root)).unwrap();
        scene.insert(mesh_node("b", PhongMaterial::default()), Some(a)).unwrap();

        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let stats = renderer.render(&mut ctx, &scene, camera, None).unwrap();

        assert_eq!(stats, FrameStats { draws: 2, skipped: 0 });
        assert_eq!(ctx.draws(), 2);
        assert_eq!(ctx.count(|c| matches!(c, Call::Clear)), 1);
        // Per-draw buffers are released
        assert_eq!(ctx.live_buffers, 0);
    }

    #[test]
    fn test_missing_attribute_skips_only_that_mesh() {
        init_logger();
        let (mut scene, camera) = scene_with_camera();
        let root = scene.root();
        let mut broken = box_geometry(1.0, 1.0, 1.0);
        broken.delete_attribute(ATTR_TANGENT);
        let bad = scene
            .insert(
                Node::new("bad", NodeKind::Mesh(Mesh::new(broken, BasicMaterial::default()))),
                Some(root),
            )
            .unwrap();
        scene.insert(mesh_node("good", BasicMaterial::default()), Some(root)).unwrap();

        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let stats = renderer.render(&mut ctx, &scene, camera, None).unwrap();
        assert_eq!(stats, FrameStats { draws: 1, skipped: 1 });

        let node = scene.node(bad).unwrap();
        let err = renderer
            .draw_mesh(
                &mut ctx,
                node,
                &Matrix4::from_scale(1.0),
                &Camera::default(),
                &LightUniforms::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingAttribute { attribute: "tangent", .. }));
    }

    #[test]
    fn test_render_without_camera_fails() {
        init_logger();
        let mut scene = Scene::new("root");
        scene.insert(mesh_node("a", BasicMaterial::default()), Some(scene.root())).unwrap();
        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        let root = scene.root();
        assert!(matches!(
            renderer.render(&mut ctx, &scene, root, None),
            Err(RenderError::NotACamera(_))
        ));
    }

    #[test]
    fn test_shader_failure_surfaces_from_new() {
        let mut ctx = MockContext::new();
        ctx.fail_compile = true;
        assert!(matches!(Renderer::new(&mut ctx), Err(RenderError::ShaderCompile { .. })));

        let mut ctx = MockContext::new();
        ctx.fail_link = true;
        assert!(matches!(Renderer::new(&mut ctx), Err(RenderError::ProgramLink(_))));
    }

    #[test]
    fn test_light_defaults_and_light_node_values() {
        let (mut scene, camera) = scene_with_camera();
        let root = scene.root();
        scene.insert(mesh_node("a", BasicMaterial::default()), Some(root)).unwrap();

        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        renderer.render(&mut ctx, &scene, camera, None).unwrap();
        assert_eq!(
            ctx.uniforms["uLightPosition"],
            Uniform::Vec3(Vector3::new(1.0, 1.0, 1.0))
        );
        assert_eq!(
            ctx.uniforms["uLightColor"],
            Uniform::Vec4(Vector4::new(0.0, 0.0, 0.0, 1.0))
        );

        let sun = scene
            .insert(
                Node::new(
                    "sun",
                    NodeKind::Light(Light::directional(Color::WHITE, Vector3::new(0.0, -1.0, 0.0))),
                )
                .with_translation(Vector3::new(0.0, 5.0, 0.0)),
                Some(root),
            )
            .unwrap();
        renderer.render(&mut ctx, &scene, camera, Some(sun)).unwrap();
        assert_eq!(
            ctx.uniforms["uLightPosition"],
            Uniform::Vec3(Vector3::new(0.0, 5.0, 0.0))
        );
        assert_eq!(
            ctx.uniforms["uLightDirection"],
            Uniform::Vec3(Vector3::new(0.0, -1.0, 0.0))
        );
        assert_eq!(ctx.uniforms["uLightRadius"], Uniform::Float(0.0));
    }

    #[test]
    fn test_phong_maps_bind_through_pool() {
        let (mut scene, camera) = scene_with_camera();
        let root = scene.root();
        let diffuse = Texture::from_pixels("bricks", vec![255; 4 * 4 * 4], 4, 4);
        let phong = PhongMaterial::default().with_diffuse_map(diffuse.clone());
        scene.insert(mesh_node("a", phong.clone()), Some(root)).unwrap();
        scene.insert(mesh_node("b", phong), Some(root)).unwrap();

        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        renderer.render(&mut ctx, &scene, camera, None).unwrap();
        renderer.render(&mut ctx, &scene, camera, None).unwrap();

        // One upload shared by both meshes over both frames
        assert_eq!(ctx.count(|c| matches!(c, Call::CreateTexture(..))), 1);
        assert_eq!(ctx.count(|c| matches!(c, Call::BindTexture(0, _))), 4);
        assert_eq!(ctx.uniforms["uUseDiffuseMap"], Uniform::Bool(true));
        assert_eq!(ctx.uniforms["uUseNormalMap"], Uniform::Bool(false));
        assert_eq!(renderer.pool().len(), 1);
    }

    #[test]
    fn test_phong_zero_coefficients_fall_back() {
        let phong = PhongMaterial::default().with_coefficients(0.0, 0.5, 0.0);
        let params = MaterialUniforms::from_material(&Material::Phong(phong));
        assert_eq!(params.ambient_coef, 0.9);
        assert_eq!(params.specular_coef, 0.5);
        assert_eq!(params.displacement_coef, 0.1);
    }

    #[test]
    fn test_programs_are_cached_per_material() {
        let (mut scene, camera) = scene_with_camera();
        let root = scene.root();
        let custom = ShaderMaterial::new("custom vs", "custom fs")
            .with_uniform("uTint", UniformValue::Vector(vec![1.0, 0.0, 0.0]));
        scene.insert(mesh_node("a", custom.clone()), Some(root)).unwrap();
        scene.insert(mesh_node("b", custom), Some(root)).unwrap();

        let mut ctx = MockContext::new();
        let mut renderer = Renderer::new(&mut ctx).unwrap();
        renderer.render(&mut ctx, &scene, camera, None).unwrap();
        renderer.render(&mut ctx, &scene, camera, None).unwrap();

        // Default program plus one for the shared custom material
        assert_eq!(ctx.count(|c| matches!(c, Call::LinkProgram(_))), 2);
        assert_eq!(renderer.program_count(), 1);
        assert_eq!(ctx.uniforms["uTint"], Uniform::Vec3(Vector3::new(1.0, 0.0, 0.0)));
    }
}
