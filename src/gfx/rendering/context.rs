//! # Graphics Context
//!
//! The capability surface the [`Renderer`](super::Renderer) drives. Any
//! rasterization backend that can compile programs, upload buffers and
//! textures, set named uniforms and issue indexed draws can implement it.
//!
//! Resources are referred to through opaque `u32` handle newtypes so the
//! renderer never touches backend objects directly.

use cgmath::{Matrix3, Matrix4, Vector3, Vector4};
use thiserror::Error;

use crate::gfx::math::Color;
use crate::gfx::resources::texture::TextureUpload;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// A compiled shader stage.
    ShaderHandle
);
handle!(
    /// A linked vertex + fragment program.
    ProgramHandle
);
handle!(BufferHandle);
handle!(TextureHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Fixed vertex input slots shared by every program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSlot {
    Position,
    Normal,
    Color,
    TexCoord,
    Tangent,
}

impl VertexSlot {
    pub const ALL: [VertexSlot; 5] = [
        VertexSlot::Position,
        VertexSlot::Normal,
        VertexSlot::Color,
        VertexSlot::TexCoord,
        VertexSlot::Tangent,
    ];

    /// Shader location of this slot.
    pub fn location(self) -> u32 {
        self as u32
    }

    /// Float components per vertex.
    pub fn components(self) -> u32 {
        match self {
            VertexSlot::Position | VertexSlot::Normal | VertexSlot::Tangent => 3,
            VertexSlot::Color => 4,
            VertexSlot::TexCoord => 2,
        }
    }
}

/// A uniform value set by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{stage:?} shader failed to compile: {message}")]
    ShaderCompile { stage: ShaderStage, message: String },
    #[error("program failed to link: {0}")]
    ProgramLink(String),
    #[error("mesh node {node} is missing required buffer `{attribute}`")]
    MissingAttribute { node: u32, attribute: &'static str },
    #[error("node {0} is not a camera")]
    NotACamera(u32),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("graphics backend error: {0}")]
    Backend(String),
}

/// Backend operations used by the renderer and the texture pool.
pub trait GraphicsContext {
    /// Clears color and depth for a new frame.
    fn clear(&mut self, color: Color);

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, RenderError>;
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, RenderError>;
    fn use_program(&mut self, program: ProgramHandle);

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferHandle, RenderError>;
    fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferHandle, RenderError>;
    fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle, components: u32);
    fn bind_index_buffer(&mut self, buffer: BufferHandle);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_texture(&mut self, upload: &TextureUpload) -> Result<TextureHandle, RenderError>;
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);
    fn delete_texture(&mut self, texture: TextureHandle);

    fn set_uniform(&mut self, name: &str, value: &Uniform);
    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;

    /// One recorded backend call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Clear,
        CreateShader(ShaderStage),
        LinkProgram(ProgramHandle),
        UseProgram(ProgramHandle),
        CreateVertexBuffer(BufferHandle, usize),
        CreateIndexBuffer(BufferHandle, usize),
        BindVertexBuffer(VertexSlot, BufferHandle),
        BindIndexBuffer(BufferHandle),
        DeleteBuffer(BufferHandle),
        CreateTexture(TextureHandle, String),
        BindTexture(u32, TextureHandle),
        DeleteTexture(TextureHandle),
        DrawIndexed(u32),
    }

    /// Records every call and the latest value of every uniform.
    #[derive(Debug, Default)]
    pub struct MockContext {
        pub calls: Vec<Call>,
        pub uniforms: HashMap<String, Uniform>,
        pub live_buffers: usize,
        pub live_textures: usize,
        pub fail_compile: bool,
        pub fail_link: bool,
        next_id: u32,
    }

    impl MockContext {
        pub fn new() -> Self {
            Self::default()
        }

        fn next(&mut self) -> u32 {
            self.next_id += 1;
            self.next_id
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }

        pub fn draws(&self) -> usize {
            self.count(|c| matches!(c, Call::DrawIndexed(_)))
        }
    }

    impl GraphicsContext for MockContext {
        fn clear(&mut self, _color: Color) {
            self.calls.push(Call::Clear);
        }

        fn create_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<ShaderHandle, RenderError> {
            if self.fail_compile {
                return Err(RenderError::ShaderCompile { stage, message: "mock failure".into() });
            }
            self.calls.push(Call::CreateShader(stage));
            Ok(ShaderHandle(self.next()))
        }

        fn link_program(
            &mut self,
            _vertex: ShaderHandle,
            _fragment: ShaderHandle,
        ) -> Result<ProgramHandle, RenderError> {
            if self.fail_link {
                return Err(RenderError::ProgramLink("mock failure".into()));
            }
            let handle = ProgramHandle(self.next());
            self.calls.push(Call::LinkProgram(handle));
            Ok(handle)
        }

        fn use_program(&mut self, program: ProgramHandle) {
            self.calls.push(Call::UseProgram(program));
        }

        fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferHandle, RenderError> {
            let handle = BufferHandle(self.next());
            self.live_buffers += 1;
            self.calls.push(Call::CreateVertexBuffer(handle, data.len()));
            Ok(handle)
        }

        fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferHandle, RenderError> {
            let handle = BufferHandle(self.next());
            self.live_buffers += 1;
            self.calls.push(Call::CreateIndexBuffer(handle, data.len()));
            Ok(handle)
        }

        fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle, _components: u32) {
            self.calls.push(Call::BindVertexBuffer(slot, buffer));
        }

        fn bind_index_buffer(&mut self, buffer: BufferHandle) {
            self.calls.push(Call::BindIndexBuffer(buffer));
        }

        fn delete_buffer(&mut self, buffer: BufferHandle) {
            self.live_buffers -= 1;
            self.calls.push(Call::DeleteBuffer(buffer));
        }

        fn create_texture(&mut self, upload: &TextureUpload) -> Result<TextureHandle, RenderError> {
            let handle = TextureHandle(self.next());
            self.live_textures += 1;
            self.calls.push(Call::CreateTexture(handle, upload.label.clone()));
            Ok(handle)
        }

        fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
            self.calls.push(Call::BindTexture(unit, texture));
        }

        fn delete_texture(&mut self, texture: TextureHandle) {
            self.live_textures -= 1;
            self.calls.push(Call::DeleteTexture(texture));
        }

        fn set_uniform(&mut self, name: &str, value: &Uniform) {
            self.uniforms.insert(name.to_string(), *value);
        }

        fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
            self.calls.push(Call::DrawIndexed(index_count));
            Ok(())
        }
    }
}
