// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! The [`Renderer`] turns a scene into draw calls against any
//! [`GraphicsContext`]. [`WgpuContext`] is the GPU implementation; tests use
//! a recording mock.
//!
//! ## Key Components
//!
//! - [`context`] - backend trait, resource handles and uniform values
//! - [`renderer`] - per-frame traversal, uniform setup and texture binding
//! - [`shaders`] - built-in WGSL programs
//! - [`wgpu_context`] - wgpu device, pipelines and frame submission

pub mod context;
pub mod renderer;
pub mod shaders;
pub mod wgpu_context;

pub use context::{
    BufferHandle, GraphicsContext, ProgramHandle, RenderError, ShaderHandle, ShaderStage,
    TextureHandle, Uniform, VertexSlot,
};
pub use renderer::{FrameStats, LightUniforms, Renderer};
pub use wgpu_context::{UniformBlock, WgpuContext, WindowSurface};
