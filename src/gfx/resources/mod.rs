//! Materials, textures and the GPU texture pool.
//!
//! - [`material`] - Basic, Phong and custom shader materials
//! - [`texture`] - CPU-side texture handles with async loading
//! - [`texture_pool`] - FIFO-bounded cache of uploaded textures
//! - [`procedural`] - Generated noise, brick and ripple textures
//! - [`texture_resource`] - wgpu texture, view and sampler bundles

pub mod material;
pub mod procedural;
pub mod texture;
pub mod texture_pool;
pub mod texture_resource;

pub use material::{
    BasicMaterial, Material, MaterialError, MaterialType, PhongMaterial, ShaderMaterial,
    UniformValue,
};
pub use texture::{
    ImageFormat, ImageType, LoadState, MagFilter, MinFilter, PendingPixels, PixelData, Texture,
    TextureRecord, TextureUpload, WrapMode,
};
pub use texture_pool::{PoolStats, TexturePool, DEFAULT_POOL_CAPACITY};
pub use texture_resource::TextureResource;
