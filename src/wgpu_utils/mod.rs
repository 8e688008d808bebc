// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Binding type shorthands and a typed uniform buffer used by the wgpu
//! backend.

pub mod binding_types;
pub mod uniform_buffer;

pub use binding_types::*;
pub use uniform_buffer::UniformBuffer;
