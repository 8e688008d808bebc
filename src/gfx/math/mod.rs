//! # Math Module
//!
//! Thin layer over `cgmath` holding the conventions shared by the scene graph,
//! the animation engine and the renderer.
//!
//! ## Key Components
//!
//! - [`QuaternionExt`] - Euler conversion and exponentiation-based slerp
//! - [`matrix`] - TRS composition, camera and normal matrix builders
//! - [`Color`] - RGBA color used by lights and materials
//! - [`records`] - serde records for vectors, quaternions and matrices

pub mod color;
pub mod matrix;
pub mod quaternion;
pub mod records;

pub use color::Color;
pub use quaternion::QuaternionExt;
pub use records::{Mat4Record, QuatRecord, Vec3Record};
