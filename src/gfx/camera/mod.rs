//! # Camera Module
//!
//! Orbit cameras carried by scene nodes.
//!
//! ## Key Components
//!
//! - [`Camera`] - radius/angle orbit state plus cached view and projection
//! - [`CameraType`] - perspective, orthographic or oblique projection
//!
//! Operations that move the camera node (`rotate_camera_y`, `zoom_camera`,
//! `set_camera_type`, ...) are implemented on
//! [`Scene`](crate::gfx::scene::Scene) so world matrices stay in sync.

#[allow(clippy::module_inception)]
pub mod camera;

pub use camera::{Camera, CameraType};
