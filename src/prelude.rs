//! # Marionette Prelude
//!
//! Commonly used types in one import.
//!
//! ```no_run
//! use marionette::prelude::*;
//!
//! let mut scene = Scene::new("root");
//! let arm = scene.insert(Node::empty("arm"), Some(scene.root())).unwrap();
//! scene.set_rotation(arm, Vector3::new(0.0, 90.0, 0.0)).unwrap();
//! ```

// Re-export core application types
pub use crate::app::ViewerApp;
pub use crate::config::EngineConfig;
pub use crate::init_logging;

// Scene graph and graphics types
pub use crate::gfx::camera::{Camera, CameraType};
pub use crate::gfx::geometry::{box_geometry, plane_geometry, BufferAttribute, BufferGeometry};
pub use crate::gfx::math::{Color, QuaternionExt};
pub use crate::gfx::rendering::{GraphicsContext, Renderer, WgpuContext};
pub use crate::gfx::resources::{BasicMaterial, Material, PhongMaterial, ShaderMaterial, Texture};
pub use crate::gfx::scene::{Light, Mesh, Node, NodeId, NodeKind, Scene};

// Animation
pub use crate::animation::{
    AnimationClip, AnimationRunner, EasingType, KeyFrameTrack, QuaternionKeyFrame, Vec3KeyFrame,
};

// Re-export common external dependencies
pub use cgmath::{Quaternion, Vector3};
