//! # Graphics Module
//!
//! Everything between a scene description and pixels.
//!
//! - **Math** ([`math`]) - quaternion helpers, matrix builders and colors
//! - **Scene Graph** ([`scene`]) - arena of nodes with cached world matrices
//! - **Camera** ([`camera`]) - orbit camera with three projection kinds
//! - **Geometry** ([`geometry`]) - attribute buffers, normals, tangents, primitives
//! - **Resources** ([`resources`]) - materials, textures and the texture pool
//! - **Rendering** ([`rendering`]) - backend trait, renderer and wgpu backend
//!
//! ## Usage
//!
//! ```no_run
//! use marionette::gfx::{rendering::{Renderer, WgpuContext}, scene::Scene};
//!
//! let scene = Scene::load("scene.json").unwrap();
//! let camera = scene.get_camera().unwrap();
//! let mut context = WgpuContext::headless(640, 480).unwrap();
//! let mut renderer = Renderer::new(&mut context).unwrap();
//! let target = context.create_offscreen_target();
//! renderer.render(&mut context, &scene, camera, scene.get_light()).unwrap();
//! context.finish_frame(&target.view).unwrap();
//! ```

pub mod camera;
pub mod geometry;
pub mod math;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::{Camera, CameraType};
pub use rendering::{GraphicsContext, Renderer};
pub use scene::{Node, NodeId, NodeKind, Scene};
