//! # Scene Graph Module
//!
//! An arena-backed scene graph. Nodes live in a map keyed by [`NodeId`] and
//! refer to their parent and children by id, so the tree never holds owning
//! back-references.
//!
//! ## Key Components
//!
//! - [`Scene`] - owns every node, the root and the id allocator
//! - [`Node`] - hierarchy links, TRS state and cached local/world matrices
//! - [`NodeKind`] - what a node is: empty group, camera, light or mesh
//! - [`IdAllocator`] - hands out unique node ids within a scene
//! - [`serialization`] - JSON records for saving and loading scenes
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Vector3;
//! use marionette::gfx::scene::{Node, Scene};
//!
//! let mut scene = Scene::new("root");
//! let arm = scene.insert(Node::empty("arm"), Some(scene.root())).unwrap();
//! scene.set_translation(arm, Vector3::new(1.0, 0.0, 0.0)).unwrap();
//! assert!(scene.get_node_from_path("arm").is_some());
//! ```
//!
//! ## World Matrices
//!
//! Every TRS or parent change goes through the [`Scene`], which recomputes
//! `world = parent.world * local` for the changed node and its whole subtree
//! before returning. Camera views are refreshed during the same walk.

pub mod id_allocator;
pub mod light;
pub mod mesh;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod serialization;

pub use id_allocator::{IdAllocator, NodeId};
pub use light::{Light, LightKind};
pub use mesh::Mesh;
pub use node::{Node, NodeKind};
pub use scene::Scene;
pub use serialization::{NodeRecord, SceneRecord};

use thiserror::Error;

use crate::gfx::geometry::GeometryError;
use crate::gfx::resources::material::MaterialError;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("node {0} is not in the scene")]
    NodeNotFound(NodeId),
    #[error("node {0} is not a camera")]
    NotACamera(NodeId),
    #[error("making {parent} the parent of {node} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("the root node cannot be {0}")]
    RootOperation(&'static str),
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("mesh node `{0}` has no geometry")]
    MissingGeometry(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene file error: {0}")]
    Io(#[from] std::io::Error),
}
