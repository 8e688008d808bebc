//! Scene graph nodes.
//!
//! A [`Node`] holds hierarchy links, TRS state and cached matrices. What the
//! node *is* lives in its [`NodeKind`] payload. Hierarchy and world matrices are
//! maintained by the owning [`Scene`](super::Scene); a node on its own only
//! keeps its local matrix in sync with its TRS.

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3, Zero};

use crate::gfx::camera::Camera;
use crate::gfx::math::{matrix::compose_trs, QuaternionExt};

use super::id_allocator::NodeId;
use super::light::Light;
use super::mesh::Mesh;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Empty,
    Camera(Camera),
    Light(Light),
    Mesh(Mesh),
}

impl NodeKind {
    /// Serialized `nodeType` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Empty => "Node",
            NodeKind::Camera(_) => "Camera",
            NodeKind::Light(light) => light.type_name(),
            NodeKind::Mesh(_) => "Mesh",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    translation: Vector3<f32>,
    /// Euler angles in degrees, kept in sync with `quaternion`.
    rotation: Vector3<f32>,
    quaternion: Quaternion<f32>,
    scale: Vector3<f32>,
    local_matrix: Matrix4<f32>,
    pub(crate) world_matrix: Matrix4<f32>,
    pub kind: NodeKind,
}

impl Node {
    /// Creates a detached node with identity transform.
    ///
    /// The id is only a request; the scene's allocator decides the final id on
    /// insertion.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId(0),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            translation: Vector3::zero(),
            rotation: Vector3::zero(),
            quaternion: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            local_matrix: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            kind,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Empty)
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_translation(mut self, translation: Vector3<f32>) -> Self {
        self.set_translation(translation);
        self
    }

    /// Euler rotation in degrees.
    pub fn with_rotation(mut self, rotation: Vector3<f32>) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.translation
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        self.quaternion
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn local_matrix(&self) -> &Matrix4<f32> {
        &self.local_matrix
    }

    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world_matrix
    }

    pub fn camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    // TRS setters only refresh the local matrix. World propagation is the
    // scene's job, so these stay crate-private.

    pub(crate) fn set_translation(&mut self, translation: Vector3<f32>) {
        self.translation = translation;
        self.update_local_matrix();
    }

    pub(crate) fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation = rotation;
        self.quaternion = Quaternion::from_euler_degrees(rotation);
        self.update_local_matrix();
    }

    pub(crate) fn set_quaternion(&mut self, quaternion: Quaternion<f32>) {
        self.quaternion = quaternion;
        self.rotation = quaternion.to_euler_degrees();
        self.update_local_matrix();
    }

    pub(crate) fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.update_local_matrix();
    }

    fn update_local_matrix(&mut self) {
        self.local_matrix = compose_trs(self.translation, self.quaternion, self.scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::math::matrix::{matrices_close, translation_of};

    #[test]
    fn test_new_node_is_identity() {
        let node = Node::empty("root");
        assert_eq!(*node.local_matrix(), Matrix4::identity());
        assert_eq!(node.scale(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(node.kind.type_name(), "Node");
    }

    #[test]
    fn test_local_matrix_scales_then_rotates_then_translates() {
        let node = Node::empty("n")
            .with_scale(Vector3::new(2.0, 2.0, 2.0))
            .with_rotation(Vector3::new(0.0, 0.0, 90.0))
            .with_translation(Vector3::new(5.0, 0.0, 0.0));

        // (1,0,0) -> scaled (2,0,0) -> rotated (0,2,0) -> translated (5,2,0)
        let p = *node.local_matrix() * cgmath::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 5.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
        assert_eq!(translation_of(node.local_matrix()), Vector3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_and_quaternion_stay_in_sync() {
        let mut node = Node::empty("n").with_rotation(Vector3::new(30.0, 45.0, 60.0));
        let from_euler = *node.local_matrix();

        node.set_quaternion(node.quaternion());
        let r = node.rotation();
        assert!((r.x - 30.0).abs() < 1e-3);
        assert!((r.y - 45.0).abs() < 1e-3);
        assert!((r.z - 60.0).abs() < 1e-3);
        assert!(matrices_close(&from_euler, node.local_matrix(), 1e-5));
    }
}
