//! JSON records for scenes.
//!
//! A scene file is `{"root": NodeRecord}` where each record nests its children.
//! Matrices are written for readers that want them, but loading rebuilds them
//! from `translation`, `rotation` and `scale`.

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gfx::camera::{Camera, CameraType};
use crate::gfx::geometry::{BufferGeometry, BufferGeometryRecord};
use crate::gfx::math::{Color, Mat4Record, Vec3Record};
use crate::gfx::resources::material::{Material, MaterialType};

use super::id_allocator::NodeId;
use super::light::{Light, LightKind};
use super::mesh::Mesh;
use super::node::{Node, NodeKind};
use super::scene::Scene;
use super::SceneError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub children: Vec<NodeRecord>,
    #[serde(default)]
    pub parent_id: Option<u32>,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_matrix: Option<Mat4Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_matrix: Option<Mat4Record>,
    pub translation: Vec3Record,
    pub rotation: Vec3Record,
    pub scale: Vec3Record,

    // Camera
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Vec3Record>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub camera_type: Option<CameraType>,
    /// Orbit radius for cameras, attenuation radius for point lights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,

    // Lights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Vec3Record>,

    // Mesh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<BufferGeometryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<MaterialType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_vertex_color: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub root: NodeRecord,
}

impl NodeRecord {
    fn base(node: &Node, children: Vec<NodeRecord>) -> Self {
        Self {
            id: node.id().0,
            name: node.name.clone(),
            children,
            parent_id: node.parent().map(|p| p.0),
            node_type: node.kind.type_name().to_string(),
            local_matrix: Some((*node.local_matrix()).into()),
            world_matrix: Some((*node.world_matrix()).into()),
            translation: node.translation().into(),
            rotation: node.rotation().into(),
            scale: node.scale().into(),
            angle: None,
            center: None,
            camera_type: None,
            radius: None,
            color: None,
            intensity: None,
            direction: None,
            geometry: None,
            material: None,
            material_type: None,
            use_vertex_color: None,
        }
    }

    /// Builds the detached node this record describes, without children.
    pub fn to_node(&self) -> Result<Node, SceneError> {
        let kind = match self.node_type.as_str() {
            "Node" => NodeKind::Empty,
            "Camera" => {
                let camera = Camera::new(
                    self.camera_type.unwrap_or(CameraType::Perspective),
                    self.radius.unwrap_or(10.0),
                    self.angle.unwrap_or(0.0),
                );
                let center = self.center.map(Point3::from).unwrap_or(Point3::new(0.0, 0.0, 0.0));
                NodeKind::Camera(camera.with_center(center))
            }
            "AmbientLight" | "DirectionalLight" | "PointLight" => {
                let color = self.color.unwrap_or(Color::WHITE);
                let light = match self.node_type.as_str() {
                    "AmbientLight" => Light::ambient(color),
                    "DirectionalLight" => Light::directional(
                        color,
                        self.direction.map(Vector3::from).unwrap_or(Vector3::new(0.0, 0.0, 0.0)),
                    ),
                    _ => Light::point(color, self.radius.unwrap_or(Light::DEFAULT_POINT_RADIUS)),
                };
                NodeKind::Light(light.with_intensity(self.intensity.unwrap_or(Light::DEFAULT_INTENSITY)))
            }
            "Mesh" => {
                let geometry = self
                    .geometry
                    .as_ref()
                    .ok_or_else(|| SceneError::MissingGeometry(self.name.clone()))?;
                let material = match &self.material {
                    Some(value) => Material::from_json(
                        self.material_type.unwrap_or(MaterialType::ShaderMaterial),
                        value,
                    )?,
                    None => {
                        log::warn!("Mesh `{}` has no material, using default", self.name);
                        Material::default()
                    }
                };
                let mesh = Mesh::new(BufferGeometry::from_record(geometry), material)
                    .with_vertex_color(self.use_vertex_color.unwrap_or(false));
                NodeKind::Mesh(mesh)
            }
            other => return Err(SceneError::UnknownNodeType(other.to_string())),
        };

        Ok(Node::new(self.name.clone(), kind)
            .with_id(NodeId(self.id))
            .with_translation(self.translation.into())
            .with_rotation(self.rotation.into())
            .with_scale(self.scale.into()))
    }
}

impl Scene {
    /// Record of the subtree at `id`.
    pub fn node_to_record(&self, id: NodeId) -> Result<NodeRecord, SceneError> {
        let node = self.node(id).ok_or(SceneError::NodeNotFound(id))?;
        let children = node
            .children()
            .iter()
            .map(|c| self.node_to_record(*c))
            .collect::<Result<Vec<_>, _>>()?;
        let mut record = NodeRecord::base(node, children);

        match &node.kind {
            NodeKind::Empty => {}
            NodeKind::Camera(camera) => {
                record.radius = Some(camera.radius);
                record.angle = Some(camera.angle);
                record.center = Some(camera.center.into());
                record.camera_type = Some(camera.camera_type());
            }
            NodeKind::Light(light) => {
                record.color = Some(light.color);
                record.intensity = Some(light.intensity);
                match light.kind {
                    LightKind::Ambient => {}
                    LightKind::Directional { direction } => record.direction = Some(direction.into()),
                    LightKind::Point { radius } => record.radius = Some(radius),
                }
            }
            NodeKind::Mesh(mesh) => {
                record.geometry = Some(mesh.geometry.to_record());
                record.material = Some(mesh.material.to_json()?);
                record.material_type = Some(mesh.material.material_type());
                record.use_vertex_color = Some(mesh.use_vertex_color);
            }
        }
        Ok(record)
    }

    pub fn to_record(&self) -> Result<SceneRecord, SceneError> {
        Ok(SceneRecord {
            root: self.node_to_record(self.root())?,
        })
    }

    /// Rebuilds a scene by walking the nested child lists. Ids are kept
    /// where unique and re-issued on collision.
    pub fn from_record(record: &SceneRecord) -> Result<Scene, SceneError> {
        let mut scene = Scene::with_root(record.root.to_node()?);
        let mut stack: Vec<(NodeId, &NodeRecord)> = record
            .root
            .children
            .iter()
            .rev()
            .map(|c| (scene.root(), c))
            .collect();

        while let Some((parent, child)) = stack.pop() {
            let id = scene.insert(child.to_node()?, Some(parent))?;
            stack.extend(child.children.iter().rev().map(|c| (id, c)));
        }
        Ok(scene)
    }

    pub fn to_json_string(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(&self.to_record()?)?)
    }

    pub fn from_json_str(json: &str) -> Result<Scene, SceneError> {
        let record: SceneRecord = serde_json::from_str(json)?;
        Scene::from_record(&record)
    }

    /// Deep copy through the record form. Texture pixel data is carried over
    /// but GPU handles are not shared.
    pub fn deep_copy_node(&self, id: NodeId) -> Result<Node, SceneError> {
        self.node_to_record(id)?.to_node()
    }
}
