//! Named attribute sets with derived normal and tangent generation

use std::collections::BTreeMap;

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use serde::{Deserialize, Serialize};

use super::attribute::{BufferAttribute, BufferAttributeRecord};
use super::GeometryError;

pub const ATTR_POSITION: &str = "position";
pub const ATTR_NORMAL: &str = "normal";
pub const ATTR_COLOR: &str = "color";
pub const ATTR_TEX_COORD: &str = "texCoord";
pub const ATTR_TANGENT: &str = "tangent";

/// Squared length under which a face normal counts as degenerate.
const DEGENERATE_AREA: f32 = 1e-12;
/// UV determinant magnitude under which a triangle has no usable tangent.
const DEGENERATE_UV: f32 = 1e-8;

/// A set of named vertex attributes with an optional index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferGeometry {
    attributes: BTreeMap<String, BufferAttribute>,
    indices: Option<BufferAttribute>,
}

impl BufferGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(&self) -> &BTreeMap<String, BufferAttribute> {
        &self.attributes
    }

    pub fn indices(&self) -> Option<&BufferAttribute> {
        self.indices.as_ref()
    }

    pub fn indices_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.indices.as_mut()
    }

    pub fn set_indices(&mut self, indices: BufferAttribute) -> &mut Self {
        self.indices = Some(indices);
        self
    }

    pub fn remove_indices(&mut self) -> &mut Self {
        self.indices = None;
        self
    }

    pub fn set_attribute(&mut self, name: &str, attribute: BufferAttribute) -> &mut Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    pub fn get_attribute_mut(&mut self, name: &str) -> Option<&mut BufferAttribute> {
        self.attributes.get_mut(name)
    }

    pub fn delete_attribute(&mut self, name: &str) -> &mut Self {
        self.attributes.remove(name);
        self
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, name: &str, attribute: BufferAttribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Builder form of [`set_indices`](Self::set_indices).
    pub fn with_indices(mut self, indices: BufferAttribute) -> Self {
        self.set_indices(indices);
        self
    }

    /// Vertex count derived from the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.get_attribute(ATTR_POSITION).map_or(0, |p| p.count())
    }

    /// Triangle corner indices: the index buffer, or `0..vertex_count` when unindexed.
    fn triangle_corners(&self) -> Vec<u32> {
        match &self.indices {
            Some(indices) => indices.to_u32_vec(),
            None => (0..self.vertex_count() as u32).collect(),
        }
    }

    /// Recomputes per-vertex normals by averaging face normals.
    ///
    /// Each triangle's normalized face normal is added to its three vertices and
    /// the sums are normalized at the end. Zero-area triangles are skipped and a
    /// vertex that received no contribution keeps a zero normal.
    ///
    /// # Arguments
    /// * `force_new` - Always allocate a fresh float normal attribute instead of
    ///   reusing an existing one
    pub fn calculate_normals(&mut self, force_new: bool) -> Result<(), GeometryError> {
        let positions = self
            .get_attribute(ATTR_POSITION)
            .ok_or(GeometryError::MissingAttribute(ATTR_POSITION))?
            .to_f32_vec();
        let vertex_count = positions.len() / 3;
        let mut normals = vec![Vector3::<f32>::zero(); vertex_count];

        let corners = self.triangle_corners();
        for tri in corners.chunks_exact(3) {
            let idx = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if idx.iter().any(|&i| i >= vertex_count) {
                log::warn!("Triangle {:?} references a missing vertex, skipping", idx);
                continue;
            }
            let p = idx.map(|i| vec3_at(&positions, i));
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            if face.magnitude2() < DEGENERATE_AREA {
                continue;
            }
            let face = face.normalize();
            for i in idx {
                normals[i] += face;
            }
        }

        let flat: Vec<f32> = normals
            .into_iter()
            .flat_map(|n| {
                let n = normalize_or_zero(n);
                [n.x, n.y, n.z]
            })
            .collect();

        match self.get_attribute_mut(ATTR_NORMAL) {
            Some(existing) if !force_new => existing.set_data(flat),
            _ => {
                self.set_attribute(ATTR_NORMAL, BufferAttribute::new(flat, 3));
            }
        }
        Ok(())
    }

    /// Derives per-vertex tangents from position and UV gradients.
    ///
    /// Requires position, texCoord and an index buffer. For each triangle
    /// `T = (dPos1 * dUV2.y - dPos2 * dUV1.y) / (dUV1.x * dUV2.y - dUV1.y * dUV2.x)`
    /// is accumulated per vertex and normalized. Triangles whose UV determinant
    /// is near zero are skipped.
    pub fn calculate_tangents(&mut self) -> Result<(), GeometryError> {
        let (Some(position), Some(tex_coord), Some(indices)) = (
            self.get_attribute(ATTR_POSITION),
            self.get_attribute(ATTR_TEX_COORD),
            self.indices.as_ref(),
        ) else {
            log::error!("Position, texCoord, and indices attributes are required to calculate tangents");
            let missing = if self.get_attribute(ATTR_POSITION).is_none() {
                ATTR_POSITION
            } else if self.get_attribute(ATTR_TEX_COORD).is_none() {
                ATTR_TEX_COORD
            } else {
                "indices"
            };
            return Err(GeometryError::MissingAttribute(missing));
        };

        let positions = position.to_f32_vec();
        let uvs = tex_coord.to_f32_vec();
        let vertex_count = positions.len() / 3;
        let mut tangents = vec![Vector3::<f32>::zero(); vertex_count];

        for tri in indices.to_u32_vec().chunks_exact(3) {
            let idx = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if idx.iter().any(|&i| i >= vertex_count || i * 2 + 1 >= uvs.len()) {
                log::warn!("Triangle {:?} references a missing vertex, skipping", idx);
                continue;
            }
            let [v0, v1, v2] = idx.map(|i| vec3_at(&positions, i));
            let [uv0, uv1, uv2] = idx.map(|i| Vector2::new(uvs[i * 2], uvs[i * 2 + 1]));

            let delta_pos1 = v1 - v0;
            let delta_pos2 = v2 - v0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < DEGENERATE_UV {
                continue;
            }
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;
            for i in idx {
                tangents[i] += tangent;
            }
        }

        let flat: Vec<f32> = tangents
            .into_iter()
            .flat_map(|t| {
                let t = normalize_or_zero(t);
                [t.x, t.y, t.z]
            })
            .collect();
        self.set_attribute(ATTR_TANGENT, BufferAttribute::new(flat, 3));
        Ok(())
    }

    /// Average of all vertex positions, `None` without positions.
    pub fn calculate_centroid(&self) -> Option<Vector3<f32>> {
        let position = self.get_attribute(ATTR_POSITION)?;
        let positions = position.to_f32_vec();
        let count = positions.len() / 3;
        if count == 0 {
            return None;
        }
        let sum = (0..count).fold(Vector3::zero(), |acc, i| acc + vec3_at(&positions, i));
        Some(sum / count as f32)
    }

    /// Whether every buffer the renderer requires is present.
    pub fn is_renderable(&self) -> bool {
        self.missing_for_render().is_none()
    }

    /// First buffer required for drawing that this geometry lacks.
    pub fn missing_for_render(&self) -> Option<&'static str> {
        for name in [ATTR_POSITION, ATTR_NORMAL, ATTR_COLOR, ATTR_TANGENT] {
            if self.get_attribute(name).is_none() {
                return Some(name);
            }
        }
        if self.indices.is_none() {
            return Some("indices");
        }
        None
    }

    pub fn to_record(&self) -> BufferGeometryRecord {
        BufferGeometryRecord {
            attributes: self
                .attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.to_record()))
                .collect(),
            indices: self.indices.as_ref().map(BufferAttribute::to_record),
        }
    }

    pub fn from_record(record: &BufferGeometryRecord) -> Self {
        Self {
            attributes: record
                .attributes
                .iter()
                .map(|(name, attr)| (name.clone(), BufferAttribute::from_record(attr)))
                .collect(),
            indices: record.indices.as_ref().map(BufferAttribute::from_record),
        }
    }
}

fn vec3_at(data: &[f32], index: usize) -> Vector3<f32> {
    Vector3::new(data[index * 3], data[index * 3 + 1], data[index * 3 + 2])
}

fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > 0.0 {
        v.normalize()
    } else {
        v
    }
}

/// Serialized form of a [`BufferGeometry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferGeometryRecord {
    pub attributes: BTreeMap<String, BufferAttributeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<BufferAttributeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> BufferGeometry {
        BufferGeometry::new()
            .with_attribute(
                ATTR_POSITION,
                BufferAttribute::new(
                    vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                    3,
                ),
            )
            .with_attribute(
                ATTR_TEX_COORD,
                BufferAttribute::new(vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2),
            )
            .with_indices(BufferAttribute::new(vec![0u16, 1, 2, 0, 2, 3], 1))
    }

    fn assert_vec3(attr: &BufferAttribute, index: usize, expected: [f32; 3]) {
        let got = attr.get(index).unwrap();
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-5, "vertex {}: {:?} != {:?}", index, got, expected);
        }
    }

    #[test]
    fn test_normals_of_flat_quad_point_along_z() {
        let mut geometry = quad();
        geometry.calculate_normals(false).unwrap();

        let normals = geometry.get_attribute(ATTR_NORMAL).unwrap();
        assert_eq!(normals.count(), 4);
        for i in 0..4 {
            assert_vec3(normals, i, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_shared_vertex_averages_face_normals() {
        // Two faces meeting at a right angle along the x axis
        let mut geometry = BufferGeometry::new().with_attribute(
            ATTR_POSITION,
            BufferAttribute::new(
                vec![
                    0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, // faces +z
                    0.0, 0.0, -1.0,
                ],
                3,
            ),
        );
        geometry.set_indices(BufferAttribute::new(vec![0u32, 1, 2, 0, 3, 1], 1));
        geometry.calculate_normals(false).unwrap();

        let normals = geometry.get_attribute(ATTR_NORMAL).unwrap();
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert_vec3(normals, 0, [0.0, s, s]);
        assert_vec3(normals, 2, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unindexed_geometry_uses_sequential_triangles() {
        let mut geometry = quad();
        geometry.remove_indices();
        geometry.calculate_normals(true).unwrap();

        let normals = geometry.get_attribute(ATTR_NORMAL).unwrap();
        assert_vec3(normals, 0, [0.0, 0.0, 1.0]);
        // Vertex 3 is not part of the first (only complete) triangle
        assert_vec3(normals, 3, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_degenerate_triangle_produces_no_nan() {
        let mut geometry = BufferGeometry::new()
            .with_attribute(
                ATTR_POSITION,
                BufferAttribute::new(vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0], 3),
            )
            .with_indices(BufferAttribute::new(vec![0u16, 1, 2], 1));
        geometry.calculate_normals(false).unwrap();

        let normals = geometry.get_attribute(ATTR_NORMAL).unwrap().to_f32_vec();
        assert!(normals.iter().all(|n| n.is_finite()));
        assert!(normals.iter().all(|n| *n == 0.0));
    }

    #[test]
    fn test_existing_normal_attribute_is_reused_and_dirtied() {
        let mut geometry = quad();
        geometry.set_attribute(ATTR_NORMAL, BufferAttribute::new(vec![9.0f32; 12], 3));
        geometry.get_attribute_mut(ATTR_NORMAL).unwrap().consume();

        geometry.calculate_normals(false).unwrap();
        let normals = geometry.get_attribute(ATTR_NORMAL).unwrap();
        assert!(normals.is_dirty());
        assert_vec3(normals, 1, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normals_require_position() {
        let mut geometry = BufferGeometry::new();
        assert!(matches!(
            geometry.calculate_normals(false),
            Err(GeometryError::MissingAttribute(ATTR_POSITION))
        ));
    }

    #[test]
    fn test_tangents_follow_u_direction() {
        let mut geometry = quad();
        geometry.calculate_tangents().unwrap();

        let tangents = geometry.get_attribute(ATTR_TANGENT).unwrap();
        for i in 0..4 {
            assert_vec3(tangents, i, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_tangents_skip_degenerate_uvs() {
        let mut geometry = quad();
        geometry.set_attribute(ATTR_TEX_COORD, BufferAttribute::new(vec![0.5f32; 8], 2));
        geometry.calculate_tangents().unwrap();

        let tangents = geometry.get_attribute(ATTR_TANGENT).unwrap().to_f32_vec();
        assert!(tangents.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn test_tangents_require_indices() {
        let mut geometry = quad();
        geometry.remove_indices();
        assert!(matches!(
            geometry.calculate_tangents(),
            Err(GeometryError::MissingAttribute("indices"))
        ));
        assert!(geometry.get_attribute(ATTR_TANGENT).is_none());
    }

    #[test]
    fn test_centroid() {
        let c = quad().calculate_centroid().unwrap();
        assert!((c.x - 0.5).abs() < 1e-6);
        assert!((c.y - 0.5).abs() < 1e-6);
        assert!(BufferGeometry::new().calculate_centroid().is_none());
    }

    #[test]
    fn test_missing_for_render_reports_first_gap() {
        let mut geometry = quad();
        assert_eq!(geometry.missing_for_render(), Some(ATTR_NORMAL));
        geometry.calculate_normals(false).unwrap();
        geometry.calculate_tangents().unwrap();
        assert_eq!(geometry.missing_for_render(), Some(ATTR_COLOR));
        geometry.set_attribute(ATTR_COLOR, BufferAttribute::new(vec![1.0f32; 16], 4));
        assert!(geometry.is_renderable());
    }

    #[test]
    fn test_record_round_trip_preserves_attributes() {
        let geometry = quad();
        let json = serde_json::to_string(&geometry.to_record()).unwrap();
        let record: BufferGeometryRecord = serde_json::from_str(&json).unwrap();
        let back = BufferGeometry::from_record(&record);

        assert_eq!(back, geometry);
    }
}
