//! Mesh payload: one geometry drawn with one material.

use crate::gfx::geometry::BufferGeometry;
use crate::gfx::resources::Material;

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: BufferGeometry,
    pub material: Material,
    /// Shade with the per-vertex color attribute instead of the material color.
    pub use_vertex_color: bool,
}

impl Mesh {
    pub fn new(geometry: BufferGeometry, material: impl Into<Material>) -> Self {
        Self {
            geometry,
            material: material.into(),
            use_vertex_color: false,
        }
    }

    pub fn with_vertex_color(mut self, use_vertex_color: bool) -> Self {
        self.use_vertex_color = use_vertex_color;
        self
    }
}
