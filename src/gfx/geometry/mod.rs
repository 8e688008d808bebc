//! # Geometry
//!
//! Vertex data for the scene graph. A [`BufferGeometry`] is a set of named
//! [`BufferAttribute`]s plus an optional index buffer; renderers consume the
//! `position`, `normal`, `color`, `tangent` and index buffers.
//!
//! ## Key Components
//!
//! - [`BufferAttribute`] - Typed flat array with an element size and dirty flag
//! - [`BufferGeometry`] - Named attributes with normal, tangent and centroid derivation
//! - [`primitives`] - Box, plane and sphere generators
//! - [`obj`] - Wavefront OBJ import via `tobj`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use marionette::gfx::geometry::{box_geometry, ATTR_TANGENT};
//!
//! let cube = box_geometry(1.0, 1.0, 1.0);
//! assert!(cube.get_attribute(ATTR_TANGENT).is_some());
//! ```

pub mod attribute;
pub mod buffer_geometry;
pub mod obj;
pub mod primitives;

pub use attribute::{AttributeData, BufferAttribute, BufferAttributeRecord, DataType};
pub use buffer_geometry::*;
pub use primitives::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("unsupported attribute data type {0:#x}")]
    UnsupportedDataType(u32),
    #[error("geometry is missing required attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("failed to load OBJ file: {0}")]
    Obj(#[from] tobj::LoadError),
}

/// Per-vertex arrays collected by the generators before they become a
/// [`BufferGeometry`].
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub vertices: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Packs the arrays into attributes, adds a white vertex color and derives
    /// tangents so the result is ready to draw.
    pub fn into_buffer_geometry(self) -> BufferGeometry {
        let vertex_count = self.vertices.len();
        let mut geometry = BufferGeometry::new()
            .with_attribute(
                ATTR_POSITION,
                BufferAttribute::new(self.vertices.concat(), 3),
            )
            .with_attribute(ATTR_NORMAL, BufferAttribute::new(self.normals.concat(), 3))
            .with_attribute(
                ATTR_TEX_COORD,
                BufferAttribute::new(self.tex_coords.concat(), 2),
            )
            .with_attribute(
                ATTR_COLOR,
                BufferAttribute::new(vec![1.0f32; vertex_count * 4], 4),
            )
            .with_indices(BufferAttribute::new(self.indices, 1));

        if let Err(e) = geometry.calculate_tangents() {
            log::warn!("Generated geometry has no tangents: {}", e);
        }
        geometry
    }
}
