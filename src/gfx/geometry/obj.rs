//! Wavefront OBJ import.
//!
//! Each model in the file becomes one [`BufferGeometry`]. Missing normals are
//! derived from the faces, missing UVs are zero-filled and vertex color falls
//! back to white when the file carries none.

use std::io::BufRead;
use std::path::Path;

use super::{
    BufferAttribute, BufferGeometry, GeometryError, ATTR_COLOR, ATTR_NORMAL, ATTR_POSITION,
    ATTR_TEX_COORD,
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Loads every model in an OBJ file as `(name, geometry)` pairs.
///
/// Material libraries are ignored; appearance is assigned through the scene's
/// material system instead.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<(String, BufferGeometry)>, GeometryError> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    log::info!("Loaded {} model(s) from {}", models.len(), path.display());
    Ok(models.iter().map(convert_model).collect())
}

/// Parses OBJ text from any buffered reader.
pub fn load_obj_from_reader<R: BufRead>(
    reader: &mut R,
) -> Result<Vec<(String, BufferGeometry)>, GeometryError> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;
    Ok(models.iter().map(convert_model).collect())
}

fn convert_model(model: &tobj::Model) -> (String, BufferGeometry) {
    let name = if model.name.is_empty() {
        "Mesh".to_string()
    } else {
        model.name.clone()
    };
    (name, geometry_from_mesh(&model.mesh))
}

/// Converts a triangulated, single-indexed `tobj` mesh.
pub fn geometry_from_mesh(mesh: &tobj::Mesh) -> BufferGeometry {
    let vertex_count = mesh.positions.len() / 3;

    let mut geometry = BufferGeometry::new()
        .with_attribute(ATTR_POSITION, BufferAttribute::new(mesh.positions.clone(), 3))
        .with_indices(BufferAttribute::new(mesh.indices.clone(), 1));

    let tex_coords = if mesh.texcoords.len() == vertex_count * 2 {
        mesh.texcoords.clone()
    } else {
        vec![0.0; vertex_count * 2]
    };
    geometry.set_attribute(ATTR_TEX_COORD, BufferAttribute::new(tex_coords, 2));

    let colors = if mesh.vertex_color.len() == vertex_count * 3 {
        mesh.vertex_color
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 1.0])
            .collect()
    } else {
        vec![1.0f32; vertex_count * 4]
    };
    geometry.set_attribute(ATTR_COLOR, BufferAttribute::new(colors, 4));

    if mesh.normals.len() == mesh.positions.len() && !mesh.normals.is_empty() {
        geometry.set_attribute(ATTR_NORMAL, BufferAttribute::new(mesh.normals.clone(), 3));
    } else if let Err(e) = geometry.calculate_normals(true) {
        log::warn!("Could not derive normals for OBJ mesh: {}", e);
    }

    if let Err(e) = geometry.calculate_tangents() {
        log::warn!("Could not derive tangents for OBJ mesh: {}", e);
    }

    geometry
}
