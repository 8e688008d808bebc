//! # Primitive Shape Generation
//!
//! Solid box, plane, sphere, cone and cylinder generators, plus hollow
//! wireframe models (box, octahedron, tesseract) built from square beams.
//! Every shape carries position, normal, texCoord, color, tangent and
//! indices. Shapes are Y-up and centered on the origin.

use super::{BufferGeometry, GeometryData};
use cgmath::{InnerSpace, Vector3};
use std::f32::consts::PI;

/// Axis-aligned box centered at the origin.
///
/// Each face has its own four vertices so normals stay flat and UVs span 0..1
/// per face.
///
/// # Arguments
/// * `width` - Extent along X
/// * `height` - Extent along Y
/// * `depth` - Extent along Z
pub fn box_geometry(width: f32, height: f32, depth: f32) -> BufferGeometry {
    let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);
    let mut data = GeometryData::new();

    data.vertices = vec![
        // Front face
        [-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z],
        // Back face
        [-x, -y, -z], [-x, y, -z], [x, y, -z], [x, -y, -z],
        // Left face
        [-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z],
        // Right face
        [x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z],
        // Top face
        [-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z],
        // Bottom face
        [-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z],
    ];

    data.tex_coords = vec![
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
    ];

    let face_normals: [[f32; 3]; 6] = [
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
        [-1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
    ];
    data.normals = face_normals
        .iter()
        .flat_map(|n| std::iter::repeat(*n).take(4))
        .collect();

    data.indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect();

    data.into_buffer_geometry()
}

/// Single-quad plane in the XZ plane facing +Y.
pub fn plane_geometry(width: f32, depth: f32) -> BufferGeometry {
    subdivided_plane(width, depth, 1, 1)
}

/// Plane in the XZ plane facing +Y, split into a grid of quads.
///
/// # Arguments
/// * `width` - Extent along X
/// * `depth` - Extent along Z
/// * `width_segments` - Subdivisions along X (at least 1)
/// * `depth_segments` - Subdivisions along Z (at least 1)
pub fn subdivided_plane(
    width: f32,
    depth: f32,
    width_segments: u32,
    depth_segments: u32,
) -> BufferGeometry {
    let mut data = GeometryData::new();
    let w_segs = width_segments.max(1);
    let d_segs = depth_segments.max(1);

    for row in 0..=d_segs {
        let v = row as f32 / d_segs as f32;
        let pos_z = (v - 0.5) * depth;
        for col in 0..=w_segs {
            let u = col as f32 / w_segs as f32;
            let pos_x = (u - 0.5) * width;
            data.vertices.push([pos_x, 0.0, pos_z]);
            data.normals.push([0.0, 1.0, 0.0]);
            data.tex_coords.push([u, v]);
        }
    }

    for row in 0..d_segs {
        for col in 0..w_segs {
            let i = row * (w_segs + 1) + col;
            let next_row = i + w_segs + 1;
            data.indices.extend_from_slice(&[i, next_row, i + 1]);
            data.indices.extend_from_slice(&[next_row, next_row + 1, i + 1]);
        }
    }

    data.into_buffer_geometry()
}

/// UV sphere of the given radius.
///
/// # Arguments
/// * `longitude_segments` - Vertical slices (at least 3)
/// * `latitude_segments` - Horizontal rings (at least 2)
pub fn sphere_geometry(radius: f32, longitude_segments: u32, latitude_segments: u32) -> BufferGeometry {
    let mut data = GeometryData::new();
    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            data.vertices
                .push([normal[0] * radius, normal[1] * radius, normal[2] * radius]);
            data.normals.push(normal);
            data.tex_coords.push([
                long as f32 / long_segs as f32,
                lat as f32 / lat_segs as f32,
            ]);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;
            data.indices.extend_from_slice(&[first, second, first + 1]);
            data.indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }

    data.into_buffer_geometry()
}

/// Cone with its apex at `+height / 2` and a flat base at `-height / 2`.
///
/// The side gets smooth slope normals. The apex is split per segment so
/// each wedge keeps its own normal and UV.
pub fn cone_geometry(radius: f32, height: f32, radial_segments: u32) -> BufferGeometry {
    cylinder_geometry(0.0, radius, height, radial_segments)
}

/// Capped cylinder or frustum.
///
/// # Arguments
/// * `top_radius` - Radius of the `+height / 2` ring (0 gives a cone)
/// * `bottom_radius` - Radius of the `-height / 2` ring
/// * `radial_segments` - Slices around the axis (at least 3)
pub fn cylinder_geometry(
    top_radius: f32,
    bottom_radius: f32,
    height: f32,
    radial_segments: u32,
) -> BufferGeometry {
    let mut data = GeometryData::new();
    let segs = radial_segments.max(3);
    let half = height * 0.5;
    // Slope of the side wall, shared by every slice
    let (slope_out, slope_up) = (height, bottom_radius - top_radius);
    let slope_len = (slope_out * slope_out + slope_up * slope_up).sqrt().max(f32::EPSILON);

    for i in 0..=segs {
        let u = i as f32 / segs as f32;
        let (sin, cos) = (u * 2.0 * PI).sin_cos();
        let normal = [cos * slope_out / slope_len, slope_up / slope_len, sin * slope_out / slope_len];

        data.vertices.push([cos * bottom_radius, -half, sin * bottom_radius]);
        data.normals.push(normal);
        data.tex_coords.push([u, 0.0]);

        // A pointed top uses the middle of the wedge for its UV
        let top_u = if top_radius == 0.0 { (i as f32 + 0.5) / segs as f32 } else { u };
        data.vertices.push([cos * top_radius, half, sin * top_radius]);
        data.normals.push(normal);
        data.tex_coords.push([top_u, 1.0]);
    }
    for i in 0..segs {
        let (bottom, top) = (i * 2, i * 2 + 1);
        let (next_bottom, next_top) = (bottom + 2, top + 2);
        data.indices.extend_from_slice(&[bottom, top, next_bottom]);
        if top_radius != 0.0 {
            data.indices.extend_from_slice(&[top, next_top, next_bottom]);
        }
    }

    push_cap(&mut data, bottom_radius, -half, segs, false);
    if top_radius != 0.0 {
        push_cap(&mut data, top_radius, half, segs, true);
    }

    data.into_buffer_geometry()
}

/// Flat disc at height `y` facing +Y (`up`) or -Y.
fn push_cap(data: &mut GeometryData, radius: f32, y: f32, segs: u32, up: bool) {
    let normal = [0.0, if up { 1.0 } else { -1.0 }, 0.0];
    let center = data.vertices.len() as u32;
    data.vertices.push([0.0, y, 0.0]);
    data.normals.push(normal);
    data.tex_coords.push([0.5, 0.5]);

    for i in 0..=segs {
        let (sin, cos) = (i as f32 / segs as f32 * 2.0 * PI).sin_cos();
        data.vertices.push([cos * radius, y, sin * radius]);
        data.normals.push(normal);
        data.tex_coords.push([cos * 0.5 + 0.5, sin * 0.5 + 0.5]);
    }
    for i in 0..segs {
        let (rim, next) = (center + 1 + i, center + 2 + i);
        if up {
            data.indices.extend_from_slice(&[center, next, rim]);
        } else {
            data.indices.extend_from_slice(&[center, rim, next]);
        }
    }
}

/// Appends a quad with its own flat normal, wound to face away from `center`.
fn push_quad(data: &mut GeometryData, mut corners: [Vector3<f32>; 4], center: Vector3<f32>) {
    let mut normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
    let middle = (corners[0] + corners[1] + corners[2] + corners[3]) / 4.0;
    if normal.dot(middle - center) < 0.0 {
        corners.reverse();
        normal = -normal;
    }
    let normal = normal.normalize();

    let base = data.vertices.len() as u32;
    for (corner, uv) in corners.iter().zip([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]) {
        data.vertices.push((*corner).into());
        data.normals.push(normal.into());
        data.tex_coords.push(uv);
    }
    data.indices
        .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

/// Square beam of side `width` from `from` to `to`, extended by half its
/// width past both ends so beams meeting at a joint close the corner.
fn push_beam(data: &mut GeometryData, from: Vector3<f32>, to: Vector3<f32>, width: f32) {
    let axis = to - from;
    if axis.magnitude2() < 1e-12 {
        log::warn!("Skipping zero-length beam at {:?}", from);
        return;
    }
    let dir = axis.normalize();
    let half = width * 0.5;
    let reference = if dir.y.abs() < 0.9 { Vector3::unit_y() } else { Vector3::unit_x() };
    let side = dir.cross(reference).normalize() * half;
    let up = side.cross(dir).normalize() * half;

    let start = from - dir * half;
    let end = to + dir * half;
    let ring = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let near = ring.map(|(s, u)| start + side * s + up * u);
    let far = ring.map(|(s, u)| end + side * s + up * u);
    let center = (from + to) / 2.0;

    for i in 0..4 {
        let j = (i + 1) % 4;
        push_quad(data, [near[i], near[j], far[j], far[i]], center);
    }
    push_quad(data, near, center);
    push_quad(data, far, center);
}

/// The eight corners of a box with the given half extents. Bit 0 picks +X,
/// bit 1 +Y and bit 2 +Z.
fn box_corners(half: Vector3<f32>) -> [Vector3<f32>; 8] {
    std::array::from_fn(|i| {
        let sign = |bit: usize| if i & (1 << bit) != 0 { 1.0 } else { -1.0 };
        Vector3::new(sign(0) * half.x, sign(1) * half.y, sign(2) * half.z)
    })
}

/// The twelve edges of a box frame as beams.
fn push_box_frame(data: &mut GeometryData, half: Vector3<f32>, width: f32) {
    let corners = box_corners(half);
    for a in 0..8 {
        for bit in 0..3 {
            let b = a | (1 << bit);
            if b != a {
                push_beam(data, corners[a], corners[b], width);
            }
        }
    }
}

/// Beam width and inset half extents for a hollow model whose outer faces
/// sit at `width / 2`, `height / 2` and `depth / 2`.
fn frame_extents(width: f32, height: f32, depth: f32, thickness: f32) -> (f32, Vector3<f32>) {
    let outer = Vector3::new(width, height, depth) * 0.5;
    let limit = outer.x.min(outer.y).min(outer.z).max(1e-4);
    let beam = thickness.clamp(1e-4, limit);
    let inset = outer - Vector3::new(beam, beam, beam) * 0.5;
    (beam, inset)
}

/// Wireframe box: twelve square beams of side `thickness` whose outer faces
/// span the full `width` x `height` x `depth`.
pub fn hollow_box_geometry(width: f32, height: f32, depth: f32, thickness: f32) -> BufferGeometry {
    let (beam, inset) = frame_extents(width, height, depth, thickness);
    let mut data = GeometryData::new();
    push_box_frame(&mut data, inset, beam);
    data.into_buffer_geometry()
}

/// Wireframe octahedron: beams joining the six axis tips at `±width / 2`,
/// `±height / 2` and `±depth / 2`. Opposite tips are not joined.
pub fn hollow_octahedron_geometry(width: f32, height: f32, depth: f32, thickness: f32) -> BufferGeometry {
    let (hw, hh, hd) = (width * 0.5, height * 0.5, depth * 0.5);
    let tips = [
        Vector3::new(hw, 0.0, 0.0),
        Vector3::new(-hw, 0.0, 0.0),
        Vector3::new(0.0, hh, 0.0),
        Vector3::new(0.0, -hh, 0.0),
        Vector3::new(0.0, 0.0, hd),
        Vector3::new(0.0, 0.0, -hd),
    ];
    let mut data = GeometryData::new();
    for a in 0..tips.len() {
        // Tips come in opposite pairs (0, 1), (2, 3), (4, 5)
        for b in (a + 1)..tips.len() {
            if a / 2 != b / 2 {
                push_beam(&mut data, tips[a], tips[b], thickness.max(1e-4));
            }
        }
    }
    data.into_buffer_geometry()
}

/// Wireframe tesseract projection: an outer box frame, an inner frame at
/// half the size, and a strut joining each outer corner to its inner one.
pub fn hollow_tesseract_geometry(width: f32, height: f32, depth: f32, thickness: f32) -> BufferGeometry {
    let (beam, outer) = frame_extents(width, height, depth, thickness);
    let inner = outer * 0.5;
    let mut data = GeometryData::new();

    push_box_frame(&mut data, outer, beam);
    push_box_frame(&mut data, inner, beam);
    for (from, to) in box_corners(outer).into_iter().zip(box_corners(inner)) {
        // Pull the ends in so the caps stay inside both frames
        let pull = (to - from).normalize() * beam * 0.5;
        push_beam(&mut data, from + pull, to - pull, beam);
    }
    data.into_buffer_geometry()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::{ATTR_COLOR, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT};

    #[test]
    fn test_box_generation() {
        let cube = box_geometry(2.0, 2.0, 2.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices().unwrap().count(), 36);
        assert!(cube.is_renderable());

        let positions = cube.get_attribute(ATTR_POSITION).unwrap().to_f32_vec();
        assert!(positions.iter().all(|p| p.abs() == 1.0));
    }

    #[test]
    fn test_box_winding_matches_stored_normals() {
        let mut cube = box_geometry(1.0, 1.0, 1.0);
        let stored = cube.get_attribute(ATTR_NORMAL).unwrap().clone();
        cube.calculate_normals(true).unwrap();
        let derived = cube.get_attribute(ATTR_NORMAL).unwrap();

        for (a, b) in stored.to_f32_vec().iter().zip(derived.to_f32_vec()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_plane_generation() {
        let plane = subdivided_plane(2.0, 2.0, 2, 2);
        assert_eq!(plane.vertex_count(), 9);
        assert_eq!(plane.indices().unwrap().count(), 24);

        let tangent = plane.get_attribute(ATTR_TANGENT).unwrap().get(4).unwrap();
        assert!((tangent[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_plane_faces_up() {
        let mut plane = plane_geometry(1.0, 1.0);
        plane.calculate_normals(true).unwrap();
        let normal = plane.get_attribute(ATTR_NORMAL).unwrap().get(0).unwrap();
        assert!((normal[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = sphere_geometry(2.0, 8, 6);
        assert_eq!(sphere.vertex_count(), 9 * 7);
        assert_eq!(sphere.get_attribute(ATTR_COLOR).unwrap().count(), 63);

        let p = sphere.get_attribute(ATTR_POSITION).unwrap().get(10).unwrap();
        let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!((r - 2.0).abs() < 1e-4);
    }

    /// Every stored normal agrees in direction with the one implied by the
    /// triangle winding.
    fn assert_outward_winding(geometry: &BufferGeometry) {
        let stored = geometry.get_attribute(ATTR_NORMAL).unwrap().to_f32_vec();
        let mut derived = geometry.clone();
        derived.calculate_normals(true).unwrap();
        let derived = derived.get_attribute(ATTR_NORMAL).unwrap().to_f32_vec();

        for (i, (a, b)) in stored.chunks_exact(3).zip(derived.chunks_exact(3)).enumerate() {
            if b == [0.0, 0.0, 0.0] {
                // Not referenced by any triangle
                continue;
            }
            let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
            assert!(dot > 0.0, "vertex {} stored {:?} derived {:?}", i, a, b);
        }
    }

    fn max_extent(geometry: &BufferGeometry) -> [f32; 3] {
        let positions = geometry.get_attribute(ATTR_POSITION).unwrap().to_f32_vec();
        let mut extent = [0.0f32; 3];
        for p in positions.chunks_exact(3) {
            for axis in 0..3 {
                extent[axis] = extent[axis].max(p[axis].abs());
            }
        }
        extent
    }

    #[test]
    fn test_cone_generation() {
        let cone = cone_geometry(1.0, 2.0, 8);
        // 9 side pairs, then a base center and 9 rim points
        assert_eq!(cone.vertex_count(), 18 + 10);
        assert_eq!(cone.indices().unwrap().count(), (8 + 8) * 3);
        assert!(cone.is_renderable());
        assert_outward_winding(&cone);

        let apex = cone.get_attribute(ATTR_POSITION).unwrap().get(1).unwrap();
        assert_eq!(apex, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_cylinder_generation() {
        let cylinder = cylinder_geometry(1.0, 1.0, 2.0, 6);
        assert_eq!(cylinder.vertex_count(), 14 + 2 * 8);
        assert_eq!(cylinder.indices().unwrap().count(), (12 + 6 + 6) * 3);
        assert!(cylinder.is_renderable());
        assert_outward_winding(&cylinder);

        // Straight walls have horizontal normals
        let normal = cylinder.get_attribute(ATTR_NORMAL).unwrap().get(0).unwrap();
        assert!((normal[0] - 1.0).abs() < 1e-5 && normal[1].abs() < 1e-5);
    }

    #[test]
    fn test_frustum_normals_tilt_up() {
        let frustum = cylinder_geometry(0.5, 1.0, 1.0, 8);
        assert_outward_winding(&frustum);
        let normal = frustum.get_attribute(ATTR_NORMAL).unwrap().get(0).unwrap();
        assert!(normal[1] > 0.0);
    }

    #[test]
    fn test_hollow_box_generation() {
        let frame = hollow_box_geometry(2.0, 4.0, 6.0, 0.2);
        // 12 beams of 6 quads
        assert_eq!(frame.vertex_count(), 12 * 24);
        assert_eq!(frame.indices().unwrap().count(), 12 * 36);
        assert!(frame.is_renderable());
        assert_outward_winding(&frame);

        let extent = max_extent(&frame);
        for (got, want) in extent.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-5, "{:?}", extent);
        }
        let tangents = frame.get_attribute(ATTR_TANGENT).unwrap();
        assert_eq!(tangents.count(), frame.vertex_count());
    }

    #[test]
    fn test_hollow_octahedron_generation() {
        let octahedron = hollow_octahedron_geometry(2.0, 2.0, 2.0, 0.1);
        assert_eq!(octahedron.vertex_count(), 12 * 24);
        assert!(octahedron.is_renderable());
        assert_outward_winding(&octahedron);

        // Tips stick out by half a beam past each axis extent
        let extent = max_extent(&octahedron);
        assert!(extent.iter().all(|e| *e > 1.0 && *e < 1.1), "{:?}", extent);
    }

    #[test]
    fn test_hollow_tesseract_generation() {
        let tesseract = hollow_tesseract_geometry(2.0, 2.0, 2.0, 0.1);
        // Outer frame, inner frame and eight struts
        assert_eq!(tesseract.vertex_count(), (12 + 12 + 8) * 24);
        assert!(tesseract.is_renderable());
        assert_outward_winding(&tesseract);

        let extent = max_extent(&tesseract);
        assert!(extent.iter().all(|e| (e - 1.0).abs() < 1e-5), "{:?}", extent);
    }

    #[test]
    fn test_oversized_thickness_is_clamped() {
        let frame = hollow_box_geometry(1.0, 1.0, 1.0, 5.0);
        let extent = max_extent(&frame);
        assert!(extent.iter().all(|e| (e - 0.5).abs() < 1e-5), "{:?}", extent);
    }
}
