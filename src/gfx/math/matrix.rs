//! Matrix builders for transforms, cameras and lighting
//!
//! All matrices use cgmath's column-vector convention: a point is transformed
//! as `M * p`, and a child's world matrix is `parent_world * local`. Element
//! storage is column-major, so `elements[12..15]` hold the translation.

use cgmath::{
    Matrix, Matrix3, Matrix4, Point3, Quaternion, Rad, SquareMatrix, Vector3,
};

/// Vertical field of view used by perspective cameras.
pub const PERSPECTIVE_FOV: Rad<f32> = Rad(std::f32::consts::FRAC_PI_4);
pub const PERSPECTIVE_NEAR: f32 = 0.1;
pub const PERSPECTIVE_FAR: f32 = 1000.0;

/// Shear strength of the oblique projection.
pub const OBLIQUE_SCALE: f32 = 0.5;

/// Remaps OpenGL clip depth (-1..1) to the 0..1 range wgpu clips against.
///
/// The builders below produce OpenGL-convention projections, which is what
/// scene files and the backend-neutral renderer carry. Backends with a 0..1
/// depth range apply this on the way to the GPU.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Local transform from translation, rotation and scale.
///
/// Scale is applied first, then rotation, then translation.
pub fn compose_trs(
    translation: Vector3<f32>,
    rotation: Quaternion<f32>,
    scale: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(translation)
        * Matrix4::from(rotation)
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// Translation column of a transform.
pub fn translation_of(matrix: &Matrix4<f32>) -> Vector3<f32> {
    matrix.w.truncate()
}

/// View matrix looking from `eye` towards `target`.
///
/// The forward axis is `normalize(eye - target)`, right is `up x forward` and
/// the corrected up is `forward x right`.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(
        Point3::new(eye.x, eye.y, eye.z),
        Point3::new(target.x, target.y, target.z),
        up,
    )
}

pub fn perspective(aspect: f32) -> Matrix4<f32> {
    cgmath::perspective(PERSPECTIVE_FOV, aspect, PERSPECTIVE_NEAR, PERSPECTIVE_FAR)
}

pub fn orthographic(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Matrix4<f32> {
    cgmath::ortho(left, right, bottom, top, near, far)
}

/// Orthographic projection with a cabinet-style shear applied first.
///
/// `angle_degrees` selects the receding direction of the z axis.
pub fn oblique(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
    angle_degrees: f32,
) -> Matrix4<f32> {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let mut shear = Matrix4::identity();
    shear.z.x = -OBLIQUE_SCALE * cos;
    shear.z.y = OBLIQUE_SCALE * sin;

    orthographic(left, right, bottom, top, near, far) * shear
}

/// Inverse-transpose of the upper 3x3 of `model_view`.
///
/// A singular matrix is logged and yields identity.
pub fn normal_matrix(model_view: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(
        model_view.x.truncate(),
        model_view.y.truncate(),
        model_view.z.truncate(),
    );

    match upper.invert() {
        Some(inverse) => inverse.transpose(),
        None => {
            log::error!("Matrix is singular and cannot be inverted, using identity normal matrix");
            Matrix3::identity()
        }
    }
}

/// Rotates `v` about the X axis by `angle` radians.
pub fn rotate_x(v: Vector3<f32>, angle: f32) -> Vector3<f32> {
    Matrix3::from_angle_x(Rad(angle)) * v
}

/// Rotates `v` about the Y axis by `angle` radians.
pub fn rotate_y(v: Vector3<f32>, angle: f32) -> Vector3<f32> {
    Matrix3::from_angle_y(Rad(angle)) * v
}

/// Flat column-major copy of a 4x4 matrix.
pub fn to_elements(matrix: &Matrix4<f32>) -> [f32; 16] {
    let cols: &[[f32; 4]; 4] = matrix.as_ref();
    let mut out = [0.0; 16];
    for (i, col) in cols.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(col);
    }
    out
}

/// Builds a matrix from column-major elements, `None` unless exactly 16 are given.
pub fn from_elements(elements: &[f32]) -> Option<Matrix4<f32>> {
    if elements.len() != 16 {
        return None;
    }
    let e = elements;
    Some(Matrix4::new(
        e[0], e[1], e[2], e[3], e[4], e[5], e[6], e[7], e[8], e[9], e[10], e[11], e[12], e[13],
        e[14], e[15],
    ))
}

/// Flat column-major copy of a 3x3 matrix.
pub fn mat3_to_elements(matrix: &Matrix3<f32>) -> [f32; 9] {
    let cols: &[[f32; 3]; 3] = matrix.as_ref();
    let mut out = [0.0; 9];
    for (i, col) in cols.iter().enumerate() {
        out[i * 3..i * 3 + 3].copy_from_slice(col);
    }
    out
}

/// Element-wise comparison with an absolute tolerance.
pub fn matrices_close(a: &Matrix4<f32>, b: &Matrix4<f32>, epsilon: f32) -> bool {
    to_elements(a)
        .iter()
        .zip(to_elements(b).iter())
        .all(|(x, y)| (x - y).abs() <= epsilon)
}
