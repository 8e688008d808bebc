//! Plain serde records for math types
//!
//! Scene and clip files store vectors as `{x, y, z}`, quaternions as
//! `{x, y, z, w}` and matrices as `{elements: [16 numbers]}` in column-major
//! order. These records convert to and from the cgmath types.

use cgmath::{Matrix4, Point3, Quaternion, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};

use super::matrix::{from_elements, to_elements};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Record {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vector3<f32>> for Vec3Record {
    fn from(v: Vector3<f32>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Record> for Vector3<f32> {
    fn from(r: Vec3Record) -> Self {
        Vector3::new(r.x, r.y, r.z)
    }
}

impl From<Point3<f32>> for Vec3Record {
    fn from(p: Point3<f32>) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

impl From<Vec3Record> for Point3<f32> {
    fn from(r: Vec3Record) -> Self {
        Point3::new(r.x, r.y, r.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuatRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Quaternion<f32>> for QuatRecord {
    fn from(q: Quaternion<f32>) -> Self {
        Self { x: q.v.x, y: q.v.y, z: q.v.z, w: q.s }
    }
}

impl From<QuatRecord> for Quaternion<f32> {
    fn from(r: QuatRecord) -> Self {
        Quaternion::new(r.w, r.x, r.y, r.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mat4Record {
    pub elements: Vec<f32>,
}

impl From<Matrix4<f32>> for Mat4Record {
    fn from(m: Matrix4<f32>) -> Self {
        Self {
            elements: to_elements(&m).to_vec(),
        }
    }
}

impl Mat4Record {
    /// Matrix from the stored elements, identity when the array is malformed.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        from_elements(&self.elements).unwrap_or_else(|| {
            log::warn!(
                "Matrix record has {} elements instead of 16, using identity",
                self.elements.len()
            );
            Matrix4::identity()
        })
    }
}
