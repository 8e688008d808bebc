//! Keyframes and their JSON records.

use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::gfx::math::{QuatRecord, QuaternionExt, Vec3Record};

use super::easing::EasingType;

/// A value pinned to a frame. `interpolation` shapes the curve from this
/// keyframe to the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame<T> {
    pub frame: f32,
    pub value: T,
    pub interpolation: EasingType,
}

pub type Vec3KeyFrame = KeyFrame<Vector3<f32>>;
pub type QuaternionKeyFrame = KeyFrame<Quaternion<f32>>;

impl<T> KeyFrame<T> {
    pub fn new(frame: f32, value: T, interpolation: EasingType) -> Self {
        Self {
            frame,
            value,
            interpolation,
        }
    }
}

impl QuaternionKeyFrame {
    /// Rotation keyframe from Euler angles in degrees.
    pub fn from_euler(frame: f32, x: f32, y: f32, z: f32, interpolation: EasingType) -> Self {
        Self::new(frame, Quaternion::from_euler_degrees(Vector3::new(x, y, z)), interpolation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFrameRecord<T> {
    pub frame: f32,
    pub value: T,
    #[serde(default)]
    pub interpolation: EasingType,
}

impl From<&Vec3KeyFrame> for KeyFrameRecord<Vec3Record> {
    fn from(k: &Vec3KeyFrame) -> Self {
        Self {
            frame: k.frame,
            value: k.value.into(),
            interpolation: k.interpolation,
        }
    }
}

impl From<KeyFrameRecord<Vec3Record>> for Vec3KeyFrame {
    fn from(r: KeyFrameRecord<Vec3Record>) -> Self {
        KeyFrame::new(r.frame, r.value.into(), r.interpolation)
    }
}

impl From<&QuaternionKeyFrame> for KeyFrameRecord<QuatRecord> {
    fn from(k: &QuaternionKeyFrame) -> Self {
        Self {
            frame: k.frame,
            value: k.value.into(),
            interpolation: k.interpolation,
        }
    }
}

impl From<KeyFrameRecord<QuatRecord>> for QuaternionKeyFrame {
    fn from(r: KeyFrameRecord<QuatRecord>) -> Self {
        KeyFrame::new(r.frame, r.value.into(), r.interpolation)
    }
}
