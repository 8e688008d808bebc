//! Keyframe tracks bound to scene nodes by name path.

use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gfx::math::{QuatRecord, QuaternionExt, Vec3Record};
use crate::gfx::scene::{NodeId, Scene, SceneError};

use super::easing::ease;
use super::keyframe::{KeyFrame, KeyFrameRecord, QuaternionKeyFrame, Vec3KeyFrame};
use super::AnimationError;

/// Track `type` tag in clip files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Translation,
    Scale,
    Quaternion,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Translation => "translation",
            TrackKind::Scale => "scale",
            TrackKind::Quaternion => "quaternion",
        }
    }

    pub fn parse(tag: &str) -> Result<Self, AnimationError> {
        match tag {
            "translation" => Ok(TrackKind::Translation),
            "scale" => Ok(TrackKind::Scale),
            "quaternion" => Ok(TrackKind::Quaternion),
            other => Err(AnimationError::UnknownTrackType(other.to_string())),
        }
    }
}

/// Node property a vector track writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorTarget {
    Translation,
    Scale,
}

/// Value a track produces for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    Translation(Vector3<f32>),
    Scale(Vector3<f32>),
    Quaternion(Quaternion<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyFrameTrack {
    Vector {
        target: VectorTarget,
        node_path: String,
        key_frames: Vec<Vec3KeyFrame>,
        bound: Option<NodeId>,
    },
    Rotation {
        node_path: String,
        key_frames: Vec<QuaternionKeyFrame>,
        bound: Option<NodeId>,
    },
}

fn sort_by_frame<T>(key_frames: &mut [KeyFrame<T>]) {
    key_frames.sort_by(|a, b| a.frame.total_cmp(&b.frame));
}

fn insert_sorted<T>(key_frames: &mut Vec<KeyFrame<T>>, key_frame: KeyFrame<T>) {
    let at = key_frames.partition_point(|k| k.frame <= key_frame.frame);
    key_frames.insert(at, key_frame);
}

/// Local parameter of `frame` within `[from, to]`. A zero-length interval
/// snaps to its end.
fn interval_t(frame: f32, from: f32, to: f32) -> f32 {
    let span = to - from;
    if span <= 0.0 {
        1.0
    } else {
        (frame - from) / span
    }
}

/// Clamped value outside every interval: the first key before the track,
/// the last key otherwise.
fn clamp_value<T: Copy>(key_frames: &[KeyFrame<T>], frame: f32) -> Option<T> {
    let first = key_frames.first()?;
    let last = key_frames.last()?;
    if frame < first.frame {
        Some(first.value)
    } else {
        Some(last.value)
    }
}

fn sample_vector(key_frames: &[Vec3KeyFrame], frame: f32) -> Option<Vector3<f32>> {
    // Closed interval: a frame exactly on a shared key matches the earlier pair
    for pair in key_frames.windows(2) {
        let (k, next) = (&pair[0], &pair[1]);
        if k.frame <= frame && frame <= next.frame {
            let m = ease(interval_t(frame, k.frame, next.frame), k.interpolation);
            return Some(k.value + (next.value - k.value) * m);
        }
    }
    clamp_value(key_frames, frame)
}

fn sample_rotation(key_frames: &[QuaternionKeyFrame], frame: f32) -> Option<Quaternion<f32>> {
    // Half-open interval [k, next)
    for pair in key_frames.windows(2) {
        let (k, next) = (&pair[0], &pair[1]);
        if k.frame <= frame && frame < next.frame {
            let m = ease(interval_t(frame, k.frame, next.frame), k.interpolation);
            return Some(Quaternion::slerp_pow(k.value, next.value, m));
        }
    }
    clamp_value(key_frames, frame)
}

impl KeyFrameTrack {
    pub fn translation(node_path: impl Into<String>, key_frames: Vec<Vec3KeyFrame>) -> Self {
        Self::vector(VectorTarget::Translation, node_path, key_frames)
    }

    pub fn scale(node_path: impl Into<String>, key_frames: Vec<Vec3KeyFrame>) -> Self {
        Self::vector(VectorTarget::Scale, node_path, key_frames)
    }

    fn vector(target: VectorTarget, node_path: impl Into<String>, mut key_frames: Vec<Vec3KeyFrame>) -> Self {
        sort_by_frame(&mut key_frames);
        KeyFrameTrack::Vector {
            target,
            node_path: node_path.into(),
            key_frames,
            bound: None,
        }
    }

    pub fn rotation(node_path: impl Into<String>, mut key_frames: Vec<QuaternionKeyFrame>) -> Self {
        sort_by_frame(&mut key_frames);
        KeyFrameTrack::Rotation {
            node_path: node_path.into(),
            key_frames,
            bound: None,
        }
    }

    pub fn kind(&self) -> TrackKind {
        match self {
            KeyFrameTrack::Vector {
                target: VectorTarget::Translation,
                ..
            } => TrackKind::Translation,
            KeyFrameTrack::Vector {
                target: VectorTarget::Scale,
                ..
            } => TrackKind::Scale,
            KeyFrameTrack::Rotation { .. } => TrackKind::Quaternion,
        }
    }

    pub fn node_path(&self) -> &str {
        match self {
            KeyFrameTrack::Vector { node_path, .. } | KeyFrameTrack::Rotation { node_path, .. } => {
                node_path
            }
        }
    }

    /// Node resolved by the last [`bind_node`](Self::bind_node).
    pub fn bound(&self) -> Option<NodeId> {
        match self {
            KeyFrameTrack::Vector { bound, .. } | KeyFrameTrack::Rotation { bound, .. } => *bound,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            KeyFrameTrack::Vector { key_frames, .. } => key_frames.len(),
            KeyFrameTrack::Rotation { key_frames, .. } => key_frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a keyframe to a vector track, keeping frame order. Returns
    /// `false` on a rotation track.
    pub fn add_vector_key_frame(&mut self, key_frame: Vec3KeyFrame) -> bool {
        match self {
            KeyFrameTrack::Vector { key_frames, .. } => {
                insert_sorted(key_frames, key_frame);
                true
            }
            KeyFrameTrack::Rotation { .. } => false,
        }
    }

    /// Adds a keyframe to a rotation track, keeping frame order. Returns
    /// `false` on a vector track.
    pub fn add_rotation_key_frame(&mut self, key_frame: QuaternionKeyFrame) -> bool {
        match self {
            KeyFrameTrack::Rotation { key_frames, .. } => {
                insert_sorted(key_frames, key_frame);
                true
            }
            KeyFrameTrack::Vector { .. } => false,
        }
    }

    /// Resolves the node path against `scene`, replacing any previous binding.
    pub fn bind_node(&mut self, scene: &Scene) {
        let node = scene.get_node_from_path(self.node_path());
        match self {
            KeyFrameTrack::Vector { bound, .. } | KeyFrameTrack::Rotation { bound, .. } => *bound = node,
        }
    }

    /// Value at `frame`, or `None` for a track without keyframes.
    pub fn sample(&self, frame: f32) -> Option<TrackValue> {
        match self {
            KeyFrameTrack::Vector {
                target, key_frames, ..
            } => sample_vector(key_frames, frame).map(|v| match target {
                VectorTarget::Translation => TrackValue::Translation(v),
                VectorTarget::Scale => TrackValue::Scale(v),
            }),
            KeyFrameTrack::Rotation { key_frames, .. } => {
                sample_rotation(key_frames, frame).map(TrackValue::Quaternion)
            }
        }
    }

    /// Writes the value at `frame` onto the bound node. Unbound or empty
    /// tracks do nothing and return `false`.
    pub fn update(&self, frame: f32, scene: &mut Scene) -> Result<bool, SceneError> {
        let Some(node) = self.bound() else {
            return Ok(false);
        };
        let Some(value) = self.sample(frame) else {
            return Ok(false);
        };
        match value {
            TrackValue::Translation(v) => scene.set_translation(node, v)?,
            TrackValue::Scale(v) => scene.set_scale(node, v)?,
            TrackValue::Quaternion(q) => scene.set_quaternion(node, q)?,
        }
        Ok(true)
    }

    pub fn to_record(&self) -> Result<TrackRecord, AnimationError> {
        let key_frames = match self {
            KeyFrameTrack::Vector { key_frames, .. } => key_frames
                .iter()
                .map(|k| serde_json::to_value(KeyFrameRecord::<Vec3Record>::from(k)))
                .collect::<Result<Vec<_>, _>>()?,
            KeyFrameTrack::Rotation { key_frames, .. } => key_frames
                .iter()
                .map(|k| serde_json::to_value(KeyFrameRecord::<QuatRecord>::from(k)))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(TrackRecord {
            node_path: self.node_path().to_string(),
            key_frames,
            kind: self.kind().as_str().to_string(),
        })
    }

    /// Rebuilds a track. The `type` tag picks the payload shape; an unknown
    /// tag is an error.
    pub fn from_record(record: &TrackRecord) -> Result<Self, AnimationError> {
        let kind = TrackKind::parse(&record.kind)?;
        let track = match kind {
            TrackKind::Translation | TrackKind::Scale => {
                let key_frames = record
                    .key_frames
                    .iter()
                    .map(|v| serde_json::from_value::<KeyFrameRecord<Vec3Record>>(v.clone()).map(Into::into))
                    .collect::<Result<Vec<Vec3KeyFrame>, _>>()?;
                if kind == TrackKind::Translation {
                    KeyFrameTrack::translation(record.node_path.clone(), key_frames)
                } else {
                    KeyFrameTrack::scale(record.node_path.clone(), key_frames)
                }
            }
            TrackKind::Quaternion => {
                let key_frames = record
                    .key_frames
                    .iter()
                    .map(|v| serde_json::from_value::<KeyFrameRecord<QuatRecord>>(v.clone()).map(Into::into))
                    .collect::<Result<Vec<QuaternionKeyFrame>, _>>()?;
                KeyFrameTrack::rotation(record.node_path.clone(), key_frames)
            }
        };
        Ok(track)
    }
}

/// Track as stored in clip files. Keyframe values are kept as raw JSON until
/// the `type` tag is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub node_path: String,
    pub key_frames: Vec<Value>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::easing::EasingType;
    use cgmath::InnerSpace;

    fn v(x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(x, y, z)
    }

    fn linear(frame: f32, value: Vector3<f32>) -> Vec3KeyFrame {
        KeyFrame::new(frame, value, EasingType::Linear)
    }

    fn translation_of(value: Option<TrackValue>) -> Vector3<f32> {
        match value {
            Some(TrackValue::Translation(v)) => v,
            other => panic!("expected translation, got {:?}", other),
        }
    }

    fn quaternion_of(value: Option<TrackValue>) -> Quaternion<f32> {
        match value {
            Some(TrackValue::Quaternion(q)) => q,
            other => panic!("expected quaternion, got {:?}", other),
        }
    }

    #[test]
    fn test_clamps_outside_key_range() {
        let track = KeyFrameTrack::translation(
            "a",
            vec![linear(0.0, v(1.0, 0.0, 0.0)), linear(3.0, v(4.0, 0.0, 0.0))],
        );
        assert_eq!(translation_of(track.sample(-1.0)), v(1.0, 0.0, 0.0));
        assert_eq!(translation_of(track.sample(10.0)), v(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_linear_midpoint_is_exact() {
        let track = KeyFrameTrack::translation(
            "a",
            vec![linear(0.0, v(0.0, 0.0, 0.0)), linear(10.0, v(10.0, 0.0, 0.0))],
        );
        assert_eq!(translation_of(track.sample(5.0)), v(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_easing_comes_from_the_earlier_key() {
        let track = KeyFrameTrack::translation(
            "a",
            vec![
                KeyFrame::new(0.0, v(0.0, 0.0, 0.0), EasingType::OutCubic),
                linear(10.0, v(10.0, 0.0, 0.0)),
            ],
        );
        // out-cubic(0.5) = 0.875
        let x = translation_of(track.sample(5.0)).x;
        assert!((x - 8.75).abs() < 1e-5);
    }

    #[test]
    fn test_keys_are_sorted_on_insertion() {
        let mut track = KeyFrameTrack::translation(
            "a",
            vec![linear(10.0, v(10.0, 0.0, 0.0)), linear(0.0, v(0.0, 0.0, 0.0))],
        );
        assert!(track.add_vector_key_frame(linear(5.0, v(50.0, 0.0, 0.0))));
        assert!(!track.add_rotation_key_frame(QuaternionKeyFrame::from_euler(
            1.0,
            0.0,
            0.0,
            0.0,
            EasingType::Linear
        )));
        assert_eq!(translation_of(track.sample(5.0)), v(50.0, 0.0, 0.0));
        assert_eq!(track.len(), 3);
    }

    #[test]
    fn test_vector_boundary_uses_closed_interval() {
        let track = KeyFrameTrack::translation(
            "a",
            vec![
                linear(0.0, v(0.0, 0.0, 0.0)),
                linear(5.0, v(5.0, 0.0, 0.0)),
                linear(10.0, v(0.0, 0.0, 0.0)),
            ],
        );
        // Frame 5 closes the first pair at t = 1
        assert_eq!(translation_of(track.sample(5.0)), v(5.0, 0.0, 0.0));
        assert_eq!(translation_of(track.sample(10.0)), v(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_boundary_uses_half_open_interval() {
        let track = KeyFrameTrack::rotation(
            "a",
            vec![
                QuaternionKeyFrame::from_euler(0.0, 0.0, 0.0, 0.0, EasingType::Linear),
                QuaternionKeyFrame::from_euler(5.0, 0.0, 90.0, 0.0, EasingType::Linear),
                QuaternionKeyFrame::from_euler(10.0, 0.0, 180.0, 0.0, EasingType::Linear),
            ],
        );
        let expected_mid = QuaternionKeyFrame::from_euler(0.0, 0.0, 90.0, 0.0, EasingType::Linear).value;
        let expected_last = QuaternionKeyFrame::from_euler(0.0, 0.0, 180.0, 0.0, EasingType::Linear).value;

        // Frame 5 opens the second pair at t = 0
        let q = quaternion_of(track.sample(5.0));
        assert!((q - expected_mid).magnitude() < 1e-4);
        // The last key has no pair to open and clamps
        let q = quaternion_of(track.sample(10.0));
        assert!((q - expected_last).magnitude() < 1e-4);
    }

    #[test]
    fn test_rotation_halfway() {
        let track = KeyFrameTrack::rotation(
            "a",
            vec![
                QuaternionKeyFrame::from_euler(0.0, 0.0, 0.0, 0.0, EasingType::Linear),
                QuaternionKeyFrame::from_euler(10.0, 0.0, 90.0, 0.0, EasingType::Linear),
            ],
        );
        let q = quaternion_of(track.sample(5.0));
        let expected = QuaternionKeyFrame::from_euler(0.0, 0.0, 45.0, 0.0, EasingType::Linear).value;
        assert!((q - expected).magnitude() < 1e-4);
    }

    #[test]
    fn test_empty_track_samples_nothing() {
        let track = KeyFrameTrack::scale("a", Vec::new());
        assert!(track.is_empty());
        assert_eq!(track.sample(1.0), None);
    }

    #[test]
    fn test_update_writes_through_scene() {
        let mut scene = Scene::new("root");
        let body = scene.create_node("Body", scene.root()).unwrap();
        let arm = scene.create_node("Arm", body).unwrap();

        let mut track = KeyFrameTrack::scale(
            "Body.Arm",
            vec![linear(0.0, v(1.0, 1.0, 1.0)), linear(10.0, v(3.0, 3.0, 3.0))],
        );
        assert!(!track.update(5.0, &mut scene).unwrap());

        track.bind_node(&scene);
        assert_eq!(track.bound(), Some(arm));
        assert!(track.update(5.0, &mut scene).unwrap());
        assert_eq!(scene.node(arm).unwrap().scale(), v(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_unresolved_path_leaves_track_unbound() {
        let scene = Scene::new("root");
        let mut track = KeyFrameTrack::translation("Missing", vec![linear(0.0, v(0.0, 0.0, 0.0))]);
        track.bind_node(&scene);
        assert_eq!(track.bound(), None);
    }

    #[test]
    fn test_unknown_track_type_is_an_error() {
        let record = TrackRecord {
            node_path: "a".into(),
            key_frames: Vec::new(),
            kind: "color".into(),
        };
        assert!(matches!(
            KeyFrameTrack::from_record(&record),
            Err(AnimationError::UnknownTrackType(tag)) if tag == "color"
        ));
    }

    #[test]
    fn test_rotation_record_payload_is_xyzw() {
        let track = KeyFrameTrack::rotation(
            "a",
            vec![QuaternionKeyFrame::from_euler(2.0, 0.0, 0.0, 0.0, EasingType::OutSine)],
        );
        let record = track.to_record().unwrap();
        assert_eq!(record.kind, "quaternion");
        assert_eq!(record.key_frames[0]["value"]["w"], 1.0);
        assert_eq!(record.key_frames[0]["interpolation"], 1);
        assert_eq!(KeyFrameTrack::from_record(&record).unwrap(), track);
    }
}
