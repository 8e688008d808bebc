use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gfx::scene::Scene;

use super::track::{KeyFrameTrack, TrackRecord};
use super::AnimationError;

/// A named set of tracks spanning `duration` frames.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in frames.
    pub duration: f32,
    pub tracks: Vec<KeyFrameTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub name: String,
    pub duration: f32,
    #[serde(default)]
    pub tracks: Vec<TrackRecord>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: KeyFrameTrack) -> Self {
        self.add_track(track);
        self
    }

    pub fn add_track(&mut self, track: KeyFrameTrack) {
        self.tracks.push(track);
    }

    /// Applies every track at `frame`.
    pub fn update(&self, frame: f32, scene: &mut Scene) -> Result<(), AnimationError> {
        for track in &self.tracks {
            track.update(frame, scene)?;
        }
        Ok(())
    }

    /// Re-resolves every track path against `scene`. Returns how many tracks
    /// found their node.
    pub fn bind_node(&mut self, scene: &Scene) -> usize {
        for track in &mut self.tracks {
            track.bind_node(scene);
        }
        let bound = self.tracks.iter().filter(|t| t.bound().is_some()).count();
        log::debug!(
            "Clip `{}` bound {}/{} tracks",
            self.name,
            bound,
            self.tracks.len()
        );
        bound
    }

    pub fn to_record(&self) -> Result<ClipRecord, AnimationError> {
        Ok(ClipRecord {
            name: self.name.clone(),
            duration: self.duration,
            tracks: self
                .tracks
                .iter()
                .map(KeyFrameTrack::to_record)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn from_record(record: &ClipRecord) -> Result<Self, AnimationError> {
        Ok(Self {
            name: record.name.clone(),
            duration: record.duration,
            tracks: record
                .tracks
                .iter()
                .map(KeyFrameTrack::from_record)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn to_json(&self) -> Result<String, AnimationError> {
        Ok(serde_json::to_string_pretty(&self.to_record()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AnimationError> {
        let record: ClipRecord = serde_json::from_str(json)?;
        Self::from_record(&record)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnimationError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Saved clip `{}` to {}", self.name, path.as_ref().display());
        Ok(())
    }

    /// Loads a clip file. Tracks are unbound until [`bind_node`](Self::bind_node).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnimationError> {
        let clip = Self::from_json(&std::fs::read_to_string(path.as_ref())?)?;
        log::info!(
            "Loaded clip `{}` ({} tracks, {} frames) from {}",
            clip.name,
            clip.tracks.len(),
            clip.duration,
            path.as_ref().display()
        );
        Ok(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::easing::EasingType;
    use crate::animation::keyframe::{KeyFrame, QuaternionKeyFrame};
    use cgmath::Vector3;

    fn walk_clip() -> AnimationClip {
        AnimationClip::new("walk", 10.0)
            .with_track(KeyFrameTrack::translation(
                "Body",
                vec![
                    KeyFrame::new(0.0, Vector3::new(0.0, 0.0, 0.0), EasingType::Linear),
                    KeyFrame::new(10.0, Vector3::new(10.0, 0.0, 0.0), EasingType::Linear),
                ],
            ))
            .with_track(KeyFrameTrack::rotation(
                "Body.Arm",
                vec![
                    QuaternionKeyFrame::from_euler(0.0, 0.0, 0.0, 0.0, EasingType::InOutSine),
                    QuaternionKeyFrame::from_euler(10.0, 45.0, 0.0, 0.0, EasingType::Linear),
                ],
            ))
    }

    #[test]
    fn test_update_drives_bound_nodes() {
        let mut scene = Scene::new("root");
        let body = scene.create_node("Body", scene.root()).unwrap();
        scene.create_node("Arm", body).unwrap();

        let mut clip = walk_clip();
        assert_eq!(clip.bind_node(&scene), 2);
        clip.update(5.0, &mut scene).unwrap();
        assert_eq!(scene.node(body).unwrap().translation(), Vector3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value = serde_json::from_str(&walk_clip().to_json().unwrap()).unwrap();
        assert_eq!(value["name"], "walk");
        assert_eq!(value["duration"], 10.0);
        assert_eq!(value["tracks"][0]["type"], "translation");
        assert_eq!(value["tracks"][0]["nodePath"], "Body");
        assert_eq!(value["tracks"][0]["keyFrames"][1]["value"]["x"], 10.0);
        assert_eq!(value["tracks"][1]["type"], "quaternion");
    }

    #[test]
    fn test_json_round_trip() {
        let clip = walk_clip();
        let back = AnimationClip::from_json(&clip.to_json().unwrap()).unwrap();
        assert_eq!(back, clip);
    }

    #[test]
    fn test_unknown_track_type_fails_the_clip() {
        let json = r#"{"name": "x", "duration": 5, "tracks": [
            {"nodePath": "a", "keyFrames": [], "type": "color"}]}"#;
        assert!(matches!(
            AnimationClip::from_json(json),
            Err(AnimationError::UnknownTrackType(_))
        ));
    }
}
