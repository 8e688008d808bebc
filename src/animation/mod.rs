//! # Animation Module
//!
//! Keyframe animation over the scene graph.
//!
//! ## Key Components
//!
//! - [`EasingType`] - interpolation curve carried by each keyframe
//! - [`KeyFrameTrack`] - translation, scale or rotation keys for one node path
//! - [`AnimationClip`] - named set of tracks with a duration in frames
//! - [`AnimationRunner`] - play/pause/reverse/loop state over a clip and scene
//!
//! Tracks find their node by a `.`-separated path of child names below the
//! scene root (`"Body.LeftArm"`) and write through the scene's TRS setters,
//! so world matrices update as keys are applied.

pub mod clip;
pub mod easing;
pub mod keyframe;
pub mod runner;
pub mod track;

pub use clip::{AnimationClip, ClipRecord};
pub use easing::{ease, EasingType};
pub use keyframe::{KeyFrame, KeyFrameRecord, QuaternionKeyFrame, Vec3KeyFrame};
pub use runner::{AnimationRunner, DEFAULT_FPS};
pub use track::{KeyFrameTrack, TrackKind, TrackRecord, TrackValue, VectorTarget};

use thiserror::Error;

use crate::gfx::scene::SceneError;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("unknown track type `{0}`")]
    UnknownTrackType(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("clip JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("clip file error: {0}")]
    Io(#[from] std::io::Error),
}
