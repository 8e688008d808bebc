//! Playback state for one clip driving one scene.

use crate::gfx::scene::Scene;

use super::clip::AnimationClip;
use super::AnimationError;

pub const DEFAULT_FPS: f32 = 30.0;

/// Advances a clip over a scene in wall-clock time.
///
/// The runner rebinds track paths whenever its scene or clip is replaced.
/// Structural edits made through [`scene_mut`](Self::scene_mut) are not
/// tracked; call [`refresh_bind_node`](Self::refresh_bind_node) after them.
#[derive(Debug)]
pub struct AnimationRunner {
    pub is_playing: bool,
    pub is_reverse: bool,
    pub is_loop: bool,
    pub fps: f32,
    current_frame: f32,
    clip: Option<AnimationClip>,
    scene: Option<Scene>,
}

impl Default for AnimationRunner {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl AnimationRunner {
    pub fn new(fps: f32) -> Self {
        Self {
            is_playing: false,
            is_reverse: false,
            is_loop: false,
            fps,
            current_frame: 0.0,
            clip: None,
            scene: None,
        }
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.set_scene(scene);
        self
    }

    pub fn with_clip(mut self, clip: AnimationClip) -> Self {
        self.set_clip(clip);
        self
    }

    /// Replaces the scene and rebinds the clip. Returns the previous scene.
    pub fn set_scene(&mut self, scene: Scene) -> Option<Scene> {
        let previous = self.scene.replace(scene);
        self.refresh_bind_node();
        previous
    }

    /// Replaces the clip and binds it to the current scene.
    pub fn set_clip(&mut self, clip: AnimationClip) -> Option<AnimationClip> {
        let previous = self.clip.replace(clip);
        self.refresh_bind_node();
        previous
    }

    pub fn take_clip(&mut self) -> Option<AnimationClip> {
        self.clip.take()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    pub fn clip(&self) -> Option<&AnimationClip> {
        self.clip.as_ref()
    }

    pub fn clip_mut(&mut self) -> Option<&mut AnimationClip> {
        self.clip.as_mut()
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    /// Moves the playhead without applying the clip.
    pub fn set_current_frame(&mut self, frame: f32) {
        self.current_frame = frame;
    }

    /// Clip length in frames.
    pub fn duration(&self) -> Option<f32> {
        self.clip.as_ref().map(|c| c.duration)
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Pauses and rewinds to frame 0, applying that pose.
    pub fn stop(&mut self) -> Result<(), AnimationError> {
        self.is_playing = false;
        self.update_to_frame(0.0)
    }

    /// Re-resolves the clip's track paths against the current scene.
    pub fn refresh_bind_node(&mut self) {
        if let (Some(clip), Some(scene)) = (self.clip.as_mut(), self.scene.as_ref()) {
            clip.bind_node(scene);
        }
    }

    /// Advances playback by `delta_seconds`. Does nothing while paused.
    ///
    /// Looping wraps the frame into `[0, duration)`. Without looping the
    /// frame clamps at either end and playback stops.
    pub fn update(&mut self, delta_seconds: f32) -> Result<(), AnimationError> {
        if !self.is_playing {
            return Ok(());
        }
        let Some(duration) = self.duration() else {
            return Ok(());
        };

        let delta_frames = delta_seconds * self.fps;
        let frame = if self.is_reverse {
            self.current_frame - delta_frames
        } else {
            self.current_frame + delta_frames
        };

        self.current_frame = if self.is_loop {
            if duration > 0.0 {
                frame.rem_euclid(duration)
            } else {
                log::warn!("Clip duration is {}, cannot loop; holding frame 0", duration);
                0.0
            }
        } else if self.is_reverse && frame <= 0.0 {
            self.is_playing = false;
            0.0
        } else if !self.is_reverse && frame >= duration {
            self.is_playing = false;
            duration
        } else {
            frame
        };

        self.apply()
    }

    /// Scrubs to `frame` and applies it, whether playing or not.
    pub fn update_to_frame(&mut self, frame: f32) -> Result<(), AnimationError> {
        self.current_frame = frame;
        self.apply()
    }

    fn apply(&mut self) -> Result<(), AnimationError> {
        if let (Some(clip), Some(scene)) = (self.clip.as_ref(), self.scene.as_mut()) {
            clip.update(self.current_frame, scene)?;
        }
        Ok(())
    }
}
