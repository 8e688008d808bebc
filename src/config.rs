//! Engine configuration
//!
//! Settings shared by the renderer, the texture pool and the animation
//! runner. Loaded from JSON; every field is optional in the file.
//!
//! ```json
//! { "fps": 24, "canvasWidth": 1280, "canvasHeight": 720 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::DEFAULT_FPS;
use crate::gfx::math::Color;
use crate::gfx::resources::DEFAULT_POOL_CAPACITY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Animation playback rate in frames per second
    pub fps: f32,
    pub texture_pool_capacity: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub clear_color: Color,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            texture_pool_capacity: DEFAULT_POOL_CAPACITY,
            canvas_width: 1280,
            canvas_height: 720,
            clear_color: Color::new(0.1, 0.1, 0.1, 1.0),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_texture_pool_capacity(mut self, capacity: usize) -> Self {
        self.texture_pool_capacity = capacity;
        self
    }

    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid(format!("fps must be positive, got {}", self.fps)));
        }
        if self.texture_pool_capacity == 0 {
            return Err(ConfigError::Invalid("texturePoolCapacity must be at least 1".into()));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas size must be non-zero, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Canvas aspect ratio as width / height.
    pub fn aspect(&self) -> f32 {
        self.canvas_width as f32 / self.canvas_height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.texture_pool_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "fps": 24, "canvasWidth": 640 }"#).unwrap();
        assert_eq!(config.fps, 24.0);
        assert_eq!(config.canvas_width, 640);
        assert_eq!(config.canvas_height, 720);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "fps": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "texturePoolCapacity": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("{ fps: }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_fps(60.0)
            .with_canvas(800, 400)
            .with_texture_pool_capacity(8)
            .with_log_filter("debug");
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.aspect(), 2.0);
        assert_eq!(config.texture_pool_capacity, 8);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("marionette-config-{}.json", std::process::id()));
        let config = EngineConfig::default().with_fps(12.0);
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
