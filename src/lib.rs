// src/lib.rs
//! Marionette 3D Engine
//!
//! A scene-graph, keyframe animation and render orchestration engine built on
//! wgpu and winit.
//!
//! - [`gfx`] - scene graph, cameras, geometry, materials and rendering
//! - [`animation`] - keyframe tracks, clips and the playback runner
//! - [`config`] - engine settings loaded from JSON
//! - [`app`] - windowed viewer

pub mod animation;
pub mod app;
pub mod config;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::{ConfigError, EngineConfig};

/// Installs the `env_logger` backend with an `info` default filter.
/// `RUST_LOG` overrides it. Calling it twice is harmless.
pub fn init_logging() {
    init_logging_with("info");
}

/// Like [`init_logging`] with a custom default filter, usually
/// [`EngineConfig::log_filter`].
pub fn init_logging_with(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}
