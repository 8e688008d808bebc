//! Opens a scene file in a window and plays an optional clip.
//!
//! ```sh
//! cargo run --example viewer -- scene.json [clip.json] [config.json]
//! ```
//!
//! Without arguments a small demo scene is built in memory: a Phong box with
//! a swinging child plane, lit by a point light, next to a hollow tesseract
//! and a bumpy cone. The box carries procedural brick normal and ripple
//! displacement maps.

use anyhow::Context;
use marionette::gfx::geometry::{cone_geometry, hollow_tesseract_geometry};
use marionette::gfx::resources::procedural;
use marionette::prelude::*;

fn demo_scene() -> anyhow::Result<(Scene, AnimationClip)> {
    let mut scene = Scene::new("root");
    let root = scene.root();

    let body = scene.insert(
        Node::new(
            "Body",
            NodeKind::Mesh(Mesh::new(
                box_geometry(1.0, 1.0, 1.0),
                PhongMaterial::new(Color::rgb(0.2, 0.1, 0.1), Color::rgb(0.8, 0.3, 0.2), Color::WHITE, 32.0)
                    .with_normal_map(procedural::brick_normal_map(64, 16, 8))
                    .with_displacement_map(procedural::ripple_displacement(64, 4.0, 1.0))
                    .with_coefficients(0.3, 0.9, 0.05),
            )),
        ),
        Some(root),
    )?;
    scene.insert(
        Node::new(
            "Arm",
            NodeKind::Mesh(Mesh::new(plane_geometry(1.0, 0.4), BasicMaterial::new(Color::rgb(0.2, 0.6, 0.9)))),
        )
        .with_translation(Vector3::new(1.0, 0.0, 0.0)),
        Some(body),
    )?;
    scene.insert(
        Node::new(
            "Frame",
            NodeKind::Mesh(Mesh::new(
                hollow_tesseract_geometry(1.2, 1.2, 1.2, 0.06),
                PhongMaterial::new(Color::rgb(0.1, 0.1, 0.2), Color::rgb(0.3, 0.5, 0.9), Color::WHITE, 64.0),
            )),
        )
        .with_translation(Vector3::new(-2.0, 0.0, 0.0)),
        Some(root),
    )?;
    scene.insert(
        Node::new(
            "Spire",
            NodeKind::Mesh(Mesh::new(
                cone_geometry(0.5, 1.2, 24),
                PhongMaterial::new(Color::rgb(0.1, 0.2, 0.1), Color::rgb(0.4, 0.8, 0.3), Color::WHITE, 16.0)
                    .with_normal_map(procedural::bump_normal_map(64, 0.4, 4.0))
                    .with_displacement_map(procedural::brick_displacement(64, 16, 8, 0.2))
                    .with_coefficients(0.3, 0.9, 0.02),
            )),
        )
        .with_translation(Vector3::new(0.0, 0.0, -2.0)),
        Some(root),
    )?;
    scene.insert(
        Node::new("Lamp", NodeKind::Light(Light::point(Color::WHITE, 20.0)))
            .with_translation(Vector3::new(2.0, 3.0, 4.0)),
        Some(root),
    )?;
    scene.insert(
        Node::new("Camera", NodeKind::Camera(Camera::new(CameraType::Perspective, 6.0, 0.0))),
        Some(root),
    )?;

    let clip = AnimationClip::new("swing", 60.0)
        .with_track(KeyFrameTrack::rotation(
            "Body",
            vec![
                QuaternionKeyFrame::from_euler(0.0, 0.0, 0.0, 0.0, EasingType::InOutSine),
                QuaternionKeyFrame::from_euler(30.0, 0.0, 180.0, 0.0, EasingType::InOutSine),
                QuaternionKeyFrame::from_euler(60.0, 0.0, 359.0, 0.0, EasingType::Linear),
            ],
        ))
        .with_track(KeyFrameTrack::translation(
            "Body.Arm",
            vec![
                Vec3KeyFrame::new(0.0, Vector3::new(1.0, 0.0, 0.0), EasingType::OutBounce),
                Vec3KeyFrame::new(30.0, Vector3::new(1.5, 0.5, 0.0), EasingType::OutBounce),
                Vec3KeyFrame::new(60.0, Vector3::new(1.0, 0.0, 0.0), EasingType::Linear),
            ],
        ));
    Ok((scene, clip))
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match args.get(2) {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    marionette::init_logging_with(&config.log_filter);

    let (scene, clip) = match args.first() {
        Some(scene_path) => {
            let scene = Scene::load(scene_path).with_context(|| format!("loading scene {}", scene_path))?;
            let clip = args
                .get(1)
                .map(|path| AnimationClip::load(path).with_context(|| format!("loading clip {}", path)))
                .transpose()?;
            (scene, clip)
        }
        None => {
            log::info!("No scene given, using the built-in demo");
            let (scene, clip) = demo_scene()?;
            (scene, Some(clip))
        }
    };

    ViewerApp::new(config, scene, clip)?.run()
}
