//! Windowed scene viewer
//!
//! Opens a window, renders a scene through the wgpu backend and plays an
//! optional animation clip.
//!
//! | Key    | Action              |
//! |--------|---------------------|
//! | Space  | toggle play / pause |
//! | R      | toggle reverse      |
//! | L      | toggle looping      |
//! | Escape | quit                |

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::animation::{AnimationClip, AnimationRunner};
use crate::config::EngineConfig;
use crate::gfx::{
    camera::Camera,
    rendering::{Renderer, WgpuContext, WindowSurface},
    scene::{Node, NodeId, NodeKind, Scene},
};

struct Gpu {
    context: WgpuContext,
    surface: WindowSurface,
    renderer: Renderer,
}

pub struct ViewerApp {
    event_loop: Option<EventLoop<()>>,
    state: ViewerState,
}

struct ViewerState {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    runner: AnimationRunner,
    camera: NodeId,
    light: Option<NodeId>,
    last_frame: Option<Instant>,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    /// Prepares a viewer for `scene`. A camera node is added under the root
    /// when the scene has none.
    pub fn new(config: EngineConfig, mut scene: Scene, clip: Option<AnimationClip>) -> anyhow::Result<Self> {
        config.validate()?;
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        let camera = match scene.get_camera() {
            Some(camera) => camera,
            None => {
                log::info!("Scene has no camera, adding a default one");
                let root = scene.root();
                scene.insert(Node::new("Camera", NodeKind::Camera(Camera::default())), Some(root))?
            }
        };
        let light = scene.get_light();
        scene.set_camera_canvas(camera, config.canvas_width as f32, config.canvas_height as f32)?;

        let mut runner = AnimationRunner::new(config.fps).with_scene(scene);
        if let Some(clip) = clip {
            log::info!("Playing clip `{}` ({} frames)", clip.name, clip.duration);
            runner.set_clip(clip);
            runner.is_loop = true;
            runner.play();
        }

        Ok(Self {
            event_loop: Some(event_loop),
            state: ViewerState {
                config,
                window: None,
                gpu: None,
                runner,
                camera,
                light,
                last_frame: None,
                error: None,
            },
        })
    }

    /// Runs the event loop until the window closes. Errors raised inside the
    /// loop are returned once it exits.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.state)?;

        if let Some(gpu) = self.state.gpu.as_mut() {
            gpu.renderer.release(&mut gpu.context);
        }
        match self.state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl ViewerState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn create_gpu(&mut self, window: Arc<Window>) -> anyhow::Result<Gpu> {
        let PhysicalSize { width, height } = window.inner_size();
        let (mut context, surface) = pollster::block_on(WgpuContext::for_window(window, width, height))?;
        let renderer = Renderer::with_pool_capacity(&mut context, self.config.texture_pool_capacity)?
            .with_clear_color(self.config.clear_color);
        if let Some(scene) = self.runner.scene_mut() {
            scene.set_camera_canvas(self.camera, width.max(1) as f32, height.max(1) as f32)?;
        }
        Ok(Gpu {
            context,
            surface,
            renderer,
        })
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if self.runner.is_playing {
                    self.runner.pause();
                } else {
                    self.runner.play();
                }
                log::info!("Playing: {}", self.runner.is_playing);
            }
            KeyCode::KeyR => {
                self.runner.is_reverse = !self.runner.is_reverse;
                log::info!("Reverse: {}", self.runner.is_reverse);
            }
            KeyCode::KeyL => {
                self.runner.is_loop = !self.runner.is_loop;
                log::info!("Loop: {}", self.runner.is_loop);
            }
            _ => {}
        }
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.runner.update(delta)?;

        let (Some(gpu), Some(scene)) = (self.gpu.as_mut(), self.runner.scene()) else {
            return Ok(());
        };

        let frame = match gpu.surface.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("{}, reconfiguring surface", e);
                let (width, height) = gpu.surface.size();
                gpu.surface.resize(&mut gpu.context, width, height);
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let stats = gpu
            .renderer
            .render(&mut gpu.context, scene, self.camera, self.light)?;
        gpu.context.finish_frame(&view)?;
        frame.present();
        log::trace!("Frame {:.1}: {:?}", self.runner.current_frame(), stats);
        Ok(())
    }
}

impl ApplicationHandler for ViewerState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title("marionette")
            .with_inner_size(PhysicalSize::new(
                self.config.canvas_width,
                self.config.canvas_height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.window = Some(window.clone());

        match self.create_gpu(window) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key_code),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if width == 0 || height == 0 {
                    return;
                }
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.surface.resize(&mut gpu.context, width, height);
                }
                if let Some(scene) = self.runner.scene_mut() {
                    if let Err(e) = scene.set_camera_canvas(self.camera, width as f32, height as f32) {
                        log::warn!("Failed to resize camera: {}", e);
                    }
                }
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
