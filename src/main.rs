//! Chaos attractor screensaver
//!
//! Thousands of Lorenz particles advanced on the GPU and drawn as a full-screen glow.

mod surface;

use anyhow::{Context, Result};
use chaos_core::{ParticleHistory, SaverConfig};
use chaos_gpu::{ChaosPipeline, FrameOutcome, FrameTarget, GpuContext, ShaderLibrary};
use std::sync::Arc;
use std::time::Instant;
use surface::SurfaceTarget;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Shader directory next to the executable if present, the embedded programs otherwise.
///
/// A directory that exists but is incomplete is an error, not a fallback.
fn load_shader_library() -> Result<ShaderLibrary> {
    match ShaderLibrary::default_dir() {
        Ok(dir) if dir.is_dir() => ShaderLibrary::from_dir(&dir),
        _ => {
            log::info!("✓ Using embedded shader library");
            Ok(ShaderLibrary::embedded())
        }
    }
}

struct GpuState {
    target: SurfaceTarget,
    pipeline: ChaosPipeline,
    skipped_frames: u64,
}

impl GpuState {
    async fn new(window: Arc<Window>, config: SaverConfig) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let ctx = GpuContext::new(instance, Some(&surface)).await?;
        let target = SurfaceTarget::new(surface, &ctx, size);

        let library = load_shader_library()?;

        let history = ParticleHistory::seeded(
            config.particle_count,
            config.ring_capacity,
            &config.spawn_bounds,
            &mut rand::rng(),
        )?;
        log::info!(
            "✓ Seeded {} particles within {:?}",
            config.particle_count,
            config.spawn_bounds
        );

        let pipeline = ChaosPipeline::new(&ctx, &library, config, &history, target.format()).await?;
        log::info!("✓ Pipeline initialized");

        Ok(Self {
            target,
            pipeline,
            skipped_frames: 0,
        })
    }

    fn render(&mut self) {
        match self.pipeline.render_frame(&mut self.target) {
            FrameOutcome::Presented => {
                let frames = self.pipeline.frames_rendered();
                if frames % 300 == 0 {
                    log::debug!(
                        "{frames} frames presented, {} skipped",
                        self.skipped_frames
                    );
                }
            }
            FrameOutcome::Skipped => self.skipped_frames += 1,
        }
    }
}

struct App {
    config: SaverConfig,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    next_frame: Instant,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SaverConfig) -> Self {
        Self {
            config,
            window: None,
            gpu_state: None,
            next_frame: Instant::now(),
            startup_error: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes().with_title("Chaos Saver");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.startup_error = Some(anyhow::Error::new(err).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuState::new(window.clone(), self.config)) {
            Ok(state) => {
                self.gpu_state = Some(state);
                self.window = Some(window);
                self.next_frame = Instant::now();
            }
            Err(err) => {
                self.startup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.target.resize(size);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.render();
                }
            }

            _ => {}
        }
    }

    /// Fixed-cadence animation driver
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };

        let now = Instant::now();
        if now >= self.next_frame {
            window.request_redraw();
            self.next_frame += self.config.frame_interval();
            // Fell behind (e.g. the window was hidden): drop the missed frames
            if self.next_frame < now {
                self.next_frame = now + self.config.frame_interval();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

fn main() -> Result<()> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SaverConfig::default();
    config.validate()?;
    log::info!("Starting chaos attractor...");

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(err) => {
            log::error!("startup failed: {err:#}");
            Err(err)
        }
        None => Ok(()),
    }
}
