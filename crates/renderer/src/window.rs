use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use gradient::{pack, SpotTimeline, TuningParams};

use crate::gpu::GpuState;
use crate::runtime::{time_source_for_policy, BoxedTimeSource, FramePacer, RenderPolicy};
use crate::types::RendererConfig;

const WINDOW_TITLE: &str = "spotdrift preview";

const BIAS_STEP: f32 = 0.01;
const POWER_STEP: f32 = 0.25;
const NOISE_STEP: f32 = 5.0;

/// Why a frame failed, split by how the loop should react.
enum FrameError {
    /// Swapchain hiccup; recoverable by reconfiguring or retrying.
    Surface(wgpu::SurfaceError),
    /// Anything else; the loop logs it and exits.
    Fatal(anyhow::Error),
}

/// Aggregates GPU and timeline state for the windowed preview path.
struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    timeline: SpotTimeline,
    tuning: TuningParams,
    time_source: BoxedTimeSource,
    /// Offset applied on top of the time source, accumulated by layout skips
    /// and pause/resume re-anchoring.
    time_skip: f64,
    /// Timestamp playback is frozen at while paused.
    frozen: Option<f64>,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size)?;
        let timeline = SpotTimeline::new(config.scene.timeline_settings())?;
        let time_source = time_source_for_policy(&config.policy);
        Ok(Self {
            window,
            gpu,
            timeline,
            tuning: config.scene.tuning,
            time_source,
            time_skip: 0.0,
            frozen: None,
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn paused(&self) -> bool {
        self.frozen.is_some()
    }

    fn current_seconds(&mut self) -> f64 {
        match self.frozen {
            Some(seconds) => seconds,
            None => self.time_source.sample().seconds + self.time_skip,
        }
    }

    fn render_frame(&mut self) -> Result<(), FrameError> {
        let seconds = self.current_seconds();
        let spots = self.timeline.sample(seconds);
        let uniforms = pack(&spots, &self.tuning).map_err(|err| FrameError::Fatal(err.into()))?;
        self.gpu.render(&uniforms).map_err(FrameError::Surface)
    }

    fn toggle_pause(&mut self) {
        match self.frozen.take() {
            Some(frozen_seconds) => {
                // Re-anchor so playback resumes exactly where it froze.
                let raw = self.time_source.sample().seconds;
                self.time_skip = frozen_seconds - raw;
                tracing::debug!(seconds = frozen_seconds, "resumed playback");
            }
            None => {
                let seconds = self.time_source.sample().seconds + self.time_skip;
                self.frozen = Some(seconds);
                tracing::debug!(seconds, "paused playback");
            }
        }
    }

    fn skip_to_next_layout(&mut self) {
        let seconds = self.current_seconds();
        let boundary = self.timeline.next_boundary(seconds);
        match self.frozen.as_mut() {
            Some(frozen) => *frozen = boundary,
            None => self.time_skip += boundary - seconds,
        }
        tracing::debug!(from = seconds, to = boundary, "skipped to next layout");
    }

    fn adjust_bias(&mut self, delta: f32) {
        self.tuning.adjust_bias(delta);
        tracing::debug!(bias = self.tuning.bias(), "adjusted bias");
    }

    fn adjust_power(&mut self, delta: f32) {
        self.tuning.adjust_power(delta);
        tracing::debug!(power = self.tuning.power(), "adjusted power");
    }

    fn adjust_noise(&mut self, delta: f32) {
        self.tuning.adjust_noise(delta);
        tracing::debug!(noise = self.tuning.noise(), "adjusted noise");
    }

    fn reset_tuning(&mut self) {
        self.tuning = TuningParams::default();
        tracing::debug!("reset tuning to defaults");
    }
}

/// Runs the interactive preview window until the user quits.
pub(crate) fn run_windowed(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window.clone(), &config)?;
    let animate = matches!(config.policy, RenderPolicy::Animate { .. });
    let mut pacer = match config.policy {
        RenderPolicy::Animate { target_fps } => FramePacer::new(target_fps),
        _ => FramePacer::new(None),
    };

    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        handle_key(&mut state, &event.logical_key, elwt);
                    }
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                    state.window().request_redraw();
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(state.size());
                }
                WindowEvent::RedrawRequested => match state.render_frame() {
                    Ok(()) => {
                        pacer.mark_rendered(Instant::now());
                    }
                    Err(FrameError::Surface(surface_err)) => match surface_err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            state.resize(state.size());
                            state.window().request_redraw();
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            tracing::error!("surface out of memory; exiting preview");
                            elwt.exit();
                        }
                        wgpu::SurfaceError::Timeout => {
                            tracing::warn!("surface timeout; retrying next frame");
                        }
                        other => {
                            tracing::warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    Err(FrameError::Fatal(err)) => {
                        tracing::error!(error = %err, "failed to render frame");
                        elwt.exit();
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            if animate && !state.paused() {
                let now = Instant::now();
                if pacer.ready_for_frame(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = pacer.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn handle_key(state: &mut WindowState, key: &Key, elwt: &EventLoopWindowTarget<()>) {
    match key {
        Key::Named(NamedKey::Escape) => {
            elwt.exit();
        }
        Key::Named(NamedKey::Space) => {
            state.skip_to_next_layout();
            state.window().request_redraw();
        }
        Key::Named(NamedKey::Tab) => {
            state.toggle_pause();
            state.window().request_redraw();
        }
        Key::Character(value) => {
            match value.as_str() {
                "q" | "Q" => elwt.exit(),
                " " => {
                    state.skip_to_next_layout();
                    state.window().request_redraw();
                }
                "b" => {
                    state.adjust_bias(-BIAS_STEP);
                    state.window().request_redraw();
                }
                "B" => {
                    state.adjust_bias(BIAS_STEP);
                    state.window().request_redraw();
                }
                "p" => {
                    state.adjust_power(-POWER_STEP);
                    state.window().request_redraw();
                }
                "P" => {
                    state.adjust_power(POWER_STEP);
                    state.window().request_redraw();
                }
                "n" => {
                    state.adjust_noise(-NOISE_STEP);
                    state.window().request_redraw();
                }
                "N" => {
                    state.adjust_noise(NOISE_STEP);
                    state.window().request_redraw();
                }
                "r" => {
                    state.reset_tuning();
                    state.window().request_redraw();
                }
                _ => {}
            }
        }
        _ => {}
    }
}
