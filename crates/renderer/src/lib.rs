//! Renderer crate for spotdrift.
//!
//! The crate glues the winit preview window, the `wgpu` compute pipeline,
//! and the gradient timeline together. The overall flow is:
//!
//! ```text
//!   CLI / spotdrift
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ window loop ──▶ SpotTimeline::sample ──▶ pack()
//!          │                                                     │
//!          └─▶ still export (headless) ◀── storage texture ◀── blend kernel
//! ```
//!
//! `GpuState` owns all GPU resources (device, compute pipeline, uniform
//! buffer, storage texture), while `Renderer` is the thin entry point that
//! chooses between the animating preview window, a frozen in-window still,
//! or a headless PNG export.

mod gpu;
mod runtime;
mod still;
mod types;
mod window;

use anyhow::Result;

pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FramePacer, RenderPolicy,
    SystemTimeSource, TimeSample, TimeSource,
};
pub use types::{RendererConfig, SceneSettings};

/// Entry point that drives a scene according to the configured policy.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    /// Creates a renderer for the provided configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Runs until the window closes or the export completes.
    pub fn run(self) -> Result<()> {
        match &self.config.policy {
            RenderPolicy::Animate { .. } | RenderPolicy::Still { .. } => {
                window::run_windowed(self.config)
            }
            RenderPolicy::Export { time, path } => {
                let (time, path) = (*time, path.clone());
                still::export_still(&self.config, time, &path)
            }
        }
    }
}
