use std::time::Duration;

use gradient::{Rgba, TimelineSettings, TransitionCurve, TuningParams};

use crate::runtime::RenderPolicy;

/// Scene content and animation settings the renderer drives.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    /// Number of animated spots.
    pub spot_count: usize,
    /// Colors assigned to spots in cycling order.
    pub palette: Vec<Rgba>,
    /// Blend shaping parameters uploaded with every frame.
    pub tuning: TuningParams,
    /// Wall-clock length of one layout-to-layout transition.
    pub transition: Duration,
    /// Easing applied to transition progress.
    pub curve: TransitionCurve,
    /// Seed for reproducible layouts; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl SceneSettings {
    /// Timeline settings equivalent to this scene.
    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            spot_count: self.spot_count,
            palette: self.palette.clone(),
            transition: self.transition,
            curve: self.curve,
            seed: self.seed,
        }
    }
}

impl Default for SceneSettings {
    /// Provides an empty scene that renders opaque black.
    fn default() -> Self {
        Self {
            spot_count: 0,
            palette: Vec::new(),
            tuning: TuningParams::default(),
            transition: Duration::from_secs(5),
            curve: TransitionCurve::default(),
            seed: None,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and tells the renderer how large the
/// target surface should be, what scene to animate, and which presentation
/// policy to follow.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window or export size in physical pixels.
    pub surface_size: (u32, u32),
    /// Scene content and animation settings.
    pub scene: SceneSettings,
    /// High-level render behaviour requested by the caller.
    pub policy: RenderPolicy,
}

impl Default for RendererConfig {
    /// Provides a 1080p animating configuration with an empty scene.
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            scene: SceneSettings::default(),
            policy: RenderPolicy::default(),
        }
    }
}
