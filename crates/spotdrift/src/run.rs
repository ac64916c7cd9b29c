use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::{RenderPolicy, Renderer, RendererConfig, SceneSettings};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::defaults;
use crate::scene::SceneFile;

pub fn run(cli: Cli) -> Result<()> {
    let scene_file = match cli.scene.as_deref() {
        Some(path) => Some(load_scene(path)?),
        None => None,
    };

    let scene = build_scene(&cli, scene_file.as_ref());
    let surface_size = cli.size.unwrap_or(defaults::DEFAULT_SURFACE_SIZE);
    let policy = select_policy(&cli);

    tracing::info!(
        width = surface_size.0,
        height = surface_size.1,
        spots = scene.spot_count,
        policy = ?policy,
        "starting spotdrift"
    );

    let config = RendererConfig {
        surface_size,
        scene,
        policy,
    };
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_scene(path: &Path) -> Result<SceneFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file {}", path.display()))?;
    SceneFile::from_toml_str(&raw)
        .with_context(|| format!("failed to load scene file {}", path.display()))
}

/// Merges settings by precedence: CLI flags, then the scene file, then
/// built-in defaults.
fn build_scene(cli: &Cli, file: Option<&SceneFile>) -> SceneSettings {
    let palette = cli
        .palette
        .clone()
        .or_else(|| file.and_then(|f| f.palette.clone()))
        .unwrap_or_else(defaults::default_palette);

    let mut tuning = file.map(|f| f.tuning).unwrap_or_default();
    if let Some(bias) = cli.bias {
        tuning.set_bias(bias);
    }
    if let Some(power) = cli.power {
        tuning.set_power(power);
    }
    if let Some(noise) = cli.noise {
        tuning.set_noise(noise);
    }

    SceneSettings {
        spot_count: cli
            .spots
            .or_else(|| file.map(|f| f.spots))
            .unwrap_or(defaults::DEFAULT_SPOT_COUNT),
        palette,
        tuning,
        transition: cli
            .duration
            .or_else(|| file.map(|f| f.transition))
            .unwrap_or(defaults::DEFAULT_TRANSITION),
        curve: cli
            .curve
            .or_else(|| file.map(|f| f.curve))
            .unwrap_or_default(),
        seed: cli.seed.or_else(|| file.and_then(|f| f.seed)),
    }
}

fn select_policy(cli: &Cli) -> RenderPolicy {
    match (&cli.export, cli.still) {
        (Some(path), time) => RenderPolicy::Export {
            time: time.unwrap_or(0.0),
            path: path.clone(),
        },
        (None, Some(time)) => RenderPolicy::Still { time },
        (None, None) => RenderPolicy::Animate {
            target_fps: match cli.fps {
                Some(v) if v > 0.0 => Some(v),
                _ => None,
            },
        },
    }
}
