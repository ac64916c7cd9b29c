use std::path::Path;

use anyhow::{Context, Result};
use gradient::{pack, SpotTimeline};

use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Renders one frame headlessly and writes it to `path` as PNG.
pub(crate) fn export_still(config: &RendererConfig, time: f64, path: &Path) -> Result<()> {
    let (width, height) = config.surface_size;
    let mut gpu = GpuState::new_headless((width, height))?;

    let timeline = SpotTimeline::new(config.scene.timeline_settings())?;
    let spots = timeline.sample(time);
    let uniforms = pack(&spots, &config.scene.tuning)?;

    let pixels = gpu.render_headless(&uniforms)?;
    let image = image::RgbaImage::from_raw(width.max(1), height.max(1), pixels)
        .context("readback buffer does not match the requested image size")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        width,
        height,
        seconds = time,
        "exported still frame"
    );
    Ok(())
}
