//! Workgroup sizing strategies for the blending kernel.
//!
//! The kernel itself is dispatch-agnostic; what varies between devices is
//! how many threads a workgroup may hold and how the grid covers the
//! surface. We probe adapter limits once at startup and commit to one of
//! two strategies for the lifetime of the pipeline.

use std::fmt;

/// Threshold a device must clear before per-pixel dispatch is worthwhile.
const PER_PIXEL_MIN_INVOCATIONS: u32 = 256;

/// Fallback execution width when the adapter does not report subgroup sizes.
const DEFAULT_EXECUTION_WIDTH: u32 = 32;

/// Tile edge used by the conservative fallback strategy.
const FALLBACK_TILE: u32 = 8;

/// Maps compute workgroups onto the output surface.
///
/// The workgroup dimensions are compiled into the kernel, so a strategy is
/// fixed at pipeline build time and only the group counts vary per frame.
pub(crate) trait DispatchStrategy: fmt::Debug + Send + Sync {
    /// Workgroup dimensions baked into the kernel source.
    fn workgroup_size(&self) -> (u32, u32);

    /// Workgroup grid for a surface of the given pixel size.
    fn workgroup_count(&self, width: u32, height: u32) -> (u32, u32);

    /// Short name for startup logs.
    fn name(&self) -> &'static str;
}

/// One thread per pixel. The grid rounds up to cover the whole surface and
/// the kernel bounds-checks the overhang threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PerPixelDispatch {
    group_width: u32,
    group_height: u32,
}

impl PerPixelDispatch {
    /// Derives workgroup dimensions from adapter limits, or `None` when the
    /// device cannot hold a workgroup large enough to make this worthwhile.
    ///
    /// Width follows the hardware execution width where the adapter reports
    /// one, clamped to a sane range; height then fills the remaining
    /// invocation budget.
    pub(crate) fn from_limits(limits: &wgpu::Limits) -> Option<Self> {
        if limits.max_compute_invocations_per_workgroup < PER_PIXEL_MIN_INVOCATIONS {
            return None;
        }
        let execution_width = if limits.max_subgroup_size > 0 {
            limits.max_subgroup_size.clamp(8, 64)
        } else {
            DEFAULT_EXECUTION_WIDTH
        };
        let group_width = execution_width.min(limits.max_compute_workgroup_size_x);
        if group_width == 0 {
            return None;
        }
        let group_height = (limits.max_compute_invocations_per_workgroup / group_width)
            .min(limits.max_compute_workgroup_size_y)
            .max(1);
        Some(Self {
            group_width,
            group_height,
        })
    }
}

impl DispatchStrategy for PerPixelDispatch {
    fn workgroup_size(&self) -> (u32, u32) {
        (self.group_width, self.group_height)
    }

    fn workgroup_count(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.div_ceil(self.group_width),
            height.div_ceil(self.group_height),
        )
    }

    fn name(&self) -> &'static str {
        "per-pixel"
    }
}

/// Fixed 8x8 tiles with a floor grid. Trailing rows and columns that do
/// not fill a tile are left untouched, which keeps the dispatch valid on
/// devices with very small workgroup limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TiledDispatch;

impl DispatchStrategy for TiledDispatch {
    fn workgroup_size(&self) -> (u32, u32) {
        (FALLBACK_TILE, FALLBACK_TILE)
    }

    fn workgroup_count(&self, width: u32, height: u32) -> (u32, u32) {
        (width / FALLBACK_TILE, height / FALLBACK_TILE)
    }

    fn name(&self) -> &'static str {
        "tiled-8x8"
    }
}

/// Picks the strongest strategy the adapter limits can sustain.
pub(crate) fn select_strategy(limits: &wgpu::Limits) -> Box<dyn DispatchStrategy> {
    match PerPixelDispatch::from_limits(limits) {
        Some(strategy) => {
            let (group_width, group_height) = strategy.workgroup_size();
            tracing::debug!(group_width, group_height, "using per-pixel dispatch");
            Box::new(strategy)
        }
        None => {
            tracing::debug!(
                max_invocations = limits.max_compute_invocations_per_workgroup,
                "device limits below per-pixel threshold; falling back to tiled dispatch"
            );
            Box::new(TiledDispatch)
        }
    }
}
