//! Core data model for the spot-gradient engine.
//!
//! A frame is described by a small ordered set of colored spots in the unit
//! square. This crate owns everything the GPU renderer consumes but that does
//! not itself touch a device: the spot model and its vector interpolation,
//! the fixed-layout uniform packing shared with the compute kernel, tuning
//! parameters, randomized layout generation, the transition timeline, and a
//! host-side mirror of the blending kernel used for verification.

mod blend;
mod layout;
mod params;
mod spots;
mod timeline;
mod uniforms;

pub use blend::{blend_pixel, hash21, render_reference};
pub use layout::LayoutGenerator;
pub use params::TuningParams;
pub use spots::{interpolate, AnimatableVector, Rgba, Spot, SpotPoint, SpotSet};
pub use timeline::{SpotTimeline, TimelineSettings, TransitionCurve};
pub use uniforms::{pack, PackedSpot, PackedUniforms, MAX_SPOTS};

/// Errors surfaced while assembling GPU input from caller-supplied data.
///
/// All variants are configuration errors in the engine's taxonomy: they are
/// raised synchronously, before any packing or submission happens, and leave
/// no partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradientError {
    #[error("interpolation endpoints hold {from} and {to} spots; counts must match")]
    CardinalityMismatch { from: usize, to: usize },
    #[error("spot count {count} exceeds the supported maximum of {max}")]
    InvalidSpotCount { count: usize, max: usize },
    #[error("layout generation needs at least one palette color")]
    EmptyPalette,
}
