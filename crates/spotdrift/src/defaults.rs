//! Built-in scene defaults used when neither flags nor a scene file
//! provide a value.

use std::time::Duration;

use gradient::Rgba;

pub const DEFAULT_SPOT_COUNT: usize = 4;
pub const DEFAULT_TRANSITION: Duration = Duration::from_secs(5);
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (1920, 1080);

/// Palette assigned to spots when no colors are configured.
pub fn default_palette() -> Vec<Rgba> {
    vec![
        Rgba::opaque(1.0, 0.176, 0.333),
        Rgba::opaque(0.345, 0.337, 0.839),
        Rgba::opaque(0.196, 0.678, 0.902),
        Rgba::opaque(1.0, 0.231, 0.188),
    ]
}
