//! Host-side mirror of the GPU blending kernel.
//!
//! The renderer executes this algorithm in WGSL; this module repeats it in
//! Rust with the same hash, the same arithmetic order and the same guards,
//! so the numeric contract can be property-tested on the host and device
//! output can be verified against it. Both sides read the packed uniform
//! block, not the higher-level spot types, so any packing mistake shows up
//! here too.

use crate::uniforms::{PackedUniforms, MAX_SPOTS};

/// Canonical 2D hash used for weight dithering; returns values in `[0, 1)`.
///
/// Matches WGSL `fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453)`,
/// including `fract` flooring rather than truncating for negative inputs.
pub fn hash21(p: [f32; 2]) -> f32 {
    let dot = p[0] * 12.9898_f32 + p[1] * 78.233_f32;
    let value = dot.sin() * 43758.5453_f32;
    value - value.floor()
}

/// Evaluates the blending kernel for one pixel at normalized coordinates `p`.
///
/// Weights are inverse-distance-power with additive bias, dithered by a
/// hash-derived offset scaled to `noise / 255` and clamped non-negative,
/// then normalized over a strictly positive denominator. An empty block
/// yields opaque black.
pub fn blend_pixel(uniforms: &PackedUniforms, p: [f32; 2]) -> [f32; 4] {
    let count = uniforms.spot_count() as usize;
    if count == 0 {
        return [0.0, 0.0, 0.0, 1.0];
    }

    let bias = uniforms.bias();
    let power = uniforms.power();
    let noise = uniforms.noise();
    let slots = uniforms.slots();

    let mut weights = [0.0_f32; MAX_SPOTS];
    let mut total = 0.0_f32;
    for (i, slot) in slots[..count].iter().enumerate() {
        let position = slot.position();
        let dx = p[0] - position[0];
        let dy = p[1] - position[1];
        let distance = (dx * dx + dy * dy).sqrt();
        let weight = 1.0 / (distance.powf(power) + bias);
        let jitter = (hash21([p[0] + i as f32 * 17.13, p[1] + i as f32 * 31.7]) - 0.5)
            * noise
            * (1.0 / 255.0);
        let dithered = (weight + jitter).max(0.0);
        weights[i] = dithered;
        total += dithered;
    }

    let denom = total.max(1e-6);
    let mut color = [0.0_f32; 4];
    for (i, slot) in slots[..count].iter().enumerate() {
        let contribution = weights[i] / denom;
        let slot_color = slot.color();
        color[0] += slot_color[0] * contribution;
        color[1] += slot_color[1] * contribution;
        color[2] += slot_color[2] * contribution;
        color[3] += slot_color[3] * contribution;
    }
    color
}

/// Renders a full frame on the CPU, row-major, one RGBA quad per pixel.
///
/// Pixels sample the unit square at their centers, the same mapping the
/// kernel applies, so this output is directly comparable with a device
/// readback of the same uniforms.
pub fn render_reference(uniforms: &PackedUniforms, width: u32, height: u32) -> Vec<[f32; 4]> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let p = [
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            ];
            pixels.push(blend_pixel(uniforms, p));
        }
    }
    pixels
}
