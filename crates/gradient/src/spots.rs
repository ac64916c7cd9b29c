use serde::{Deserialize, Serialize};

use crate::GradientError;

/// A 2D position in normalized unit-square coordinates `[0,1)×[0,1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotPoint {
    pub x: f32,
    pub y: f32,
}

impl SpotPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// A fully opaque color.
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Components in `[r, g, b, a]` order, the same order the kernel reads.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A colored anchor point blended across the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub position: SpotPoint,
    pub color: Rgba,
}

impl Spot {
    pub const fn new(position: SpotPoint, color: Rgba) -> Self {
        Self { position, color }
    }
}

/// The ordered collection of spots describing one frame's layout.
///
/// Sets are value-created whenever a new animation target is chosen and
/// never mutated in place; the engine only interpolates between a "from"
/// and a "to" set. Order matters only insofar as consecutive animation
/// keyframes must pair up spot-for-spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotSet {
    spots: Vec<Spot>,
}

impl SpotSet {
    pub fn new(spots: Vec<Spot>) -> Self {
        Self { spots }
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spot> {
        self.spots.iter()
    }
}

impl FromIterator<Spot> for SpotSet {
    fn from_iter<I: IntoIterator<Item = Spot>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A spot set flattened to scalar components for vector-space interpolation.
///
/// Layout per spot is `[x, y, r, g, b, a]`, spots in set order. Encoding and
/// decoding round-trip exactly, and any blend of two equal-cardinality
/// vectors decodes to a well-formed set of the same cardinality.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatableVector {
    components: Vec<f32>,
}

impl AnimatableVector {
    const STRIDE: usize = 6;

    /// Flattens a spot set into its component vector.
    pub fn encode(set: &SpotSet) -> Self {
        let mut components = Vec::with_capacity(set.len() * Self::STRIDE);
        for spot in set.iter() {
            components.push(spot.position.x);
            components.push(spot.position.y);
            components.push(spot.color.r);
            components.push(spot.color.g);
            components.push(spot.color.b);
            components.push(spot.color.a);
        }
        Self { components }
    }

    /// Rebuilds the spot set this vector encodes.
    pub fn decode(&self) -> SpotSet {
        self.components
            .chunks_exact(Self::STRIDE)
            .map(|chunk| Spot {
                position: SpotPoint::new(chunk[0], chunk[1]),
                color: Rgba::new(chunk[2], chunk[3], chunk[4], chunk[5]),
            })
            .collect()
    }

    /// Number of spots represented by this vector.
    pub fn cardinality(&self) -> usize {
        self.components.len() / Self::STRIDE
    }

    pub fn components(&self) -> &[f32] {
        &self.components
    }

    /// Component-wise linear blend between two vectors.
    ///
    /// The arithmetic is arranged so `t = 0` reproduces `self` and `t = 1`
    /// reproduces `other` without drift.
    pub fn lerp(&self, other: &Self, t: f32) -> Result<Self, GradientError> {
        if self.components.len() != other.components.len() {
            return Err(GradientError::CardinalityMismatch {
                from: self.cardinality(),
                to: other.cardinality(),
            });
        }
        let components = self
            .components
            .iter()
            .zip(other.components.iter())
            .map(|(a, b)| a * (1.0 - t) + b * t)
            .collect();
        Ok(Self { components })
    }
}

/// Blends two equal-cardinality spot sets at parameter `t ∈ [0, 1]`.
///
/// `t = 0` yields `from` and `t = 1` yields `to` exactly, component-wise.
/// Fails with [`GradientError::CardinalityMismatch`] when the sets hold
/// different numbers of spots. Pure function; neither input is touched.
pub fn interpolate(from: &SpotSet, to: &SpotSet, t: f32) -> Result<SpotSet, GradientError> {
    let a = AnimatableVector::encode(from);
    let b = AnimatableVector::encode(to);
    Ok(a.lerp(&b, t)?.decode())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set(offset: f32) -> SpotSet {
        SpotSet::new(vec![
            Spot::new(
                SpotPoint::new(0.1 + offset, 0.2),
                Rgba::opaque(1.0, 0.3, 0.0),
            ),
            Spot::new(
                SpotPoint::new(0.8, 0.9 - offset),
                Rgba::new(0.0, 0.5, 1.0, 0.75),
            ),
        ])
    }

    #[test]
    fn encode_decode_round_trips_exactly() {
        let set = sample_set(0.0);
        let vector = AnimatableVector::encode(&set);
        assert_eq!(vector.cardinality(), set.len());
        assert_eq!(vector.decode(), set);
    }

    #[test]
    fn interpolation_endpoints_are_exact() {
        let from = sample_set(0.0);
        let to = sample_set(0.37);
        assert_eq!(interpolate(&from, &to, 0.0).unwrap(), from);
        assert_eq!(interpolate(&from, &to, 1.0).unwrap(), to);
    }

    #[test]
    fn interpolation_is_monotonic_between_endpoints() {
        let from = SpotSet::new(vec![Spot::new(
            SpotPoint::new(0.0, 0.25),
            Rgba::opaque(0.0, 0.0, 0.0),
        )]);
        let to = SpotSet::new(vec![Spot::new(
            SpotPoint::new(1.0, 0.75),
            Rgba::opaque(1.0, 1.0, 1.0),
        )]);
        let mut last_x = -1.0_f32;
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            let sample = interpolate(&from, &to, t).unwrap();
            let x = sample.spots()[0].position.x;
            assert!(x >= last_x);
            assert!((0.0..=1.0).contains(&x));
            last_x = x;
        }
    }

    #[test]
    fn mismatched_cardinality_is_rejected() {
        let from = sample_set(0.0);
        let to = SpotSet::new(vec![Spot::new(
            SpotPoint::new(0.5, 0.5),
            Rgba::opaque(1.0, 1.0, 1.0),
        )]);
        let err = interpolate(&from, &to, 0.5).unwrap_err();
        assert_eq!(err, GradientError::CardinalityMismatch { from: 2, to: 1 });
    }

    #[test]
    fn midpoint_blends_components() {
        let from = SpotSet::new(vec![Spot::new(
            SpotPoint::new(0.0, 0.0),
            Rgba::opaque(0.0, 1.0, 0.0),
        )]);
        let to = SpotSet::new(vec![Spot::new(
            SpotPoint::new(1.0, 0.5),
            Rgba::opaque(1.0, 0.0, 0.0),
        )]);
        let mid = interpolate(&from, &to, 0.5).unwrap();
        let spot = mid.spots()[0];
        assert!((spot.position.x - 0.5).abs() < 1e-6);
        assert!((spot.position.y - 0.25).abs() < 1e-6);
        assert!((spot.color.r - 0.5).abs() < 1e-6);
        assert!((spot.color.g - 0.5).abs() < 1e-6);
    }
}
