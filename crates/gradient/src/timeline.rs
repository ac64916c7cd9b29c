use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::layout::LayoutGenerator;
use crate::spots::{interpolate, Rgba, SpotSet};
use crate::GradientError;

/// Easing applied to transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionCurve {
    Linear,
    Smoothstep,
    EaseInOut,
}

impl TransitionCurve {
    /// Maps linear progress onto the eased curve; input is clamped to `[0, 1]`.
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            TransitionCurve::Linear => clamped,
            TransitionCurve::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            TransitionCurve::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
        }
    }
}

impl Default for TransitionCurve {
    fn default() -> Self {
        Self::EaseInOut
    }
}

/// Settings the timeline is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSettings {
    /// Number of spots per layout.
    pub spot_count: usize,
    /// Colors assigned to spots in order, cycling when exhausted.
    pub palette: Vec<Rgba>,
    /// Duration of one layout-to-layout transition.
    pub transition: Duration,
    /// Easing applied within each transition.
    pub curve: TransitionCurve,
    /// Seed for reproducible layouts; `None` draws OS entropy.
    pub seed: Option<u64>,
}

/// Deterministic spot-layout timeline.
///
/// Time divides into consecutive segments of the transition duration;
/// segment `k` eases from layout `k` to layout `k+1`. Sampling is a pure
/// function of elapsed seconds, so a still export at some timestamp shows
/// exactly what live playback shows when it reaches that timestamp.
#[derive(Debug, Clone)]
pub struct SpotTimeline {
    generator: LayoutGenerator,
    transition: Duration,
    curve: TransitionCurve,
}

impl SpotTimeline {
    pub fn new(settings: TimelineSettings) -> Result<Self, GradientError> {
        let generator =
            LayoutGenerator::new(settings.spot_count, settings.palette, settings.seed)?;
        Ok(Self {
            generator,
            transition: settings.transition.max(Duration::from_millis(1)),
            curve: settings.curve,
        })
    }

    /// Samples the blended spot set at `seconds` since timeline start.
    pub fn sample(&self, seconds: f64) -> SpotSet {
        let seconds = seconds.max(0.0);
        let segment_len = self.transition.as_secs_f64();
        let segment = (seconds / segment_len) as u64;
        let progress = ((seconds - segment as f64 * segment_len) / segment_len) as f32;
        let eased = self.curve.sample(progress);

        let from = self.generator.layout(segment);
        let to = self.generator.layout(segment.saturating_add(1));
        interpolate(&from, &to, eased).expect("timeline layouts share one cardinality")
    }

    /// Seconds at which the segment containing `seconds` hands off to the
    /// next one. Used to jump a running animation straight to its target.
    pub fn next_boundary(&self, seconds: f64) -> f64 {
        let segment_len = self.transition.as_secs_f64();
        let segment = (seconds.max(0.0) / segment_len) as u64;
        (segment as f64 + 1.0) * segment_len
    }

    pub fn transition(&self) -> Duration {
        self.transition
    }

    /// The effective layout seed, for logging and replay.
    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u64) -> TimelineSettings {
        TimelineSettings {
            spot_count: 4,
            palette: vec![
                Rgba::opaque(1.0, 0.0, 0.5),
                Rgba::opaque(0.3, 0.3, 0.8),
                Rgba::opaque(0.2, 0.7, 0.9),
                Rgba::opaque(1.0, 0.2, 0.2),
            ],
            transition: Duration::from_secs(5),
            curve: TransitionCurve::EaseInOut,
            seed: Some(seed),
        }
    }

    #[test]
    fn curves_hit_their_endpoints() {
        for curve in [
            TransitionCurve::Linear,
            TransitionCurve::Smoothstep,
            TransitionCurve::EaseInOut,
        ] {
            assert!((curve.sample(0.0) - 0.0).abs() < 1e-6);
            assert!((curve.sample(1.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn curves_increase_monotonically() {
        for curve in [
            TransitionCurve::Linear,
            TransitionCurve::Smoothstep,
            TransitionCurve::EaseInOut,
        ] {
            let mut last = 0.0;
            for step in 0..=20 {
                let sample = curve.sample(step as f32 / 20.0);
                assert!(sample >= last - f32::EPSILON);
                last = sample;
            }
        }
    }

    #[test]
    fn curve_input_is_clamped() {
        assert_eq!(TransitionCurve::Linear.sample(-1.0), 0.0);
        assert_eq!(TransitionCurve::Linear.sample(2.0), 1.0);
    }

    #[test]
    fn seeded_timelines_agree() {
        let a = SpotTimeline::new(settings(7)).unwrap();
        let b = SpotTimeline::new(settings(7)).unwrap();
        for seconds in [0.0, 1.3, 4.999, 5.0, 17.25, 60.0] {
            assert_eq!(a.sample(seconds), b.sample(seconds));
        }
    }

    #[test]
    fn segment_boundaries_land_on_generated_layouts() {
        let timeline = SpotTimeline::new(settings(11)).unwrap();
        assert_eq!(timeline.sample(0.0), timeline.generator.layout(0));
        assert_eq!(timeline.sample(5.0), timeline.generator.layout(1));
        assert_eq!(timeline.sample(15.0), timeline.generator.layout(3));
    }

    #[test]
    fn arbitrary_timestamps_match_live_playback() {
        let jumped = SpotTimeline::new(settings(3)).unwrap();
        let late = jumped.sample(23.7);

        let played = SpotTimeline::new(settings(3)).unwrap();
        for step in 0..200 {
            played.sample(step as f64 * 0.12);
        }
        assert_eq!(played.sample(23.7), late);
    }

    #[test]
    fn next_boundary_advances_one_segment() {
        let timeline = SpotTimeline::new(settings(1)).unwrap();
        assert_eq!(timeline.next_boundary(0.0), 5.0);
        assert_eq!(timeline.next_boundary(4.2), 5.0);
        assert_eq!(timeline.next_boundary(5.1), 10.0);
    }

    #[test]
    fn negative_time_clamps_to_start() {
        let timeline = SpotTimeline::new(settings(9)).unwrap();
        assert_eq!(timeline.sample(-3.0), timeline.sample(0.0));
    }
}
