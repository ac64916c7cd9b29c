use serde::{Deserialize, Serialize};

/// Scalar controls for the blending kernel.
///
/// `bias` softens blend boundaries (small values approach a Voronoi
/// partition, large values approach a uniform average), `power` steepens the
/// distance falloff, and `noise` sets the dither amplitude. The fields carry
/// no cross-field invariant; every constructor and setter clamps its value
/// into the supported range, so a `TuningParams` is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TuningDraft")]
pub struct TuningParams {
    bias: f32,
    power: f32,
    noise: f32,
}

impl TuningParams {
    pub const BIAS_MIN: f32 = 0.001;
    pub const BIAS_MAX: f32 = 0.5;
    pub const POWER_MIN: f32 = 1.0;
    pub const POWER_MAX: f32 = 10.0;
    pub const NOISE_MIN: f32 = 0.0;
    pub const NOISE_MAX: f32 = 400.0;

    /// Builds a parameter set, clamping each value into its range.
    pub fn new(bias: f32, power: f32, noise: f32) -> Self {
        Self {
            bias: bias.clamp(Self::BIAS_MIN, Self::BIAS_MAX),
            power: power.clamp(Self::POWER_MIN, Self::POWER_MAX),
            noise: noise.clamp(Self::NOISE_MIN, Self::NOISE_MAX),
        }
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn noise(&self) -> f32 {
        self.noise
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias.clamp(Self::BIAS_MIN, Self::BIAS_MAX);
    }

    pub fn set_power(&mut self, power: f32) {
        self.power = power.clamp(Self::POWER_MIN, Self::POWER_MAX);
    }

    pub fn set_noise(&mut self, noise: f32) {
        self.noise = noise.clamp(Self::NOISE_MIN, Self::NOISE_MAX);
    }

    /// Nudges bias by `delta`, staying in range.
    pub fn adjust_bias(&mut self, delta: f32) {
        self.set_bias(self.bias + delta);
    }

    /// Nudges power by `delta`, staying in range.
    pub fn adjust_power(&mut self, delta: f32) {
        self.set_power(self.power + delta);
    }

    /// Nudges noise by `delta`, staying in range.
    pub fn adjust_noise(&mut self, delta: f32) {
        self.set_noise(self.noise + delta);
    }
}

impl Default for TuningParams {
    fn default() -> Self {
        Self::new(0.05, 2.5, 2.0)
    }
}

#[derive(Deserialize)]
struct TuningDraft {
    #[serde(default = "default_bias")]
    bias: f32,
    #[serde(default = "default_power")]
    power: f32,
    #[serde(default = "default_noise")]
    noise: f32,
}

fn default_bias() -> f32 {
    TuningParams::default().bias
}

fn default_power() -> f32 {
    TuningParams::default().power
}

fn default_noise() -> f32 {
    TuningParams::default().noise
}

impl From<TuningDraft> for TuningParams {
    fn from(draft: TuningDraft) -> Self {
        Self::new(draft.bias, draft.power, draft.noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_settings() {
        let params = TuningParams::default();
        assert!((params.bias() - 0.05).abs() < 1e-6);
        assert!((params.power() - 2.5).abs() < 1e-6);
        assert!((params.noise() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let params = TuningParams::new(10.0, 0.0, -5.0);
        assert_eq!(params.bias(), TuningParams::BIAS_MAX);
        assert_eq!(params.power(), TuningParams::POWER_MIN);
        assert_eq!(params.noise(), TuningParams::NOISE_MIN);
    }

    #[test]
    fn adjustments_stay_in_range() {
        let mut params = TuningParams::default();
        params.adjust_bias(100.0);
        assert_eq!(params.bias(), TuningParams::BIAS_MAX);
        params.adjust_noise(-100.0);
        assert_eq!(params.noise(), TuningParams::NOISE_MIN);
        params.adjust_power(0.5);
        assert!((params.power() - 3.0).abs() < 1e-6);
    }
}
