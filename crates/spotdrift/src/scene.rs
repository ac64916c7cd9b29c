//! TOML scene descriptions.
//!
//! A scene file carries the same settings the CLI flags expose, so a look
//! can be saved and replayed. Flags always win over file values; missing
//! fields fall back to the built-in defaults.

use std::fmt;
use std::time::Duration;

use gradient::{Rgba, TransitionCurve, TuningParams, MAX_SPOTS};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::defaults;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scene: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneFile {
    pub version: u32,
    #[serde(default = "default_spot_count")]
    pub spots: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(
        default = "default_transition",
        deserialize_with = "deserialize_duration"
    )]
    pub transition: Duration,
    #[serde(default)]
    pub curve: TransitionCurve,
    /// `None` when the file omits the palette; the defaults then apply.
    #[serde(default, deserialize_with = "deserialize_palette")]
    pub palette: Option<Vec<Rgba>>,
    #[serde(default)]
    pub tuning: TuningParams,
}

impl SceneFile {
    pub fn from_toml_str(input: &str) -> Result<Self, SceneError> {
        let raw: SceneFile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.version != 1 {
            return Err(SceneError::Invalid(format!(
                "unsupported scene version {}; expected 1",
                self.version
            )));
        }

        if self.spots > MAX_SPOTS {
            return Err(SceneError::Invalid(format!(
                "spot count {} exceeds the maximum of {MAX_SPOTS}",
                self.spots
            )));
        }

        if self.transition.is_zero() {
            return Err(SceneError::Invalid(
                "transition must be greater than zero".into(),
            ));
        }

        if let Some(palette) = &self.palette {
            if palette.is_empty() {
                return Err(SceneError::Invalid(
                    "palette must list at least one color".into(),
                ));
            }
        }

        Ok(())
    }
}

fn default_spot_count() -> usize {
    defaults::DEFAULT_SPOT_COUNT
}

fn default_transition() -> Duration {
    defaults::DEFAULT_TRANSITION
}

/// Parses `RRGGBB` or `RRGGBBAA` hex colors, with an optional `#` prefix.
pub(crate) fn parse_hex_color(raw: &str) -> Result<Rgba, String> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if !digits.is_ascii() || !matches!(digits.len(), 6 | 8) {
        return Err(format!(
            "invalid color '{raw}'; expected RRGGBB or RRGGBBAA hex digits"
        ));
    }

    let mut channels = [255u8; 4];
    for (index, slot) in channels.iter_mut().take(digits.len() / 2).enumerate() {
        let pair = &digits[index * 2..index * 2 + 2];
        *slot = u8::from_str_radix(pair, 16)
            .map_err(|_| format!("invalid hex digits '{pair}' in color '{raw}'"))?;
    }

    let [r, g, b, a] = channels;
    Ok(Rgba::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        f32::from(a) / 255.0,
    ))
}

fn deserialize_palette<'de, D>(deserializer: D) -> Result<Option<Vec<Rgba>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    raw.iter()
        .map(|entry| parse_hex_color(entry).map_err(de::Error::custom))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer).map(|d| d.unwrap_or_else(default_transition))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
spots = 6
seed = 42
transition = "3s"
curve = "smoothstep"
palette = ["#ff2d55", "5856d6cc"]

[tuning]
bias = 0.1
power = 3.0
noise = 8.0
"##;

    #[test]
    fn parses_sample_scene() {
        let scene = SceneFile::from_toml_str(SAMPLE).expect("parse scene");
        assert_eq!(scene.version, 1);
        assert_eq!(scene.spots, 6);
        assert_eq!(scene.seed, Some(42));
        assert_eq!(scene.transition, Duration::from_secs(3));
        assert_eq!(scene.curve, TransitionCurve::Smoothstep);
        let palette = scene.palette.expect("palette present");
        assert_eq!(palette.len(), 2);
        assert!((palette[1].a - 204.0 / 255.0).abs() < 1e-6);
        assert!((scene.tuning.bias() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let scene = SceneFile::from_toml_str("version = 1").expect("parse scene");
        assert_eq!(scene.spots, defaults::DEFAULT_SPOT_COUNT);
        assert_eq!(scene.transition, defaults::DEFAULT_TRANSITION);
        assert_eq!(scene.curve, TransitionCurve::EaseInOut);
        assert_eq!(scene.palette, None);
        assert_eq!(scene.tuning, TuningParams::default());
    }

    #[test]
    fn rejects_explicitly_empty_palette() {
        let err = SceneFile::from_toml_str("version = 1\npalette = []").unwrap_err();
        assert!(matches!(err, SceneError::Invalid(_)));
    }

    #[test]
    fn accepts_numeric_transitions() {
        let scene = SceneFile::from_toml_str("version = 1\ntransition = 2").expect("parse scene");
        assert_eq!(scene.transition, Duration::from_secs(2));
        let scene =
            SceneFile::from_toml_str("version = 1\ntransition = 0.5").expect("parse scene");
        assert_eq!(scene.transition, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = SceneFile::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, SceneError::Invalid(_)));
    }

    #[test]
    fn rejects_too_many_spots() {
        let err = SceneFile::from_toml_str("version = 1\nspots = 9").unwrap_err();
        assert!(matches!(err, SceneError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_transition() {
        let err = SceneFile::from_toml_str("version = 1\ntransition = \"0s\"").unwrap_err();
        assert!(matches!(err, SceneError::Invalid(_)));
    }

    #[test]
    fn parses_hex_color_forms() {
        let color = parse_hex_color("#ff2d55").unwrap();
        assert!((color.r - 1.0).abs() < 1e-6);
        assert!((color.a - 1.0).abs() < 1e-6);
        let with_alpha = parse_hex_color("ff2d55cc").unwrap();
        assert!((with_alpha.a - 204.0 / 255.0).abs() < 1e-6);
        assert!(parse_hex_color("#ff2d5").is_err());
        assert!(parse_hex_color("gggggg").is_err());
    }
}
