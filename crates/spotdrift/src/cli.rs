use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gradient::{Rgba, TransitionCurve, TuningParams, MAX_SPOTS};

use crate::scene::parse_hex_color;

#[derive(Parser, Debug)]
#[command(
    name = "spotdrift",
    author,
    version,
    about = "Animated multicolor gradient engine",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Scene description TOML file; flags below override its values.
    #[arg(long, value_name = "FILE")]
    pub scene: Option<PathBuf>,

    /// Override the render resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap for animated rendering (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Render a single frozen frame at this timestamp (seconds) instead of animating.
    #[arg(long, value_name = "SECONDS", value_parser = parse_still_time)]
    pub still: Option<f64>,

    /// Export one frame to the provided PNG path then exit (combine with `--still` to pick the timestamp).
    #[arg(long, value_name = "PATH", value_parser = parse_export_path)]
    pub export: Option<PathBuf>,

    /// Number of gradient spots to animate (0-8).
    #[arg(long, value_name = "COUNT", value_parser = parse_spot_count)]
    pub spots: Option<usize>,

    /// Seed for deterministic layout generation.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Comma-separated palette of hex colors (e.g. `#ff2d55,#5856d6`).
    #[arg(long, value_name = "COLORS", value_delimiter = ',', value_parser = parse_color)]
    pub palette: Option<Vec<Rgba>>,

    /// Distance bias added to every blend weight denominator.
    #[arg(long, value_name = "VALUE", value_parser = parse_bias)]
    pub bias: Option<f32>,

    /// Falloff exponent applied to spot distances.
    #[arg(long, value_name = "VALUE", value_parser = parse_power)]
    pub power: Option<f32>,

    /// Dither amplitude in 8-bit color steps.
    #[arg(long, value_name = "VALUE", value_parser = parse_noise)]
    pub noise: Option<f32>,

    /// Length of one layout-to-layout transition (e.g. `5s`, `1500ms`).
    #[arg(long, value_name = "DURATION", value_parser = parse_transition)]
    pub duration: Option<Duration>,

    /// Easing curve for transitions: `linear`, `smoothstep`, or `ease-in-out`.
    #[arg(long, value_name = "CURVE", value_parser = parse_curve)]
    pub curve: Option<TransitionCurve>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("size must not be empty".to_string());
    }

    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in size".to_string())?;
    if width == 0 || height == 0 {
        return Err("size dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_still_time(value: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("still timestamp must not be empty".to_string());
    }

    let seconds: f64 = trimmed
        .parse()
        .map_err(|_| format!("invalid timestamp '{trimmed}'; expected seconds"))?;
    if !seconds.is_finite() {
        return Err("still timestamp must be finite".to_string());
    }
    if seconds < 0.0 {
        return Err("still timestamp must not be negative".to_string());
    }
    if seconds > 1e9 {
        return Err("still timestamp is too large; use at most 1e9 seconds".to_string());
    }
    Ok(seconds)
}

pub fn parse_export_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value.trim());
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(path),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

pub fn parse_spot_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid spot count '{value}'"))?;
    if count > MAX_SPOTS {
        return Err(format!("spot count {count} exceeds the maximum of {MAX_SPOTS}"));
    }
    Ok(count)
}

pub fn parse_color(value: &str) -> Result<Rgba, String> {
    parse_hex_color(value.trim())
}

pub fn parse_bias(value: &str) -> Result<f32, String> {
    parse_bounded(value, "bias", TuningParams::BIAS_MIN, TuningParams::BIAS_MAX)
}

pub fn parse_power(value: &str) -> Result<f32, String> {
    parse_bounded(value, "power", TuningParams::POWER_MIN, TuningParams::POWER_MAX)
}

pub fn parse_noise(value: &str) -> Result<f32, String> {
    parse_bounded(value, "noise", TuningParams::NOISE_MIN, TuningParams::NOISE_MAX)
}

fn parse_bounded(value: &str, name: &str, min: f32, max: f32) -> Result<f32, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must not be empty"));
    }

    let parsed: f32 = trimmed
        .parse()
        .map_err(|_| format!("invalid {name} '{trimmed}'"))?;
    if !parsed.is_finite() {
        return Err(format!("{name} must be finite"));
    }
    if parsed < min || parsed > max {
        return Err(format!("{name} {parsed} is outside the range {min}..={max}"));
    }
    Ok(parsed)
}

pub fn parse_transition(value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value.trim())
        .map_err(|err| format!("invalid duration '{value}': {err}"))?;
    if duration.is_zero() {
        return Err("transition duration must be greater than zero".to_string());
    }
    Ok(duration)
}

pub fn parse_curve(value: &str) -> Result<TransitionCurve, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "linear" => Ok(TransitionCurve::Linear),
        "smoothstep" => Ok(TransitionCurve::Smoothstep),
        "ease-in-out" => Ok(TransitionCurve::EaseInOut),
        other => Err(format!(
            "unknown curve '{other}'; expected linear, smoothstep, or ease-in-out"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_size_variants() {
        assert_eq!(parse_surface_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_surface_size("640X480").unwrap(), (640, 480));
        assert!(parse_surface_size("1920").is_err());
        assert!(parse_surface_size("0x100").is_err());
        assert!(parse_surface_size("axb").is_err());
    }

    #[test]
    fn validates_still_timestamps() {
        assert_eq!(parse_still_time("12.5").unwrap(), 12.5);
        assert_eq!(parse_still_time("0").unwrap(), 0.0);
        assert!(parse_still_time("-1").is_err());
        assert!(parse_still_time("nan").is_err());
        assert!(parse_still_time("2e12").is_err());
    }

    #[test]
    fn validates_export_extension() {
        assert_eq!(
            parse_export_path("out/frame.png").unwrap(),
            PathBuf::from("out/frame.png")
        );
        assert!(parse_export_path("frame.PNG").is_ok());
        assert!(parse_export_path("frame.exr").is_err());
        assert!(parse_export_path("frame").is_err());
    }

    #[test]
    fn bounds_tuning_values() {
        assert!(parse_bias("0.05").is_ok());
        assert!(parse_bias("0.0001").is_err());
        assert!(parse_power("11").is_err());
        assert_eq!(parse_power("2.5").unwrap(), 2.5);
        assert!(parse_noise("-1").is_err());
        assert_eq!(parse_noise("400").unwrap(), 400.0);
    }

    #[test]
    fn parses_curve_names() {
        assert_eq!(parse_curve("linear").unwrap(), TransitionCurve::Linear);
        assert_eq!(parse_curve("Smoothstep").unwrap(), TransitionCurve::Smoothstep);
        assert_eq!(parse_curve("ease-in-out").unwrap(), TransitionCurve::EaseInOut);
        assert!(parse_curve("bounce").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "spotdrift",
            "--spots",
            "6",
            "--size",
            "800x600",
            "--palette",
            "#ff2d55,#5856d6",
            "--duration",
            "2s",
        ])
        .unwrap();

        assert_eq!(cli.spots, Some(6));
        assert_eq!(cli.size, Some((800, 600)));
        assert_eq!(cli.duration, Some(Duration::from_secs(2)));
        let palette = cli.palette.unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette[0], Rgba::new(1.0, 45.0 / 255.0, 85.0 / 255.0, 1.0));
    }
}
