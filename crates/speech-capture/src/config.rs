//! Session configuration: parameter ranges, defaults and download location.
//!
//! Load order: built-in defaults, then the TOML file named by
//! `SPEECH_CAPTURE_CONFIG` (default `config/speech_capture`), then environment
//! variables prefixed `SPEECH_CAPTURE__` (e.g. `SPEECH_CAPTURE__RATE__MAX=4`).

use crate::error::{SessionError, SessionResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Inclusive bounds for one speech parameter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range. Non-finite input yields `fallback` (itself clamped).
    pub fn clamp(&self, value: f32, fallback: f32) -> f32 {
        let v = if value.is_finite() { value } else { fallback };
        v.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Configuration for a playback/capture session controller
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Speech rate bounds (default 0.1–10.0)
    pub rate: ParamRange,
    /// Pitch bounds (default 0.0–2.0)
    pub pitch: ParamRange,
    /// Volume bounds; must stay within 0.0–1.0
    pub volume: ParamRange,

    /// Used when a request leaves the rate unset (default 1.0)
    pub default_rate: f32,
    pub default_pitch: f32,
    pub default_volume: f32,

    /// File name for saved artifacts (default `speech.wav`)
    pub download_file_name: String,
    /// Directory for saved artifacts (default `.`)
    pub download_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rate: ParamRange::new(0.1, 10.0),
            pitch: ParamRange::new(0.0, 2.0),
            volume: ParamRange::new(0.0, 1.0),
            default_rate: 1.0,
            default_pitch: 1.0,
            default_volume: 1.0,
            download_file_name: "speech.wav".to_string(),
            download_dir: PathBuf::from("."),
        }
    }
}

impl SessionConfig {
    /// Load config from file and environment. Precedence: env > `SPEECH_CAPTURE_CONFIG` file > defaults.
    pub fn load() -> SessionResult<Self> {
        let config_path = std::env::var("SPEECH_CAPTURE_CONFIG")
            .unwrap_or_else(|_| "config/speech_capture".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`SessionConfig::load`] with an explicit file path (the file is optional).
    pub fn load_from(path: &Path) -> SessionResult<Self> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("rate.min", d.rate.min as f64)?
            .set_default("rate.max", d.rate.max as f64)?
            .set_default("pitch.min", d.pitch.min as f64)?
            .set_default("pitch.max", d.pitch.max as f64)?
            .set_default("volume.min", d.volume.min as f64)?
            .set_default("volume.max", d.volume.max as f64)?
            .set_default("default_rate", d.default_rate as f64)?
            .set_default("default_pitch", d.default_pitch as f64)?
            .set_default("default_volume", d.default_volume as f64)?
            .set_default("download_file_name", d.download_file_name.as_str())?
            .set_default("download_dir", ".")?;

        let builder = builder.add_source(config::File::from(path).required(false));

        let built = builder
            .add_source(config::Environment::with_prefix("SPEECH_CAPTURE").separator("__"))
            .build()?;

        let loaded: Self = built.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject inverted ranges and a volume range wider than 0.0–1.0.
    pub fn validate(&self) -> SessionResult<()> {
        for (name, range) in [("rate", self.rate), ("pitch", self.pitch), ("volume", self.volume)] {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(SessionError::Config(format!(
                    "{} range is invalid ({}..={})",
                    name, range.min, range.max
                )));
            }
        }
        for (name, value) in [
            ("default_rate", self.default_rate),
            ("default_pitch", self.default_pitch),
            ("default_volume", self.default_volume),
        ] {
            if !value.is_finite() {
                return Err(SessionError::Config(format!("{} must be a finite number (got {})", name, value)));
            }
        }
        if self.volume.min < 0.0 || self.volume.max > 1.0 {
            return Err(SessionError::Config(format!(
                "volume range must lie within 0.0..=1.0 (got {}..={})",
                self.volume.min, self.volume.max
            )));
        }
        if self.download_file_name.trim().is_empty() {
            return Err(SessionError::Config("download_file_name is empty".to_string()));
        }
        Ok(())
    }

    /// Full path an artifact is saved to.
    pub fn download_path(&self) -> PathBuf {
        self.download_dir.join(&self.download_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.download_path(), PathBuf::from("./speech.wav"));
    }

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        let range = ParamRange::new(0.0, 1.0);
        assert_eq!(range.clamp(1.7, 1.0), 1.0);
        assert_eq!(range.clamp(-0.2, 1.0), 0.0);
        assert_eq!(range.clamp(f32::NAN, 0.5), 0.5);
        assert_eq!(range.clamp(f32::INFINITY, 0.5), 0.5);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let config = SessionConfig {
            pitch: ParamRange::new(2.0, 0.0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn volume_above_one_is_rejected() {
        let config = SessionConfig {
            volume: ParamRange::new(0.0, 1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_finite_defaults_are_rejected() {
        let config = SessionConfig {
            default_rate: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        let config = SessionConfig {
            default_volume: f32::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = SessionConfig::load_from(Path::new("does/not/exist/speech_capture"))
            .expect("defaults should load");
        assert_eq!(config.rate, ParamRange::new(0.1, 10.0));
        assert_eq!(config.download_file_name, "speech.wav");
    }
}
