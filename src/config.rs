use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::compare::DEFAULT_TOLERANCE;
use crate::dsp::pitch::{DetectionMode, PitchConfig};
use crate::paths;

/// Application configuration, loaded from $XDG_CONFIG_HOME/pitchmatch/config.toml.
///
/// Every section is `#[serde(default)]`, so a config file only needs the
/// values it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub detection: DetectionConfig,
    pub comparison: ComparisonConfig,
    pub contour: ContourDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Everything is resampled to this rate before analysis.
    pub sample_rate: u32,
    /// Trim, normalize and pre-emphasise before whole-file analysis.
    pub preprocess: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub method: DetectionMode,
    pub pitch_floor_hz: f32,
    pub pitch_ceiling_hz: f32,
    pub window_size: usize,
    pub hop_size: usize,
    pub silence_floor_db: f32,
    pub yin_threshold: f32,
    pub min_confidence: f32,
    pub disagreement_penalty: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Relative tolerance for "same pitch", e.g. 0.05 = 5%.
    pub tolerance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourDefaults {
    pub frame_size_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            preprocess: true,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let pitch = PitchConfig::default();
        Self {
            method: DetectionMode::Multi,
            pitch_floor_hz: pitch.pitch_floor_hz,
            pitch_ceiling_hz: pitch.pitch_ceiling_hz,
            window_size: pitch.window_size,
            hop_size: pitch.hop_size,
            silence_floor_db: pitch.silence_floor_db,
            yin_threshold: pitch.yin_threshold,
            min_confidence: pitch.min_confidence,
            disagreement_penalty: pitch.disagreement_penalty,
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Default for ContourDefaults {
    fn default() -> Self {
        Self {
            frame_size_secs: 0.1,
        }
    }
}

/// Bridge from the user-facing config to the parameters the DSP code takes.
impl From<&DetectionConfig> for PitchConfig {
    fn from(cfg: &DetectionConfig) -> Self {
        PitchConfig {
            pitch_floor_hz: cfg.pitch_floor_hz,
            pitch_ceiling_hz: cfg.pitch_ceiling_hz,
            window_size: cfg.window_size,
            hop_size: cfg.hop_size,
            silence_floor_db: cfg.silence_floor_db,
            yin_threshold: cfg.yin_threshold,
            min_confidence: cfg.min_confidence,
            disagreement_penalty: cfg.disagreement_penalty,
            ..PitchConfig::default()
        }
    }
}

impl AppConfig {
    pub fn pitch_config(&self) -> PitchConfig {
        (&self.detection).into()
    }

    /// Reject values the analysis code can't work with.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if !(d.pitch_floor_hz > 0.0 && d.pitch_floor_hz < d.pitch_ceiling_hz) {
            bail!(
                "detection.pitch_floor_hz ({}) must be positive and below pitch_ceiling_hz ({})",
                d.pitch_floor_hz,
                d.pitch_ceiling_hz
            );
        }
        if d.pitch_ceiling_hz >= self.audio.sample_rate as f32 / 2.0 {
            bail!(
                "detection.pitch_ceiling_hz ({}) must be below the Nyquist frequency ({})",
                d.pitch_ceiling_hz,
                self.audio.sample_rate / 2
            );
        }
        if d.window_size == 0 || d.hop_size == 0 {
            bail!("detection.window_size and detection.hop_size must be positive");
        }
        let min_window = self.pitch_config().min_window(self.audio.sample_rate);
        if d.window_size < min_window {
            bail!(
                "detection.window_size ({}) must cover two periods of pitch_floor_hz ({} samples at {} Hz)",
                d.window_size,
                min_window,
                self.audio.sample_rate
            );
        }
        if !(0.0..=1.0).contains(&d.min_confidence) {
            bail!("detection.min_confidence must be within 0-1, got {}", d.min_confidence);
        }
        if !(self.comparison.tolerance >= 0.0) {
            bail!("comparison.tolerance must be non-negative, got {}", self.comparison.tolerance);
        }
        if !(self.contour.frame_size_secs > 0.0) {
            bail!("contour.frame_size_secs must be positive, got {}", self.contour.frame_size_secs);
        }
        Ok(())
    }
}

/// Load the application config from $XDG_CONFIG_HOME/pitchmatch/config.toml.
/// If the file doesn't exist, returns defaults.
pub fn load_config() -> Result<AppConfig> {
    let path = paths::config_file();

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.audio.sample_rate, 22050);
        assert_eq!(cfg.detection.method, DetectionMode::Multi);
        assert_eq!(cfg.comparison.tolerance, 0.05);
        assert_eq!(cfg.contour.frame_size_secs, 0.1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        // If the user only specifies some fields, the rest should use defaults
        let toml_str = r#"
[detection]
method = "yin"
pitch_floor_hz = 60.0
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.detection.method, DetectionMode::Yin);
        assert_eq!(cfg.detection.pitch_floor_hz, 60.0);
        assert_eq!(cfg.detection.pitch_ceiling_hz, 2000.0);
        assert_eq!(cfg.audio.sample_rate, 22050);
    }

    #[test]
    fn pitch_config_conversion() {
        let mut cfg = AppConfig::default();
        cfg.detection.hop_size = 256;
        let pitch = cfg.pitch_config();
        assert_eq!(pitch.hop_size, 256);
        assert_eq!(pitch.pitch_floor_hz, 80.0);
        assert_eq!(pitch.clarity_threshold, PitchConfig::default().clarity_threshold);
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.detection.pitch_floor_hz, cfg.detection.pitch_floor_hz);
        assert_eq!(loaded.detection.method, cfg.detection.method);
    }

    #[test]
    fn validate_rejects_bad_band() {
        let mut cfg = AppConfig::default();
        cfg.detection.pitch_floor_hz = 3000.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.audio.sample_rate = 2000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_window_shorter_than_two_floor_periods() {
        let mut cfg = AppConfig::default();
        cfg.detection.window_size = 551;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("552 samples"));

        cfg.detection.window_size = 552;
        assert!(cfg.validate().is_ok());

        // A lower floor needs a longer window.
        cfg.detection.pitch_floor_hz = 60.0;
        assert!(cfg.validate().is_err());
    }
}
