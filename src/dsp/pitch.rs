use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::fusion::{self, FusedPitchResult};
use super::{autocorr, spectral, windowing, yin};
use crate::error::{PitchError, Result};
use crate::util;

/// A single-algorithm fundamental frequency estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Normalized autocorrelation (McLeod pitch method).
    Autocorr,
    /// Cumulative mean normalized difference with an absolute threshold.
    Yin,
    /// Strongest in-band bin of a zero-padded magnitude spectrum.
    SpectralPeak,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Autocorr => "autocorrelation",
            Method::Yin => "YIN",
            Method::SpectralPeak => "spectral peak",
        };
        f.write_str(name)
    }
}

/// Which estimators a detection runs.
///
/// `Multi` runs every estimator and fuses them; the others run one method
/// and report `AlgorithmUnavailable` when it can't analyse the buffer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    #[default]
    Multi,
    /// Spectral peak picking only.
    Piptrack,
    Yin,
    Autocorr,
}

impl DetectionMode {
    /// Estimators run by this mode, in reporting order.
    pub fn methods(self) -> &'static [Method] {
        match self {
            DetectionMode::Multi => &[Method::SpectralPeak, Method::Yin, Method::Autocorr],
            DetectionMode::Piptrack => &[Method::SpectralPeak],
            DetectionMode::Yin => &[Method::Yin],
            DetectionMode::Autocorr => &[Method::Autocorr],
        }
    }

    pub fn is_single(self) -> bool {
        self != DetectionMode::Multi
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMode::Multi => "multi",
            DetectionMode::Piptrack => "piptrack",
            DetectionMode::Yin => "yin",
            DetectionMode::Autocorr => "autocorr",
        };
        f.write_str(name)
    }
}

/// Output of one estimator over one buffer.
/// `frequency_hz` is `None` when the estimator found no pitch in the band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchEstimate {
    pub frequency_hz: Option<f32>,
    pub confidence: f32,
    pub method: Method,
}

impl PitchEstimate {
    pub fn unvoiced(method: Method) -> Self {
        Self {
            frequency_hz: None,
            confidence: 0.0,
            method,
        }
    }

    pub fn voiced(method: Method, frequency_hz: f32, confidence: f32) -> Self {
        Self {
            frequency_hz: Some(frequency_hz),
            confidence: clamp_unit(confidence),
            method,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.frequency_hz.is_some()
    }
}

/// Parameters shared by every estimator and by fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchConfig {
    /// Lowest frequency reported as voiced.
    pub pitch_floor_hz: f32,

    /// Highest frequency reported as voiced.
    pub pitch_ceiling_hz: f32,

    /// Analysis window length in samples for whole-buffer detection.
    pub window_size: usize,

    /// Advance between analysis windows in samples.
    pub hop_size: usize,

    /// Windows quieter than this RMS level (dBFS) are treated as silence.
    pub silence_floor_db: f32,

    /// YIN absolute threshold on the normalized difference function.
    pub yin_threshold: f32,

    /// McLeod power threshold (sum of squared samples).
    pub power_threshold: f64,

    /// McLeod clarity threshold used to pick the fundamental peak.
    pub clarity_threshold: f64,

    /// FFT length is at least this many times the window length.
    pub zero_pad_factor: usize,

    /// Estimates below this confidence are ignored by fusion.
    pub min_confidence: f32,

    /// Subtracted from the fused confidence when contributors disagree by
    /// more than a semitone.
    pub disagreement_penalty: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            pitch_floor_hz: 80.0,
            pitch_ceiling_hz: 2000.0,
            window_size: 2048,
            hop_size: 512,
            silence_floor_db: -60.0,
            yin_threshold: 0.1,
            power_threshold: 0.1,
            clarity_threshold: 0.7,
            zero_pad_factor: 4,
            min_confidence: 0.2,
            disagreement_penalty: 0.25,
        }
    }
}

/// Relative slack on each side of the band. Estimators search the widened
/// band and results inside the slack are clamped onto the nearest edge.
const BAND_EDGE_SLACK: f32 = 0.01;

impl PitchConfig {
    pub fn in_band(&self, frequency: f32) -> bool {
        frequency.is_finite()
            && frequency >= self.pitch_floor_hz
            && frequency <= self.pitch_ceiling_hz
    }

    /// Shortest slice any estimator will analyse: two periods of the floor.
    pub fn min_window(&self, sample_rate: u32) -> usize {
        (2.0 * sample_rate as f32 / self.pitch_floor_hz).ceil() as usize
    }

    /// The band widened by the edge slack, as (low, high) Hz.
    pub fn search_band(&self) -> (f32, f32) {
        (
            self.pitch_floor_hz / (1.0 + BAND_EDGE_SLACK),
            self.pitch_ceiling_hz * (1.0 + BAND_EDGE_SLACK),
        )
    }

    /// An estimate inside the search band, clamped into the band.
    /// `None` for anything further out.
    pub fn fit_to_band(&self, frequency: f32) -> Option<f32> {
        let (low, high) = self.search_band();
        (frequency.is_finite() && frequency >= low && frequency <= high)
            .then(|| frequency.clamp(self.pitch_floor_hz, self.pitch_ceiling_hz))
    }

    /// Lag range in samples covering the search band.
    pub fn lag_range(&self, sample_rate: u32) -> (usize, usize) {
        let sr = sample_rate as f32;
        let (low, high) = self.search_band();
        let min_lag = ((sr / high).floor() as usize).max(2);
        let max_lag = (sr / low).ceil() as usize;
        (min_lag, max_lag.max(min_lag + 1))
    }
}

/// A fundamental frequency estimator working on one analysis window.
pub trait Estimator {
    fn method(&self) -> Method;

    /// Raw (frequency, confidence) for a window that passed the silence and
    /// length gates, or `None` when no period was found.
    fn detect(&self, window: &[f32], sample_rate: u32, config: &PitchConfig)
        -> Option<(f32, f32)>;

    /// Estimate one window. Too-short or silent windows and out-of-band
    /// results come back unvoiced, never as errors.
    fn estimate(&self, window: &[f32], sample_rate: u32, config: &PitchConfig) -> PitchEstimate {
        if window.len() < config.min_window(sample_rate)
            || util::rms_db(window) < config.silence_floor_db
        {
            return PitchEstimate::unvoiced(self.method());
        }

        self.detect(window, sample_rate, config)
            .and_then(|(frequency, confidence)| {
                config
                    .fit_to_band(frequency)
                    .map(|f| PitchEstimate::voiced(self.method(), f, confidence))
            })
            .unwrap_or_else(|| PitchEstimate::unvoiced(self.method()))
    }
}

/// The estimator implementing `method`.
pub fn estimator(method: Method) -> &'static dyn Estimator {
    match method {
        Method::Autocorr => &autocorr::Autocorrelation,
        Method::Yin => &yin::Yin,
        Method::SpectralPeak => &spectral::SpectralPeak,
    }
}

/// Estimate the pitch of a whole buffer with one estimator.
///
/// The buffer is cut into analysis windows; the result is the median voiced
/// frequency, with the mean voiced confidence scaled by the fraction of
/// windows that were voiced.
pub fn estimate_buffer(
    estimator: &dyn Estimator,
    samples: &[f32],
    sample_rate: u32,
    config: &PitchConfig,
) -> PitchEstimate {
    let windows = windowing::analysis_windows(samples.len(), config.window_size, config.hop_size);
    let estimates: Vec<PitchEstimate> = windows
        .into_iter()
        .map(|range| estimator.estimate(&samples[range], sample_rate, config))
        .collect();

    summarize_windows(estimator.method(), &estimates)
}

fn summarize_windows(method: Method, estimates: &[PitchEstimate]) -> PitchEstimate {
    let mut voiced: Vec<(f32, f32)> = estimates
        .iter()
        .filter_map(|e| e.frequency_hz.map(|f| (f, e.confidence)))
        .collect();

    if voiced.is_empty() {
        return PitchEstimate::unvoiced(method);
    }

    voiced.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mid = voiced.len() / 2;
    let median = if voiced.len() % 2 == 0 {
        (voiced[mid - 1].0 + voiced[mid].0) / 2.0
    } else {
        voiced[mid].0
    };

    let mean_confidence = voiced.iter().map(|v| v.1).sum::<f32>() / voiced.len() as f32;
    let voiced_fraction = voiced.len() as f32 / estimates.len() as f32;

    PitchEstimate::voiced(method, median, mean_confidence * voiced_fraction)
}

/// Detect the pitch of a buffer with every estimator `mode` selects, then fuse.
///
/// Single-method modes fail with `AlgorithmUnavailable` on a buffer shorter
/// than the minimum analysis window; `Multi` skips such estimators and ends up
/// unvoiced instead.
pub fn detect_pitch(
    samples: &[f32],
    sample_rate: u32,
    mode: DetectionMode,
    config: &PitchConfig,
) -> Result<FusedPitchResult> {
    let needed = config.min_window(sample_rate);
    let mut estimates = Vec::with_capacity(mode.methods().len());

    for &method in mode.methods() {
        if samples.len() < needed {
            if mode.is_single() {
                return Err(PitchError::AlgorithmUnavailable {
                    method,
                    needed,
                    available: samples.len(),
                });
            }
            debug!(
                "skipping {method}: {} samples, needs {needed}",
                samples.len()
            );
            continue;
        }

        let estimate = estimate_buffer(estimator(method), samples, sample_rate, config);
        debug!(
            "{method}: {:?} Hz (confidence {:.2})",
            estimate.frequency_hz, estimate.confidence
        );
        estimates.push(estimate);
    }

    Ok(fusion::fuse(&estimates, config))
}

/// Offset of the vertex of the parabola through three equally spaced points,
/// relative to the middle one, in [-1, 1].
pub(crate) fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-1.0, 1.0)
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    const SR: u32 = 22050;
    const TEST_FREQUENCIES: [f32; 8] = [80.0, 90.0, 110.0, 261.63, 440.0, 987.77, 1760.0, 2000.0];

    #[test]
    fn each_method_tracks_sines_within_one_percent() {
        let config = PitchConfig::default();
        for &freq in &TEST_FREQUENCIES {
            let samples = synth::sine(freq, SR, 0.5, 0.5);
            for &method in DetectionMode::Multi.methods() {
                let est = estimate_buffer(estimator(method), &samples, SR, &config);
                let detected = est
                    .frequency_hz
                    .unwrap_or_else(|| panic!("{method} found no pitch at {freq} Hz"));
                assert!(
                    (detected - freq).abs() / freq < 0.01,
                    "{method} at {freq} Hz detected {detected:.2} Hz"
                );
                assert!(
                    est.confidence > 0.8,
                    "{method} at {freq} Hz had confidence {:.2}",
                    est.confidence
                );
            }
        }
    }

    #[test]
    fn silence_is_unvoiced_for_every_method() {
        let config = PitchConfig::default();
        let samples = vec![0.0; SR as usize];
        for &method in DetectionMode::Multi.methods() {
            let est = estimate_buffer(estimator(method), &samples, SR, &config);
            assert_eq!(est.frequency_hz, None, "{method} should be unvoiced");
            assert_eq!(est.confidence, 0.0);
        }

        let fused = detect_pitch(&samples, SR, DetectionMode::Multi, &config).unwrap();
        assert!(!fused.is_voiced());
        assert_eq!(fused.confidence, 0.0);
    }

    #[test]
    fn short_buffer_is_unvoiced_not_error_at_estimator_level() {
        let config = PitchConfig::default();
        let samples = synth::sine(440.0, SR, 0.01, 0.5);
        let est = estimator(Method::Yin).estimate(&samples, SR, &config);
        assert!(!est.is_voiced());
        assert_eq!(est.confidence, 0.0);
    }

    #[test]
    fn single_method_reports_unavailable_on_short_buffer() {
        let config = PitchConfig::default();
        let samples = synth::sine(440.0, SR, 0.01, 0.5);
        let err = detect_pitch(&samples, SR, DetectionMode::Yin, &config).unwrap_err();
        assert!(matches!(
            err,
            PitchError::AlgorithmUnavailable {
                method: Method::Yin,
                ..
            }
        ));
    }

    #[test]
    fn multi_mode_degrades_on_short_buffer() {
        let config = PitchConfig::default();
        let samples = synth::sine(440.0, SR, 0.01, 0.5);
        let fused = detect_pitch(&samples, SR, DetectionMode::Multi, &config).unwrap();
        assert!(!fused.is_voiced());
        assert!(fused.contributing_estimates.is_empty());
    }

    #[test]
    fn multi_mode_fuses_all_methods() {
        let config = PitchConfig::default();
        let samples = synth::sine(440.0, SR, 0.5, 0.5);
        let fused = detect_pitch(&samples, SR, DetectionMode::Multi, &config).unwrap();
        let freq = fused.frequency_hz.unwrap();
        assert!((freq - 440.0).abs() < 4.4, "fused {freq:.2} Hz");
        assert_eq!(fused.contributing_estimates.len(), 3);
        assert!(fused.confidence > 0.8);
    }

    #[test]
    fn out_of_band_tone_is_unvoiced() {
        let config = PitchConfig::default();
        let samples = synth::sine(50.0, SR, 0.5, 0.5);
        let est = estimate_buffer(estimator(Method::Yin), &samples, SR, &config);
        assert!(
            est.frequency_hz.map_or(true, |f| config.in_band(f)),
            "reported frequency must stay in band"
        );
    }

    #[test]
    fn median_ignores_unvoiced_windows() {
        let estimates = [
            PitchEstimate::voiced(Method::Yin, 200.0, 0.9),
            PitchEstimate::unvoiced(Method::Yin),
            PitchEstimate::voiced(Method::Yin, 210.0, 0.9),
            PitchEstimate::voiced(Method::Yin, 205.0, 0.9),
        ];
        let summary = summarize_windows(Method::Yin, &estimates);
        assert_eq!(summary.frequency_hz, Some(205.0));
        assert!((summary.confidence - 0.675).abs() < 1e-4);
    }

    #[test]
    fn parabolic_offset_finds_vertex() {
        // y = (x - 0.25)^2 sampled at -1, 0, 1
        let offset = parabolic_offset(1.5625, 0.0625, 0.5625);
        assert!((offset - 0.25).abs() < 1e-5);
        assert_eq!(parabolic_offset(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(PitchEstimate::voiced(Method::Yin, 100.0, 1.7).confidence, 1.0);
        assert_eq!(PitchEstimate::voiced(Method::Yin, 100.0, -0.2).confidence, 0.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }

    #[test]
    fn lag_range_covers_band() {
        let config = PitchConfig::default();
        let (min_lag, max_lag) = config.lag_range(SR);
        assert_eq!(min_lag, 10);
        assert_eq!(max_lag, 279);
        assert_eq!(config.min_window(SR), 552);
    }

    #[test]
    fn band_edges_are_clamped_not_dropped() {
        let config = PitchConfig::default();
        assert_eq!(config.fit_to_band(2003.0), Some(2000.0));
        assert_eq!(config.fit_to_band(79.6), Some(80.0));
        assert_eq!(config.fit_to_band(440.0), Some(440.0));
        assert_eq!(config.fit_to_band(2100.0), None);
        assert_eq!(config.fit_to_band(70.0), None);
        assert_eq!(config.fit_to_band(f32::NAN), None);
    }

    #[test]
    fn band_edge_tones_fuse_to_the_edge() {
        let config = PitchConfig::default();
        for freq in [80.0, 2000.0] {
            let samples = synth::sine(freq, SR, 0.5, 0.5);
            let fused = detect_pitch(&samples, SR, DetectionMode::Multi, &config).unwrap();
            let detected = fused
                .frequency_hz
                .unwrap_or_else(|| panic!("no fused pitch at {freq} Hz"));
            assert!((detected - freq).abs() / freq < 0.01, "{freq} Hz fused to {detected:.2}");
            assert!(config.in_band(detected));
            assert!(fused.confidence > 0.8);
        }
    }
}
