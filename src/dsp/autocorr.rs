use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::pitch::{Estimator, Method, PitchConfig};

/// Autocorrelation estimator backed by the McLeod Pitch Method.
///
/// McLeod computes a normalized square difference function, which is an
/// autocorrelation normalized by the energy of the overlapping parts of the
/// signal. Its peak value at the period ("clarity") is 1.0 for a perfectly
/// periodic signal and falls towards 0.0 for noise, so it doubles as the
/// confidence score.
pub struct Autocorrelation;

impl Estimator for Autocorrelation {
    fn method(&self) -> Method {
        Method::Autocorr
    }

    fn detect(&self, window: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<(f32, f32)> {
        // The detector's FFT only gets enough scratch space at power-of-two
        // sizes, so the window is zero-padded up to one. Trailing zeros leave
        // the normalized square difference unchanged at every lag we search.
        let size = window.len().next_power_of_two();
        let padding = size;

        let mut signal: Vec<f64> = window.iter().map(|&s| s as f64).collect();
        signal.resize(size, 0.0);

        let mut detector = McLeodDetector::new(size, padding);
        let pitch = detector.get_pitch(
            &signal,
            sample_rate as usize,
            config.power_threshold,
            config.clarity_threshold,
        )?;

        Some((pitch.frequency as f32, pitch.clarity as f32))
    }
}
