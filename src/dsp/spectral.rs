use rustfft::{num_complex::Complex, FftPlanner};

use super::pitch::{parabolic_offset, Estimator, Method, PitchConfig};
use super::windowing;

/// Pitch from the strongest in-band peak of a zero-padded spectrum.
///
/// Algorithm per window:
/// 1. Hann window, zero-padded to at least `zero_pad_factor` times its length
/// 2. FFT -> power spectrum
/// 3. Strongest bin inside the detection band
/// 4. Parabolic interpolation on log power across the peak and its neighbours
///
/// Confidence is the share of in-band energy that sits in the peak's main
/// lobe: close to 1.0 for a clean tone, small for broadband noise.
pub struct SpectralPeak;

impl Estimator for SpectralPeak {
    fn method(&self) -> Method {
        Method::SpectralPeak
    }

    fn detect(&self, window: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<(f32, f32)> {
        let n = window.len();
        if n < 2 {
            return None;
        }

        let fft_size = (n * config.zero_pad_factor.max(1)).next_power_of_two();
        let power = power_spectrum(window, fft_size);

        let bin_hz = sample_rate as f32 / fft_size as f32;
        let (low_hz, high_hz) = config.search_band();
        let lo = ((low_hz / bin_hz).floor() as usize).max(1);
        let hi = ((high_hz / bin_hz).ceil() as usize).min(power.len() - 2);
        if lo >= hi {
            return None;
        }

        let peak = (lo..=hi).max_by(|&a, &b| power[a].total_cmp(&power[b]))?;
        let total: f32 = power[lo..=hi].iter().sum();
        if total <= 0.0 || power[peak] <= 0.0 {
            return None;
        }

        // Hann main lobe spans ±2 bins of the unpadded resolution.
        let lobe = (2 * fft_size).div_ceil(n);
        let lobe_start = peak.saturating_sub(lobe).max(lo);
        let lobe_end = (peak + lobe).min(hi);
        let lobe_energy: f32 = power[lobe_start..=lobe_end].iter().sum();

        let offset = parabolic_offset(
            log_power(power[peak - 1]),
            log_power(power[peak]),
            log_power(power[peak + 1]),
        );
        let frequency = (peak as f32 + offset) * bin_hz;

        Some((frequency, lobe_energy / total))
    }
}

/// |X(k)|² for k in 0..=fft_size/2 of the Hann-windowed, zero-padded frame.
fn power_spectrum(frame: &[f32], fft_size: usize) -> Vec<f32> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let mut buf: Vec<Complex<f32>> = windowing::hanning(frame)
        .into_iter()
        .map(|s| Complex::new(s, 0.0))
        .collect();
    buf.resize(fft_size, Complex::new(0.0, 0.0));

    fft.process(&mut buf);

    buf[..=fft_size / 2].iter().map(|c| c.norm_sqr()).collect()
}

fn log_power(p: f32) -> f32 {
    p.max(1e-20).ln()
}
