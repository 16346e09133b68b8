use super::pitch::{parabolic_offset, Estimator, Method, PitchConfig};

/// YIN fundamental frequency estimator (de Cheveigné & Kawahara, 2002).
///
/// Steps per window:
///   1. Squared difference d(τ) between the signal and a copy shifted by τ
///   2. Cumulative mean normalization: d'(τ) = d(τ) * τ / Σ d(1..=τ)
///   3. Absolute threshold: the first τ in the band whose d'(τ) dips below
///      the threshold, followed down to the bottom of that dip
///   4. Parabolic interpolation around the chosen τ
///
/// Taking the first dip rather than the global minimum keeps YIN on the
/// fundamental: the dip at twice the period is often marginally deeper.
pub struct Yin;

impl Estimator for Yin {
    fn method(&self) -> Method {
        Method::Yin
    }

    fn detect(&self, window: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<(f32, f32)> {
        let (min_lag, max_lag) = config.lag_range(sample_rate);
        // One extra lag so the parabola at max_lag has a right neighbour.
        let last_lag = max_lag + 1;
        if window.len() <= last_lag + min_lag {
            return None;
        }

        let cmndf = cumulative_mean_normalized_difference(window, last_lag);
        let tau = absolute_threshold(&cmndf, min_lag, max_lag, config.yin_threshold)
            .or_else(|| global_minimum(&cmndf, min_lag, max_lag))?;

        let offset = parabolic_offset(cmndf[tau - 1], cmndf[tau], cmndf[tau + 1]);
        let period = tau as f32 + offset;
        if period <= 0.0 {
            return None;
        }

        let confidence = 1.0 - cmndf[tau];
        Some((sample_rate as f32 / period, confidence))
    }
}

/// d'(τ) for τ in 0..=last_lag. d'(0) is defined as 1.
fn cumulative_mean_normalized_difference(signal: &[f32], last_lag: usize) -> Vec<f32> {
    let width = signal.len() - last_lag;
    let mut cmndf = vec![1.0_f32; last_lag + 1];
    let mut running_sum = 0.0_f64;

    for tau in 1..=last_lag {
        let diff: f64 = signal[..width]
            .iter()
            .zip(&signal[tau..tau + width])
            .map(|(&a, &b)| {
                let delta = (a - b) as f64;
                delta * delta
            })
            .sum();

        running_sum += diff;
        cmndf[tau] = if running_sum > 0.0 {
            (diff * tau as f64 / running_sum) as f32
        } else {
            1.0
        };
    }

    cmndf
}

/// First lag under `threshold`, walked down to the local minimum of its dip.
fn absolute_threshold(cmndf: &[f32], min_lag: usize, max_lag: usize, threshold: f32) -> Option<usize> {
    let mut tau = min_lag;
    while tau <= max_lag {
        if cmndf[tau] < threshold {
            while tau < max_lag && cmndf[tau + 1] < cmndf[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }
    None
}

/// Lowest d'(τ) in the band. Only used when nothing crosses the threshold,
/// so the confidence that comes with it is low by construction.
fn global_minimum(cmndf: &[f32], min_lag: usize, max_lag: usize) -> Option<usize> {
    (min_lag..=max_lag).min_by(|&a, &b| cmndf[a].total_cmp(&cmndf[b]))
}
