//! Signal conditioning between the decoder and the pitch engine.

use log::debug;

use crate::dsp::windowing;

/// Frames quieter than this many dB below the loudest frame count as silence
/// when trimming.
pub const TRIM_TOP_DB: f32 = 20.0;

/// Pre-emphasis coefficient: y[n] = x[n] - 0.97·x[n-1].
pub const PREEMPHASIS: f32 = 0.97;

const TRIM_FRAME: usize = 2048;
const TRIM_HOP: usize = 512;

/// A trim that would leave less than this (seconds) is discarded.
const MIN_TRIMMED_SECS: f32 = 0.1;

/// Average interleaved channels down to mono.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let n = channels as usize;
    interleaved
        .chunks_exact(n)
        .map(|frame| frame.iter().sum::<f32>() / n as f32)
        .collect()
}

/// Resample with linear interpolation. Same-rate input is returned as is.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let next = samples[(idx + 1).min(last)];
            samples[idx] + (next - samples[idx]) * frac
        })
        .collect()
}

/// Drop leading and trailing frames more than `top_db` below the loudest
/// frame. Returns the input unchanged when the trimmed audio would be
/// shorter than 0.1 s.
pub fn trim_silence(samples: &[f32], sample_rate: u32, top_db: f32) -> Vec<f32> {
    let frames = windowing::analysis_windows(samples.len(), TRIM_FRAME, TRIM_HOP);
    let levels: Vec<f32> = frames
        .iter()
        .map(|r| crate::util::rms_db(&samples[r.clone()]))
        .collect();

    let loudest = levels.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !loudest.is_finite() {
        return samples.to_vec();
    }

    let threshold = loudest - top_db;
    let first = levels.iter().position(|&l| l > threshold);
    let last = levels.iter().rposition(|&l| l > threshold);

    let (Some(first), Some(last)) = (first, last) else {
        return samples.to_vec();
    };

    let start = frames[first].start;
    let end = frames[last].end;
    let min_len = (MIN_TRIMMED_SECS * sample_rate as f32) as usize;
    if end - start < min_len {
        return samples.to_vec();
    }

    debug!("trimmed {} of {} samples", samples.len() - (end - start), samples.len());
    samples[start..end].to_vec()
}

/// Scale so the largest magnitude is 1.0. Silence is left alone.
pub fn normalize(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
    if peak == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|&s| s / peak).collect()
}

/// First-order high-frequency boost.
pub fn preemphasis(samples: &[f32], coefficient: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev = 0.0;
    for &s in samples {
        out.push(s - coefficient * prev);
        prev = s;
    }
    out
}

/// Full chain used before whole-file analysis: trim, normalize, pre-emphasis.
pub fn preprocess(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let trimmed = trim_silence(samples, sample_rate, TRIM_TOP_DB);
    preemphasis(&normalize(&trimmed), PREEMPHASIS)
}
