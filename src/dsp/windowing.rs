use std::f32::consts::PI;
use std::ops::Range;

/// Hann window coefficients of length `n`.
///
/// w(i) = 0.5 * (1 - cos(2π * i / (n - 1)))
///
/// Zero at both edges and 1.0 at the centre, which keeps the spectral
/// estimator from smearing energy across the band when a frame cuts a cycle
/// in half.
pub fn hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }

    let scale = 2.0 * PI / (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (scale * i as f32).cos()))
        .collect()
}

/// Apply a Hann window to a slice of samples, returning a new Vec.
pub fn hanning(samples: &[f32]) -> Vec<f32> {
    samples
        .iter()
        .zip(hann(samples.len()))
        .map(|(&s, w)| s * w)
        .collect()
}

/// Split `len` samples into analysis windows of `window` samples advancing by
/// `hop`.
///
/// A buffer no longer than one window is analysed whole. Trailing samples that
/// don't fill a complete window are left out, the same way the frame loop in
/// a pitch contour stops at the last full frame.
pub fn analysis_windows(len: usize, window: usize, hop: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    if window == 0 || len <= window {
        return vec![0..len];
    }

    let hop = hop.max(1);
    let mut ranges = Vec::new();
    let mut pos = 0;
    while pos + window <= len {
        ranges.push(pos..pos + window);
        pos += hop;
    }
    ranges
}
