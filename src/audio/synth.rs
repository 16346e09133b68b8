use std::f32::consts::PI;
use std::path::Path;

use anyhow::Result;

use super::buffer::SampleBuffer;
use super::wav;

/// A pure sine wave at a known frequency.
pub fn sine(freq_hz: f32, sample_rate: u32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs).round() as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * freq_hz as f64 * t).sin() as f32
        })
        .collect()
}

/// Consecutive tones, each `step_secs` long, with continuous phase so the
/// joins don't click.
pub fn steps(freqs: &[f32], step_secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let per_step = (sample_rate as f32 * step_secs).round() as usize;
    let mut samples = Vec::with_capacity(per_step * freqs.len());
    let mut phase = 0.0_f32;

    for &freq in freqs {
        let increment = 2.0 * PI * freq / sample_rate as f32;
        for _ in 0..per_step {
            samples.push(amplitude * phase.sin());
            phase = (phase + increment) % (2.0 * PI);
        }
    }

    samples
}

/// Write a stepped tone sequence to a 16-bit WAV file.
pub fn write_tones(
    path: &Path,
    freqs: &[f32],
    step_secs: f32,
    sample_rate: u32,
    amplitude: f32,
) -> Result<SampleBuffer> {
    if freqs.is_empty() {
        anyhow::bail!("At least one frequency is required");
    }
    if step_secs <= 0.0 {
        anyhow::bail!("Step duration must be positive, got {step_secs}");
    }

    let buffer = SampleBuffer::new(steps(freqs, step_secs, sample_rate, amplitude), sample_rate);
    wav::write_buffer(path, &buffer)?;
    Ok(buffer)
}
