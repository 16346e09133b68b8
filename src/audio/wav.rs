use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use serde::Serialize;

use super::buffer::SampleBuffer;
use super::preprocess;

/// Extensions recognised as audio. Only WAV is decoded by this build.
const SUPPORTED_FORMATS: [&str; 7] = ["wav", "mp3", "flac", "m4a", "aac", "ogg", "wma"];

/// What the file header says, before any resampling or downmixing.
#[derive(Debug, Clone, Serialize)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frames: u32,
    pub duration_secs: f32,
}

pub fn supported_formats() -> &'static [&'static str] {
    &SUPPORTED_FORMATS
}

/// Whether the file extension is one of the recognised audio formats.
pub fn is_supported_format(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_FORMATS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Fail early with a clear message for files this build can't decode.
pub fn check_format(path: &Path) -> Result<()> {
    match extension(path).as_deref() {
        Some("wav") => Ok(()),
        Some(ext) if is_supported_format(path) => anyhow::bail!(
            "{}: .{ext} decoding is not supported by this build, convert to WAV first",
            path.display()
        ),
        _ => anyhow::bail!(
            "Unsupported audio format: {} (expected one of: {})",
            path.display(),
            SUPPORTED_FORMATS.join(", ")
        ),
    }
}

/// Standard WAV spec for files we write: mono 16-bit PCM.
pub fn recording_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Create a WavWriter at the given path, creating parent directories as needed.
pub fn create_writer(path: &Path, spec: WavSpec) -> Result<WavWriter<std::io::BufWriter<std::fs::File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))
}

/// Write a buffer as mono 16-bit PCM, clipping to [-1.0, 1.0].
pub fn write_buffer(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let mut writer = create_writer(path, recording_spec(buffer.sample_rate()))?;
    for &sample in buffer.samples() {
        let s16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(s16)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))
}

/// Load all samples from a WAV file as f32 in [-1.0, 1.0].
/// Samples stay interleaved; returns the spec so callers can read the
/// channel count and sample rate.
pub fn load_samples(path: &Path) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    Ok((samples, spec))
}

/// Read the header of a WAV file without decoding its samples.
pub fn probe(path: &Path) -> Result<AudioInfo> {
    check_format(path)?;
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames,
        duration_secs: frames as f32 / spec.sample_rate.max(1) as f32,
    })
}

/// Load a file as a mono buffer at `target_rate`.
///
/// Multi-channel audio is averaged down to mono; other rates are resampled
/// with linear interpolation.
pub fn load_buffer(path: &Path, target_rate: u32) -> Result<SampleBuffer> {
    check_format(path)?;
    let (samples, spec) = load_samples(path)?;

    let mono = preprocess::downmix(&samples, spec.channels);
    let resampled = preprocess::resample(&mono, spec.sample_rate, target_rate);
    debug!(
        "loaded {}: {} Hz x{} -> {} samples at {target_rate} Hz",
        path.display(),
        spec.sample_rate,
        spec.channels,
        resampled.len()
    );

    Ok(SampleBuffer::new(resampled, target_rate))
}
