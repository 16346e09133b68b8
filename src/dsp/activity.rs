use serde::Serialize;

use super::windowing;

/// Configuration for energy-based voiced segment detection.
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// RMS frame length in samples.
    pub frame_size: usize,
    /// Advance between RMS frames in samples.
    pub hop_size: usize,
    /// A frame is active when its RMS exceeds this fraction of the mean RMS.
    pub relative_threshold: f32,
    /// Segments shorter than this (seconds) are dropped.
    pub min_segment_secs: f32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            relative_threshold: 0.1,
            min_segment_secs: 0.1,
        }
    }
}

/// A stretch of audio with sound in it, in seconds from the buffer start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoicedSegment {
    pub start_secs: f32,
    pub end_secs: f32,
}

impl VoicedSegment {
    pub fn duration(&self) -> f32 {
        self.end_secs - self.start_secs
    }
}

/// Find voiced segments by thresholding frame RMS against the mean RMS.
///
/// Algorithm:
/// 1. Compute RMS per frame
/// 2. Active = RMS above `relative_threshold` × mean RMS
/// 3. Merge consecutive active frames into runs, drop runs shorter than
///    `min_segment_secs`
pub fn voiced_segments(
    samples: &[f32],
    sample_rate: u32,
    config: &ActivityConfig,
) -> Vec<VoicedSegment> {
    if sample_rate == 0 {
        return Vec::new();
    }

    let frames = windowing::analysis_windows(samples.len(), config.frame_size, config.hop_size);
    let rms: Vec<f32> = frames.iter().map(|r| frame_rms(&samples[r.clone()])).collect();
    if rms.is_empty() {
        return Vec::new();
    }

    let mean = rms.iter().sum::<f32>() / rms.len() as f32;
    if mean <= 0.0 {
        return Vec::new();
    }

    let threshold = mean * config.relative_threshold;
    let active: Vec<bool> = rms.iter().map(|&r| r > threshold).collect();

    let sr = sample_rate as f32;
    active_runs(&active)
        .into_iter()
        .map(|(start, end)| {
            let start_secs = frames[start].start as f32 / sr;
            // A run that stops early ends where the next frame begins; one
            // that reaches the last frame ends with the audio it covers.
            let end_sample = if end + 1 < frames.len() {
                frames[end + 1].start
            } else {
                frames[end].end
            };
            VoicedSegment {
                start_secs,
                end_secs: end_sample as f32 / sr,
            }
        })
        .filter(|seg| seg.duration() >= config.min_segment_secs)
        .collect()
}

/// Consecutive runs of `true`, as inclusive (start, end) index pairs.
fn active_runs(flags: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;

    for (i, &active) in flags.iter().enumerate() {
        match (active, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i - 1));
                start = None;
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        runs.push((s, flags.len() - 1));
    }

    runs
}

fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    const SR: u32 = 22050;

    #[test]
    fn runs_in_middle_and_end() {
        let flags = [true, true, false, false, true, true];
        assert_eq!(active_runs(&flags), vec![(0, 1), (4, 5)]);
        assert!(active_runs(&[false, false]).is_empty());
        assert!(active_runs(&[]).is_empty());
    }

    #[test]
    fn continuous_tone_is_one_segment() {
        let samples = synth::sine(220.0, SR, 1.0, 0.5);
        let segments = voiced_segments(&samples, SR, &ActivityConfig::default());
        assert_eq!(segments.len(), 1);
        assert!(segments[0].start_secs < 0.01);
        assert!(segments[0].end_secs > 0.95);
    }

    #[test]
    fn gap_splits_segments() {
        let mut samples = synth::sine(220.0, SR, 0.5, 0.5);
        samples.extend(vec![0.0; (SR / 2) as usize]);
        samples.extend(synth::sine(330.0, SR, 0.5, 0.5));

        let segments = voiced_segments(&samples, SR, &ActivityConfig::default());
        assert_eq!(segments.len(), 2, "got {segments:?}");
        assert!(segments[0].end_secs < 0.65);
        assert!(segments[1].start_secs > 0.85);
    }

    #[test]
    fn silence_has_no_segments() {
        let samples = vec![0.0; SR as usize];
        assert!(voiced_segments(&samples, SR, &ActivityConfig::default()).is_empty());
    }

    #[test]
    fn short_blip_is_dropped() {
        let mut samples = vec![0.0; SR as usize];
        let blip = synth::sine(440.0, SR, 0.03, 0.5);
        samples[5000..5000 + blip.len()].copy_from_slice(&blip);
        let config = ActivityConfig {
            frame_size: 256,
            hop_size: 256,
            ..ActivityConfig::default()
        };
        assert!(voiced_segments(&samples, SR, &config).is_empty());
    }
}
