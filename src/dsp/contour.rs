use log::{debug, warn};
use serde::Serialize;

use super::notes;
use super::pitch::{detect_pitch, DetectionMode, PitchConfig};
use crate::audio::buffer::SampleBuffer;
use crate::error::{PitchError, Result};

/// Settings for a contour run, on top of the shared `PitchConfig`.
#[derive(Debug, Clone)]
pub struct ContourConfig {
    /// Frame length in seconds. The last frame may be shorter.
    pub frame_size_secs: f32,
    /// Reference used only when no frame is voiced.
    pub reference_hz: Option<f32>,
    pub mode: DetectionMode,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            frame_size_secs: 0.1,
            reference_hz: None,
            mode: DetectionMode::Multi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourFrame {
    pub start_time_s: f32,
    pub end_time_s: f32,
    pub frequency_hz: Option<f32>,
    pub confidence: f32,
    /// Semitones above (positive) or below the reference.
    pub semitone_interval: Option<f32>,
    pub note_name: String,
}

impl ContourFrame {
    fn silent(start_time_s: f32, end_time_s: f32) -> Self {
        Self {
            start_time_s,
            end_time_s,
            frequency_hz: None,
            confidence: 0.0,
            semitone_interval: None,
            note_name: notes::SILENT.to_string(),
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.semitone_interval.is_some()
    }
}

/// Statistics over frames that carry an interval. All zero when none do.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContourSummary {
    pub avg_frequency: f32,
    pub interval_range: f32,
    pub max_interval: f32,
    pub min_interval: f32,
    pub avg_confidence: f32,
    pub voiced_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourResult {
    pub reference_frequency_hz: Option<f32>,
    pub frames: Vec<ContourFrame>,
    pub summary: ContourSummary,
}

/// Track pitch over `[start, end)` seconds of `buffer`, frame by frame,
/// measuring each frame in semitones from a single reference.
///
/// Invalid ranges and frame sizes are errors; they are never clamped.
pub fn track_contour(
    buffer: &SampleBuffer,
    start: f32,
    end: f32,
    config: &ContourConfig,
    pitch: &PitchConfig,
) -> Result<ContourResult> {
    validate(buffer, start, end, config.frame_size_secs)?;

    let sr = buffer.sample_rate();
    let start_idx = buffer.sample_index(start);
    let end_idx = buffer.sample_index(end);
    let frame_len = ((config.frame_size_secs * sr as f32).round() as usize).max(1);

    // (start, end, detected frequency, confidence) per frame
    let mut detected = Vec::new();
    let mut from = start_idx;
    while from < end_idx {
        let to = (from + frame_len).min(end_idx);
        let samples = &buffer.samples()[from..to];
        let (t0, t1) = (from as f32 / sr as f32, to as f32 / sr as f32);

        match detect_pitch(samples, sr, config.mode, pitch) {
            Ok(fused) => detected.push((t0, t1, fused.frequency_hz, fused.confidence)),
            Err(PitchError::AlgorithmUnavailable { method, needed, available }) => {
                debug!("frame {t0:.3}s: {method} needs {needed} samples, has {available}");
                detected.push((t0, t1, None, 0.0));
            }
            Err(e) => return Err(e),
        }
        from = to;
    }

    let reference = choose_reference(config.reference_hz, pitch, &detected);

    let frames: Vec<ContourFrame> = detected
        .into_iter()
        .map(|(t0, t1, frequency, confidence)| {
            let interval =
                frequency.and_then(|f| reference.and_then(|r| notes::semitones_between(f, r)));
            match (frequency, interval) {
                (Some(f), Some(interval)) => ContourFrame {
                    start_time_s: t0,
                    end_time_s: t1,
                    frequency_hz: Some(f),
                    confidence,
                    semitone_interval: Some(interval),
                    note_name: notes::note_name(f),
                },
                _ => ContourFrame::silent(t0, t1),
            }
        })
        .collect();

    let summary = summarize(&frames);
    debug!(
        "contour: {} frames, {} voiced, reference {:?} Hz",
        frames.len(),
        summary.voiced_frames,
        reference
    );

    Ok(ContourResult {
        reference_frequency_hz: reference,
        frames,
        summary,
    })
}

fn validate(buffer: &SampleBuffer, start: f32, end: f32, frame_size: f32) -> Result<()> {
    // Negated comparisons so NaN fails too.
    if !(start < end) {
        return Err(PitchError::InvalidRange { start, end });
    }

    let span = end - start;
    if !(frame_size > 0.0 && frame_size <= span) {
        return Err(PitchError::InvalidFrameSize { frame_size, span });
    }

    let duration = buffer.duration();
    let half_sample = 0.5 / buffer.sample_rate().max(1) as f32;
    if start < 0.0 || end > duration + half_sample {
        return Err(PitchError::OutOfRange {
            start,
            end,
            duration,
        });
    }

    Ok(())
}

/// The first voiced frame; the caller's reference only when none is voiced.
fn choose_reference(
    fallback: Option<f32>,
    pitch: &PitchConfig,
    detected: &[(f32, f32, Option<f32>, f32)],
) -> Option<f32> {
    if let Some(first) = detected.iter().find_map(|&(_, _, f, _)| f) {
        return Some(first);
    }

    let hz = fallback?;
    if pitch.in_band(hz) {
        Some(hz)
    } else {
        warn!(
            "ignoring reference {hz} Hz outside {}-{} Hz",
            pitch.pitch_floor_hz, pitch.pitch_ceiling_hz
        );
        None
    }
}

fn summarize(frames: &[ContourFrame]) -> ContourSummary {
    let voiced: Vec<(f32, f32, f32)> = frames
        .iter()
        .filter_map(|f| match (f.frequency_hz, f.semitone_interval) {
            (Some(hz), Some(interval)) => Some((hz, interval, f.confidence)),
            _ => None,
        })
        .collect();

    if voiced.is_empty() {
        return ContourSummary::default();
    }

    let n = voiced.len() as f32;
    let max_interval = voiced.iter().map(|v| v.1).fold(f32::NEG_INFINITY, f32::max);
    let min_interval = voiced.iter().map(|v| v.1).fold(f32::INFINITY, f32::min);

    ContourSummary {
        avg_frequency: voiced.iter().map(|v| v.0).sum::<f32>() / n,
        interval_range: max_interval - min_interval,
        max_interval,
        min_interval,
        avg_confidence: voiced.iter().map(|v| v.2).sum::<f32>() / n,
        voiced_frames: voiced.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    const SR: u32 = 22050;

    fn tone(freq: f32, secs: f32) -> SampleBuffer {
        SampleBuffer::new(synth::sine(freq, SR, secs, 0.5), SR)
    }

    fn track(buffer: &SampleBuffer, start: f32, end: f32, config: &ContourConfig) -> Result<ContourResult> {
        track_contour(buffer, start, end, config, &PitchConfig::default())
    }

    #[test]
    fn constant_tone_is_flat() {
        let buffer = tone(330.0, 1.0);
        let result = track(&buffer, 0.0, 1.0, &ContourConfig::default()).unwrap();

        assert_eq!(result.frames.len(), 10);
        for frame in &result.frames {
            let interval = frame.semitone_interval.unwrap();
            assert!(interval.abs() < 0.1, "interval {interval}");
            assert_eq!(frame.note_name, "E4");
        }
        assert!(result.summary.interval_range < 0.1);
        assert_eq!(result.summary.voiced_frames, 10);
        assert!((result.reference_frequency_hz.unwrap() - 330.0).abs() < 3.0);
    }

    #[test]
    fn octave_step_spans_twelve_semitones() {
        let buffer = SampleBuffer::new(synth::steps(&[440.0, 880.0], 0.5, SR, 0.5), SR);
        let result = track(&buffer, 0.0, 1.0, &ContourConfig::default()).unwrap();

        assert!((result.summary.interval_range - 12.0).abs() < 0.2);
        assert!((result.summary.max_interval - 12.0).abs() < 0.2);
        assert!(result.summary.min_interval.abs() < 0.2);
        assert!(result.frames.iter().any(|f| f.note_name == "A4"));
        assert!(result.frames.iter().any(|f| f.note_name == "A5"));
    }

    #[test]
    fn frames_are_ordered_and_adjacent() {
        let buffer = tone(220.0, 1.0);
        let result = track(&buffer, 0.2, 0.8, &ContourConfig::default()).unwrap();
        assert_eq!(result.frames.len(), 6);
        assert!((result.frames[0].start_time_s - 0.2).abs() < 1e-3);
        for pair in result.frames.windows(2) {
            assert_eq!(pair[0].end_time_s, pair[1].start_time_s);
        }
    }

    #[test]
    fn final_frame_may_be_shorter() {
        let buffer = tone(220.0, 1.2);
        let result = track(&buffer, 0.0, 1.05, &ContourConfig::default()).unwrap();
        assert_eq!(result.frames.len(), 11);
        let last = result.frames.last().unwrap();
        assert!((last.end_time_s - 1.05).abs() < 1e-3);
        assert!((last.end_time_s - last.start_time_s - 0.05).abs() < 1e-3);
    }

    #[test]
    fn first_voiced_frame_beats_caller_reference() {
        let buffer = tone(880.0, 0.5);
        let config = ContourConfig {
            reference_hz: Some(440.0),
            ..ContourConfig::default()
        };
        let result = track(&buffer, 0.0, 0.5, &config).unwrap();
        assert!((result.reference_frequency_hz.unwrap() - 880.0).abs() < 9.0);
        assert!(result.summary.interval_range < 0.1);
        assert!(result.summary.max_interval.abs() < 0.1);
    }

    #[test]
    fn caller_reference_is_the_fallback_for_silence() {
        let buffer = SampleBuffer::new(vec![0.0; SR as usize / 2], SR);
        let config = ContourConfig {
            reference_hz: Some(440.0),
            ..ContourConfig::default()
        };
        let result = track(&buffer, 0.0, 0.5, &config).unwrap();
        assert_eq!(result.reference_frequency_hz, Some(440.0));
        assert_eq!(result.frames.len(), 5);
        assert!(result.frames.iter().all(|f| f.note_name == notes::SILENT));
        assert_eq!(result.summary, ContourSummary::default());
    }

    #[test]
    fn out_of_band_fallback_is_ignored() {
        let buffer = SampleBuffer::new(vec![0.0; SR as usize / 2], SR);
        let config = ContourConfig {
            reference_hz: Some(20.0),
            ..ContourConfig::default()
        };
        let result = track(&buffer, 0.0, 0.5, &config).unwrap();
        assert_eq!(result.reference_frequency_hz, None);
    }

    #[test]
    fn autocorrelation_handles_uneven_frames() {
        let buffer = tone(220.0, 1.0);
        let config = ContourConfig {
            frame_size_secs: 0.07,
            mode: DetectionMode::Autocorr,
            ..ContourConfig::default()
        };
        let result = track(&buffer, 0.0, 0.95, &config).unwrap();
        assert_eq!(result.frames.len(), 14);
        assert!(result.frames.iter().all(|f| f.is_voiced()));
        assert!(result.summary.interval_range < 0.2);
    }

    #[test]
    fn silence_gives_zero_summary() {
        let buffer = SampleBuffer::new(vec![0.0; SR as usize], SR);
        let result = track(&buffer, 0.0, 1.0, &ContourConfig::default()).unwrap();
        assert_eq!(result.frames.len(), 10);
        assert!(result.frames.iter().all(|f| f.note_name == notes::SILENT));
        assert_eq!(result.reference_frequency_hz, None);
        assert_eq!(result.summary, ContourSummary::default());
    }

    #[test]
    fn too_short_frames_are_silent_in_single_mode() {
        let buffer = tone(440.0, 0.2);
        let config = ContourConfig {
            frame_size_secs: 0.02,
            mode: DetectionMode::Yin,
            ..ContourConfig::default()
        };
        let result = track(&buffer, 0.0, 0.2, &config).unwrap();
        assert_eq!(result.frames.len(), 10);
        assert!(result.frames.iter().all(|f| !f.is_voiced()));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let buffer = tone(440.0, 10.0);
        let err = track(&buffer, 5.0, 2.0, &ContourConfig::default()).unwrap_err();
        assert_eq!(err, PitchError::InvalidRange { start: 5.0, end: 2.0 });
        assert!(matches!(
            track(&buffer, 1.0, 1.0, &ContourConfig::default()),
            Err(PitchError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bad_frame_sizes_are_rejected() {
        let buffer = tone(440.0, 1.0);
        for frame_size_secs in [0.0, -0.1, 0.6] {
            let config = ContourConfig {
                frame_size_secs,
                ..ContourConfig::default()
            };
            assert!(matches!(
                track(&buffer, 0.0, 0.5, &config),
                Err(PitchError::InvalidFrameSize { .. })
            ));
        }
    }

    #[test]
    fn range_outside_recording_is_rejected() {
        let buffer = tone(440.0, 1.0);
        assert!(matches!(
            track(&buffer, -0.5, 0.5, &ContourConfig::default()),
            Err(PitchError::OutOfRange { .. })
        ));
        assert!(matches!(
            track(&buffer, 0.5, 1.5, &ContourConfig::default()),
            Err(PitchError::OutOfRange { .. })
        ));
    }
}
