use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::Serialize;

use crate::audio::buffer::SampleBuffer;
use crate::audio::preprocess;
use crate::audio::wav::{self, AudioInfo};
use crate::config::AppConfig;
use crate::dsp::activity::{self, ActivityConfig, VoicedSegment};
use crate::dsp::fusion::FusedPitchResult;
use crate::dsp::pitch::{detect_pitch, DetectionMode, PitchConfig};
use crate::{paths, report};

/// At most this many voiced segments get their own pitch.
const MAX_SEGMENTS: usize = 5;

/// Segments shorter than this (seconds) are not analysed on their own.
const MIN_SEGMENT_SECS: f32 = 0.05;

/// Everything that shapes a whole-file analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub sample_rate: u32,
    pub mode: DetectionMode,
    pub pitch: PitchConfig,
    pub preprocess: bool,
    pub start_secs: Option<f32>,
    pub end_secs: Option<f32>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnalysisOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            mode: config.detection.method,
            pitch: config.pitch_config(),
            preprocess: config.audio.preprocess,
            start_secs: None,
            end_secs: None,
        }
    }
}

/// The requested window and how much audio was actually analysed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeRange {
    pub start_secs: Option<f32>,
    pub end_secs: Option<f32>,
    pub analysed_secs: f32,
}

impl TimeRange {
    pub fn is_partial(&self) -> bool {
        self.start_secs.is_some() || self.end_secs.is_some()
    }
}

/// Pitch of one voiced segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPitch {
    pub start_secs: f32,
    pub end_secs: f32,
    pub frequency_hz: f32,
    pub confidence: f32,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_name: String,
    pub path: PathBuf,
    pub audio_info: Option<AudioInfo>,
    pub time_range: TimeRange,
    pub method: DetectionMode,
    pub overall_pitch: FusedPitchResult,
    pub note: String,
    pub voiced_segments: Vec<VoicedSegment>,
    pub segment_pitches: Vec<SegmentPitch>,
    /// The signal the pitch was measured on, kept for charts.
    #[serde(skip)]
    pub processed: SampleBuffer,
}

/// Load, window and analyse one audio file.
pub fn analyze_file(path: &Path, options: &AnalysisOptions) -> Result<FileAnalysis> {
    let audio_info = wav::probe(path)?;
    let buffer = wav::load_buffer(path, options.sample_rate)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let start = options.start_secs.unwrap_or(0.0);
    let end = options
        .end_secs
        .map_or(buffer.duration(), |e| e.min(buffer.duration()));
    if start >= buffer.duration() {
        bail!(
            "Start time {start:.2}s is past the end of {} ({:.2}s)",
            path.display(),
            buffer.duration()
        );
    }
    if end <= start {
        bail!("End time must be after start time ({start:.2}s)");
    }

    let window = buffer.window(start, end);
    let mut analysis = analyze_buffer(path, &window, options)?;
    analysis.audio_info = Some(audio_info);
    analysis.time_range.start_secs = options.start_secs;
    analysis.time_range.end_secs = options.end_secs;
    Ok(analysis)
}

/// Analyse samples already loaded and windowed.
pub fn analyze_buffer(
    path: &Path,
    buffer: &SampleBuffer,
    options: &AnalysisOptions,
) -> Result<FileAnalysis> {
    let sr = buffer.sample_rate();
    let processed = if options.preprocess {
        SampleBuffer::new(preprocess::preprocess(buffer.samples(), sr), sr)
    } else {
        buffer.clone()
    };

    let overall_pitch = detect_pitch(processed.samples(), sr, options.mode, &options.pitch)
        .with_context(|| format!("Pitch detection failed for {}", path.display()))?;
    info!(
        "{}: {:?} Hz, confidence {:.2}",
        path.display(),
        overall_pitch.frequency_hz,
        overall_pitch.confidence
    );

    let voiced_segments = activity::voiced_segments(processed.samples(), sr, &ActivityConfig::default());
    let segment_pitches = segment_pitches(&processed, &voiced_segments, &options.pitch);

    Ok(FileAnalysis {
        file_name: paths::display_name(path),
        path: path.to_path_buf(),
        audio_info: None,
        time_range: TimeRange {
            analysed_secs: buffer.duration(),
            ..TimeRange::default()
        },
        method: options.mode,
        note: overall_pitch.note_name(),
        overall_pitch,
        voiced_segments,
        segment_pitches,
        processed,
    })
}

/// Fused pitch of the first few voiced segments that are long enough.
fn segment_pitches(
    buffer: &SampleBuffer,
    segments: &[VoicedSegment],
    pitch: &PitchConfig,
) -> Vec<SegmentPitch> {
    let min_len = (MIN_SEGMENT_SECS * buffer.sample_rate() as f32) as usize;

    segments
        .iter()
        .take(MAX_SEGMENTS)
        .filter_map(|seg| {
            let samples = buffer.slice_secs(seg.start_secs, seg.end_secs);
            if samples.len() <= min_len {
                return None;
            }
            match detect_pitch(samples, buffer.sample_rate(), DetectionMode::Multi, pitch) {
                Ok(fused) => fused.frequency_hz.map(|frequency_hz| SegmentPitch {
                    start_secs: seg.start_secs,
                    end_secs: seg.end_secs,
                    frequency_hz,
                    confidence: fused.confidence,
                    note: fused.note_name(),
                }),
                Err(e) => {
                    debug!("segment {:.2}s: {e}", seg.start_secs);
                    None
                }
            }
        })
        .collect()
}

/// Analyse each file, reporting failures and carrying on with the rest.
/// Fails only when nothing could be analysed.
pub fn analyze_files(files: &[PathBuf], options: &AnalysisOptions, quiet: bool) -> Result<Vec<FileAnalysis>> {
    let pb = if files.len() > 1 && !quiet {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(ProgressStyle::with_template(
            "  Analyzing {bar:30.green/dim} {pos}/{len} {wide_msg}",
        )?);
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut analyses = Vec::with_capacity(files.len());
    for path in files {
        pb.set_message(paths::display_name(path));
        match analyze_file(path, options) {
            Ok(a) => analyses.push(a),
            Err(e) => pb.suspend(|| {
                eprintln!("  {} {}: {e:#}", style("SKIP").yellow(), path.display());
            }),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if analyses.is_empty() {
        bail!("No audio file could be analysed");
    }
    Ok(analyses)
}

/// Entry point for `pitchmatch analyze`.
pub fn run(
    files: &[PathBuf],
    options: &AnalysisOptions,
    visualize: bool,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let analyses = analyze_files(files, options, json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
    } else {
        for analysis in &analyses {
            report::print_analysis(analysis, verbose);
        }
    }

    if visualize {
        for analysis in &analyses {
            let chart = paths::chart_path(&analysis.path, "analysis");
            report::charts::analysis_chart(analysis, &chart)?;
            if !json {
                println!("Chart saved to {}", style(chart.display()).green());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    const SR: u32 = 22050;

    #[test]
    fn analyses_a_tone_with_segments() {
        let mut samples = synth::sine(220.0, SR, 0.5, 0.5);
        samples.extend(vec![0.0; (SR / 2) as usize]);
        samples.extend(synth::sine(220.0, SR, 0.5, 0.5));
        let buffer = SampleBuffer::new(samples, SR);

        let analysis = analyze_buffer(Path::new("tone.wav"), &buffer, &AnalysisOptions::default()).unwrap();
        let freq = analysis.overall_pitch.frequency_hz.unwrap();
        assert!((freq - 220.0).abs() / 220.0 < 0.01, "got {freq}");
        assert_eq!(analysis.note, "A3");
        assert_eq!(analysis.file_name, "tone.wav");
        assert_eq!(analysis.voiced_segments.len(), 2);
        assert_eq!(analysis.segment_pitches.len(), 2);
        for seg in &analysis.segment_pitches {
            assert_eq!(seg.note, "A3");
        }
    }

    #[test]
    fn silence_is_unvoiced() {
        let buffer = SampleBuffer::new(vec![0.0; SR as usize], SR);
        let analysis = analyze_buffer(Path::new("quiet.wav"), &buffer, &AnalysisOptions::default()).unwrap();
        assert!(!analysis.overall_pitch.is_voiced());
        assert_eq!(analysis.note, "Silent");
        assert!(analysis.segment_pitches.is_empty());
    }

    #[test]
    fn analyze_file_applies_time_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.wav");
        synth::write_tones(&path, &[220.0, 440.0], 1.0, SR, 0.5).unwrap();

        let options = AnalysisOptions {
            start_secs: Some(1.2),
            end_secs: Some(5.0),
            ..AnalysisOptions::default()
        };
        let analysis = analyze_file(&path, &options).unwrap();
        let freq = analysis.overall_pitch.frequency_hz.unwrap();
        assert!((freq - 440.0).abs() / 440.0 < 0.01, "got {freq}");
        assert!(analysis.time_range.is_partial());
        assert!((analysis.time_range.analysed_secs - 0.8).abs() < 0.01);
        assert_eq!(analysis.audio_info.unwrap().sample_rate, SR);
    }

    #[test]
    fn analyze_file_rejects_bad_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        synth::write_tones(&path, &[220.0], 1.0, SR, 0.5).unwrap();

        let past_end = AnalysisOptions {
            start_secs: Some(3.0),
            ..AnalysisOptions::default()
        };
        assert!(analyze_file(&path, &past_end).is_err());

        let reversed = AnalysisOptions {
            start_secs: Some(0.8),
            end_secs: Some(0.2),
            ..AnalysisOptions::default()
        };
        assert!(analyze_file(&path, &reversed).is_err());
    }

    #[test]
    fn single_method_on_tiny_buffer_fails() {
        let buffer = SampleBuffer::new(synth::sine(440.0, SR, 0.01, 0.5), SR);
        let options = AnalysisOptions {
            mode: DetectionMode::Yin,
            preprocess: false,
            ..AnalysisOptions::default()
        };
        assert!(analyze_buffer(Path::new("tiny.wav"), &buffer, &options).is_err());
    }

    #[test]
    fn analyze_files_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        synth::write_tones(&good, &[330.0], 0.5, SR, 0.5).unwrap();
        let missing = dir.path().join("missing.wav");

        let analyses =
            analyze_files(&[good, missing.clone()], &AnalysisOptions::default(), true).unwrap();
        assert_eq!(analyses.len(), 1);
        assert!(analyze_files(&[missing], &AnalysisOptions::default(), true).is_err());
    }
}
