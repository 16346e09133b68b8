//! Pitch comparison between fused results, analysed files and file sets.

use anyhow::{bail, Result};
use serde::Serialize;

use super::analyzer::{FileAnalysis, SegmentPitch};
use crate::dsp::fusion::FusedPitchResult;
use crate::dsp::notes;

/// Relative difference at or under which two pitches count as the same.
pub const DEFAULT_TOLERANCE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub is_same_pitch: bool,
    pub frequency_difference_hz: f32,
    /// |f1 - f2| / max(f1, f2); infinite when either side is unvoiced.
    pub relative_error: f32,
    pub tolerance_used: f32,
}

impl ComparisonResult {
    pub fn is_comparable(&self) -> bool {
        self.relative_error.is_finite()
    }
}

/// Compare two fused pitches. Symmetric in its arguments.
pub fn compare_pitches(
    a: &FusedPitchResult,
    b: &FusedPitchResult,
    tolerance: f32,
) -> ComparisonResult {
    compare_frequencies(a.frequency_hz, b.frequency_hz, tolerance)
}

/// Compare two optional frequencies; `None` (or a non-positive value) is
/// unvoiced and never matches.
pub fn compare_frequencies(a: Option<f32>, b: Option<f32>, tolerance: f32) -> ComparisonResult {
    let voiced = |f: Option<f32>| f.filter(|&hz| hz > 0.0 && hz.is_finite());

    match (voiced(a), voiced(b)) {
        (Some(f1), Some(f2)) => {
            let difference = (f1 - f2).abs();
            let relative_error = difference / f1.max(f2);
            ComparisonResult {
                is_same_pitch: relative_error <= tolerance,
                frequency_difference_hz: difference,
                relative_error,
                tolerance_used: tolerance,
            }
        }
        (f1, f2) => ComparisonResult {
            is_same_pitch: false,
            frequency_difference_hz: (f1.unwrap_or(0.0) - f2.unwrap_or(0.0)).abs(),
            relative_error: f32::INFINITY,
            tolerance_used: tolerance,
        },
    }
}

/// How alike the voiced segments of two files are, over every pairing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentSimilarity {
    /// Mean of (1 - relative error) over all pairings.
    pub avg_similarity: f32,
    pub matching_segments: usize,
    pub total_comparisons: usize,
    pub match_ratio: f32,
}

pub fn segment_similarity(
    a: &[SegmentPitch],
    b: &[SegmentPitch],
    tolerance: f32,
) -> SegmentSimilarity {
    let comparisons: Vec<ComparisonResult> = a
        .iter()
        .flat_map(|s1| {
            b.iter().map(move |s2| {
                compare_frequencies(Some(s1.frequency_hz), Some(s2.frequency_hz), tolerance)
            })
        })
        .filter(ComparisonResult::is_comparable)
        .collect();

    if comparisons.is_empty() {
        return SegmentSimilarity::default();
    }

    let total = comparisons.len();
    let matching = comparisons.iter().filter(|c| c.is_same_pitch).count();
    let avg_similarity =
        comparisons.iter().map(|c| 1.0 - c.relative_error).sum::<f32>() / total as f32;

    SegmentSimilarity {
        avg_similarity,
        matching_segments: matching,
        total_comparisons: total,
        match_ratio: matching as f32 / total as f32,
    }
}

/// File-level comparison of two analyses.
#[derive(Debug, Clone, Serialize)]
pub struct PitchComparison {
    pub files: [String; 2],
    pub frequencies_hz: [Option<f32>; 2],
    pub notes: [String; 2],
    pub same_note: bool,
    /// min(c1, c2) × (1 - relative error); 0 when either side is unvoiced.
    pub confidence: f32,
    #[serde(flatten)]
    pub result: ComparisonResult,
    pub segment_similarity: SegmentSimilarity,
}

pub fn compare_analyses(a: &FileAnalysis, b: &FileAnalysis, tolerance: f32) -> PitchComparison {
    let result = compare_pitches(&a.overall_pitch, &b.overall_pitch, tolerance);

    let confidence = if result.is_comparable() {
        (a.overall_pitch.confidence.min(b.overall_pitch.confidence) * (1.0 - result.relative_error))
            .max(0.0)
    } else {
        0.0
    };

    let note_a = a.overall_pitch.note_name();
    let note_b = b.overall_pitch.note_name();

    PitchComparison {
        files: [a.file_name.clone(), b.file_name.clone()],
        frequencies_hz: [a.overall_pitch.frequency_hz, b.overall_pitch.frequency_hz],
        same_note: result.is_comparable()
            && notes::note_number(a.overall_pitch.frequency_hz.unwrap_or(0.0))
                == notes::note_number(b.overall_pitch.frequency_hz.unwrap_or(0.0)),
        notes: [note_a, note_b],
        confidence,
        result,
        segment_similarity: segment_similarity(&a.segment_pitches, &b.segment_pitches, tolerance),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiSummary {
    pub same_pitch_pairs: usize,
    pub total_pairs: usize,
    pub same_pitch_ratio: f32,
    pub average_confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiComparison {
    pub file_count: usize,
    pub pairwise: Vec<PitchComparison>,
    pub summary: MultiSummary,
}

/// Compare every pair of analyses, in input order.
pub fn compare_many(analyses: &[FileAnalysis], tolerance: f32) -> Result<MultiComparison> {
    if analyses.len() < 2 {
        bail!(
            "At least two analysed files are needed for a comparison, got {}",
            analyses.len()
        );
    }

    let mut pairwise = Vec::new();
    for (i, a) in analyses.iter().enumerate() {
        for b in &analyses[i + 1..] {
            pairwise.push(compare_analyses(a, b, tolerance));
        }
    }

    let total_pairs = pairwise.len();
    let same_pitch_pairs = pairwise.iter().filter(|c| c.result.is_same_pitch).count();
    let average_confidence =
        pairwise.iter().map(|c| c.confidence).sum::<f32>() / total_pairs as f32;

    Ok(MultiComparison {
        file_count: analyses.len(),
        summary: MultiSummary {
            same_pitch_pairs,
            total_pairs,
            same_pitch_ratio: same_pitch_pairs as f32 / total_pairs as f32,
            average_confidence,
        },
        pairwise,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::{analyze_buffer, AnalysisOptions};
    use crate::audio::{buffer::SampleBuffer, synth};

    fn fused(freq: f32, confidence: f32) -> FusedPitchResult {
        FusedPitchResult {
            frequency_hz: Some(freq),
            confidence,
            contributing_estimates: Vec::new(),
        }
    }

    fn segment(freq: f32) -> SegmentPitch {
        SegmentPitch {
            start_secs: 0.0,
            end_secs: 1.0,
            frequency_hz: freq,
            confidence: 0.9,
            note: notes::note_name(freq),
        }
    }

    #[test]
    fn close_pitches_match() {
        let r = compare_pitches(&fused(440.0, 0.9), &fused(445.0, 0.9), DEFAULT_TOLERANCE);
        assert!(r.is_same_pitch);
        assert!((r.frequency_difference_hz - 5.0).abs() < 1e-3);
        assert!((r.relative_error - 0.0112).abs() < 1e-3);
        assert_eq!(r.tolerance_used, 0.05);
    }

    #[test]
    fn distant_pitches_differ() {
        let r = compare_pitches(&fused(440.0, 0.9), &fused(500.0, 0.9), DEFAULT_TOLERANCE);
        assert!(!r.is_same_pitch);
        assert!((r.relative_error - 0.12).abs() < 1e-4);
    }

    #[test]
    fn comparison_is_symmetric() {
        for (f1, f2) in [(440.0, 445.0), (100.0, 180.0), (1000.0, 990.0)] {
            let ab = compare_pitches(&fused(f1, 0.8), &fused(f2, 0.5), 0.05);
            let ba = compare_pitches(&fused(f2, 0.5), &fused(f1, 0.8), 0.05);
            assert_eq!(ab.is_same_pitch, ba.is_same_pitch);
            assert_eq!(ab.frequency_difference_hz, ba.frequency_difference_hz);
            assert_eq!(ab.relative_error, ba.relative_error);
        }
    }

    #[test]
    fn unvoiced_never_matches() {
        let r = compare_pitches(&FusedPitchResult::unvoiced(), &fused(440.0, 0.9), 0.05);
        assert!(!r.is_same_pitch);
        assert!(r.relative_error.is_infinite());
        assert_eq!(r.frequency_difference_hz, 440.0);

        let both = compare_pitches(&FusedPitchResult::unvoiced(), &FusedPitchResult::unvoiced(), 0.05);
        assert!(!both.is_same_pitch);
        assert_eq!(both.frequency_difference_hz, 0.0);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let r = compare_frequencies(Some(100.0), Some(95.0), 0.05);
        assert!(r.is_same_pitch);
    }

    #[test]
    fn segment_similarity_counts_all_pairings() {
        let a = [segment(440.0), segment(660.0)];
        let b = [segment(441.0)];
        let sim = segment_similarity(&a, &b, 0.05);
        assert_eq!(sim.total_comparisons, 2);
        assert_eq!(sim.matching_segments, 1);
        assert!((sim.match_ratio - 0.5).abs() < 1e-6);
        assert!(sim.avg_similarity > 0.8 && sim.avg_similarity < 1.0);

        assert_eq!(segment_similarity(&a, &[], 0.05), SegmentSimilarity::default());
    }

    fn analysis(freq: f32) -> FileAnalysis {
        let buffer = SampleBuffer::new(synth::sine(freq, 22050, 0.5, 0.5), 22050);
        analyze_buffer(
            std::path::Path::new(&format!("{freq}.wav")),
            &buffer,
            &AnalysisOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn file_comparison_reports_notes_and_confidence() {
        let a = analysis(440.0);
        let b = analysis(445.0);
        let cmp = compare_analyses(&a, &b, DEFAULT_TOLERANCE);
        assert!(cmp.result.is_same_pitch);
        assert!(cmp.same_note);
        assert_eq!(cmp.notes, ["A4".to_string(), "A4".to_string()]);
        assert!(cmp.confidence > 0.5);
        assert_eq!(cmp.files[0], "440.wav");
    }

    #[test]
    fn multi_comparison_summary() {
        let analyses = [analysis(440.0), analysis(442.0), analysis(660.0)];
        let multi = compare_many(&analyses, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(multi.file_count, 3);
        assert_eq!(multi.summary.total_pairs, 3);
        assert_eq!(multi.summary.same_pitch_pairs, 1);
        assert!((multi.summary.same_pitch_ratio - 1.0 / 3.0).abs() < 1e-6);

        assert!(compare_many(&analyses[..1], DEFAULT_TOLERANCE).is_err());
    }
}
