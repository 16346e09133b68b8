use serde::Serialize;

use super::notes;
use super::pitch::{clamp_unit, PitchConfig, PitchEstimate};

/// One pitch for a buffer, fused from one or more estimators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedPitchResult {
    /// `None` when no estimator was usable (silence, noise, too short).
    pub frequency_hz: Option<f32>,
    pub confidence: f32,
    /// Estimates that passed the confidence floor, in method order.
    pub contributing_estimates: Vec<PitchEstimate>,
}

impl FusedPitchResult {
    pub fn unvoiced() -> Self {
        Self {
            frequency_hz: None,
            confidence: 0.0,
            contributing_estimates: Vec::new(),
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.frequency_hz.is_some()
    }

    /// Scientific pitch notation, or "Silent".
    pub fn note_name(&self) -> String {
        notes::note_name(self.frequency_hz.unwrap_or(0.0))
    }
}

/// Fuse estimates from distinct methods into one result.
///
/// - Unvoiced estimates and those below `min_confidence` are dropped.
/// - Frequency is the confidence-weighted mean in log2 space, so an estimate
///   an octave up pulls exactly as hard as one an octave down.
/// - Confidence is the highest contributor's, minus `disagreement_penalty`
///   when contributors are more than a semitone apart.
pub fn fuse(estimates: &[PitchEstimate], config: &PitchConfig) -> FusedPitchResult {
    let usable: Vec<PitchEstimate> = estimates
        .iter()
        .filter(|e| e.is_voiced() && e.confidence >= config.min_confidence)
        .copied()
        .collect();

    if usable.is_empty() {
        return FusedPitchResult::unvoiced();
    }

    let logs: Vec<(f32, f32)> = usable
        .iter()
        .filter_map(|e| e.frequency_hz.map(|f| (f.log2(), e.confidence)))
        .collect();

    let weight_sum: f32 = logs.iter().map(|&(_, w)| w).sum();
    let mean_log = if weight_sum > 0.0 {
        logs.iter().map(|&(l, w)| l * w).sum::<f32>() / weight_sum
    } else {
        logs.iter().map(|&(l, _)| l).sum::<f32>() / logs.len() as f32
    };

    let max_confidence = usable
        .iter()
        .map(|e| e.confidence)
        .fold(0.0_f32, f32::max);

    let (lowest, highest) = logs
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &(l, _)| {
            (lo.min(l), hi.max(l))
        });
    let spread_semitones = 12.0 * (highest - lowest);

    let confidence = if spread_semitones > 1.0 {
        log::debug!("estimators disagree by {spread_semitones:.2} semitones");
        max_confidence - config.disagreement_penalty
    } else {
        max_confidence
    };

    FusedPitchResult {
        frequency_hz: Some(mean_log.exp2()),
        confidence: clamp_unit(confidence),
        contributing_estimates: usable,
    }
}
