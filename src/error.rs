use thiserror::Error;

use crate::dsp::pitch::Method;

/// Structural misuse of the pitch engine.
///
/// Signal-quality problems (silence, noise, low confidence) are never errors:
/// they come back as unvoiced results with zero confidence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PitchError {
    #[error("invalid time range: start {start:.3}s must be before end {end:.3}s")]
    InvalidRange { start: f32, end: f32 },

    #[error("invalid frame size {frame_size:.3}s: must be positive and at most the {span:.3}s span")]
    InvalidFrameSize { frame_size: f32, span: f32 },

    #[error("time range {start:.3}s-{end:.3}s is outside the {duration:.3}s recording")]
    OutOfRange { start: f32, end: f32, duration: f32 },

    #[error("{method} needs at least {needed} samples, only {available} available")]
    AlgorithmUnavailable {
        method: Method,
        needed: usize,
        available: usize,
    },
}

pub type Result<T> = std::result::Result<T, PitchError>;
