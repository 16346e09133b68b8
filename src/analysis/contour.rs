use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::audio::buffer::SampleBuffer;
use crate::audio::{preprocess, wav};
use crate::dsp::contour::{track_contour, ContourConfig};
use crate::dsp::pitch::PitchConfig;
use crate::{paths, report};

/// What `pitchmatch contour` was asked to do.
#[derive(Debug, Clone)]
pub struct ContourRequest {
    pub start_secs: f32,
    /// End of the span; the end of the recording when `None`.
    pub end_secs: Option<f32>,
    pub sample_rate: u32,
    pub contour: ContourConfig,
    pub pitch: PitchConfig,
}

/// Entry point for `pitchmatch contour`.
///
/// Only peak normalization is applied before tracking: trimming would shift
/// frame times away from the times the user asked for.
pub fn run(path: &Path, request: &ContourRequest, visualize: bool, json: bool) -> Result<()> {
    let loaded = wav::load_buffer(path, request.sample_rate)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let buffer = SampleBuffer::new(preprocess::normalize(loaded.samples()), loaded.sample_rate());

    let end = request.end_secs.unwrap_or_else(|| buffer.duration());
    let result = track_contour(&buffer, request.start_secs, end, &request.contour, &request.pitch)
        .with_context(|| format!("Contour tracking failed for {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report::print_contour(&paths::display_name(path), &result);
    }

    if visualize {
        let chart = paths::chart_path(path, "contour");
        report::charts::contour_chart(&result, &paths::display_name(path), &chart)?;
        if !json {
            println!("Chart saved to {}", style(chart.display()).green());
        }
    }

    Ok(())
}
