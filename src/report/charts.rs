use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::analysis::analyzer::FileAnalysis;
use crate::dsp::contour::ContourResult;
use crate::dsp::notes;

/// Chart dimensions
const WIDTH: u32 = 1200;
const PANEL_HEIGHT: u32 = 320;
const TOTAL_HEIGHT: u32 = PANEL_HEIGHT * 2 + 60; // extra for title

/// Waveforms longer than this are decimated before drawing.
const MAX_WAVEFORM_POINTS: usize = 4000;

const COLOR_PRIMARY: RGBColor = RGBColor(41, 128, 185); // blue
const COLOR_SECONDARY: RGBColor = RGBColor(231, 76, 60); // red
const COLOR_TERTIARY: RGBColor = RGBColor(46, 204, 113); // green
const COLOR_THRESHOLD: RGBColor = RGBColor(200, 200, 200); // light gray

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Two-panel PNG for one analysed file: the waveform with voiced segments
/// shaded, and each segment's pitch against the overall pitch.
pub fn analysis_chart(a: &FileAnalysis, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (WIDTH, TOTAL_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    let title = match a.overall_pitch.frequency_hz {
        Some(f) => format!("{}: {f:.1} Hz ({})", a.file_name, a.note),
        None => format!("{}: no pitch detected", a.file_name),
    };
    draw_title(&root, &title)?;

    let panels = root.margin(50, 10, 10, 10).split_evenly((2, 1));
    draw_waveform(&panels[0], a)?;
    draw_segment_pitches(&panels[1], a)?;

    root.present()
        .with_context(|| format!("Failed to write chart {}", output_path.display()))?;
    Ok(())
}

/// Two-panel PNG for a contour: semitones from the reference over time,
/// and the raw frequency with note names on the axis.
pub fn contour_chart(c: &ContourResult, name: &str, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (WIDTH, TOTAL_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    let title = match c.reference_frequency_hz {
        Some(r) => format!("{name}: contour vs {r:.1} Hz ({})", notes::note_name(r)),
        None => format!("{name}: contour (no voiced frames)"),
    };
    draw_title(&root, &title)?;

    let panels = root.margin(50, 10, 10, 10).split_evenly((2, 1));
    let t_start = c.frames.first().map_or(0.0, |f| f.start_time_s);
    let t_end = c.frames.last().map_or(1.0, |f| f.end_time_s).max(t_start + 0.01);

    let intervals: Vec<(f32, f32)> = c
        .frames
        .iter()
        .filter_map(|f| f.semitone_interval.map(|i| (midpoint(f.start_time_s, f.end_time_s), i)))
        .collect();
    let values: Vec<f32> = intervals.iter().map(|p| p.1).chain([0.0]).collect();
    let (y_min, y_max) = min_max_with_margin(&values, -1.0, 1.0);

    let mut chart = ChartBuilder::on(&panels[0])
        .caption("Interval from reference (semitones)", ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(t_start..t_end, y_min..y_max)?;
    chart.configure_mesh().x_desc("Time (s)").draw()?;

    draw_horizontal_line(&mut chart, 0.0, t_start, t_end)?;
    draw_voiced_runs(&mut chart, &intervals, c.frames.len(), COLOR_PRIMARY)?;

    let freqs: Vec<(f32, f32)> = c
        .frames
        .iter()
        .filter_map(|f| f.frequency_hz.map(|hz| (midpoint(f.start_time_s, f.end_time_s), hz)))
        .collect();
    let hz_values: Vec<f32> = freqs.iter().map(|p| p.1).collect();
    let (f_min, f_max) = min_max_with_margin(&hz_values, 80.0, 1000.0);

    let mut chart = ChartBuilder::on(&panels[1])
        .caption("Frequency", ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(90)
        .build_cartesian_2d(t_start..t_end, f_min..f_max)?;
    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_label_formatter(&|hz| format!("{hz:.0} {}", notes::note_name(*hz)))
        .draw()?;

    if let Some(r) = c.reference_frequency_hz {
        draw_horizontal_line(&mut chart, r, t_start, t_end)?;
    }
    chart.draw_series(
        freqs
            .iter()
            .map(|&(t, hz)| Circle::new((t, hz), 3, COLOR_SECONDARY.filled())),
    )?;

    root.present()
        .with_context(|| format!("Failed to write chart {}", output_path.display()))?;
    Ok(())
}

fn draw_title(root: &Area, title: &str) -> Result<()> {
    root.draw(&Text::new(
        title.to_string(),
        (20, 15),
        ("sans-serif", 24).into_font().color(&BLACK),
    ))
    .context("Failed to draw title")?;
    Ok(())
}

fn draw_waveform(area: &Area, a: &FileAnalysis) -> Result<()> {
    let samples = a.processed.samples();
    let sr = a.processed.sample_rate().max(1) as f32;
    let duration = a.processed.duration().max(0.01);
    let peak = samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs())).max(1e-3);

    let mut chart = ChartBuilder::on(area)
        .caption("Waveform (voiced segments shaded)", ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..duration, -peak..peak)?;
    chart.configure_mesh().x_desc("Time (s)").draw()?;

    chart.draw_series(a.voiced_segments.iter().map(|seg| {
        Rectangle::new(
            [(seg.start_secs, -peak), (seg.end_secs, peak)],
            COLOR_TERTIARY.mix(0.2).filled(),
        )
    }))?;

    let step = (samples.len() / MAX_WAVEFORM_POINTS).max(1);
    chart.draw_series(LineSeries::new(
        samples
            .iter()
            .enumerate()
            .step_by(step)
            .map(|(i, &s)| (i as f32 / sr, s)),
        &COLOR_PRIMARY,
    ))?;

    Ok(())
}

fn draw_segment_pitches(area: &Area, a: &FileAnalysis) -> Result<()> {
    let duration = a.processed.duration().max(0.01);
    let values: Vec<f32> = a
        .segment_pitches
        .iter()
        .map(|s| s.frequency_hz)
        .chain(a.overall_pitch.frequency_hz)
        .collect();
    let (y_min, y_max) = min_max_with_margin(&values, 80.0, 1000.0);

    let mut chart = ChartBuilder::on(area)
        .caption("Segment pitch (Hz)", ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..duration, y_min..y_max)?;
    chart.configure_mesh().x_desc("Time (s)").draw()?;

    if let Some(f) = a.overall_pitch.frequency_hz {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(0.0, f), (duration, f)],
                5,
                3,
                COLOR_SECONDARY.into(),
            ))?
            .label(format!("Overall {f:.1} Hz"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COLOR_SECONDARY));
    }

    for seg in &a.segment_pitches {
        chart.draw_series(LineSeries::new(
            [(seg.start_secs, seg.frequency_hz), (seg.end_secs, seg.frequency_hz)],
            COLOR_PRIMARY.stroke_width(3),
        ))?;
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    Ok(())
}

/// Draw a line per run of consecutive voiced frames, so silent frames
/// show up as gaps instead of being bridged.
fn draw_voiced_runs(
    chart: &mut ChartContext<BitMapBackend, Cartesian2d<plotters::coord::types::RangedCoordf32, plotters::coord::types::RangedCoordf32>>,
    points: &[(f32, f32)],
    frame_count: usize,
    color: RGBColor,
) -> Result<()> {
    let frame_gap = if frame_count > 1 { 1.5 } else { f32::INFINITY };
    let spacing = points
        .windows(2)
        .map(|w| w[1].0 - w[0].0)
        .fold(f32::INFINITY, f32::min);

    let mut run: Vec<(f32, f32)> = Vec::new();
    for &p in points {
        if let Some(&(t, _)) = run.last() {
            if p.0 - t > spacing * frame_gap {
                chart.draw_series(LineSeries::new(run.drain(..), &color))?;
            }
        }
        run.push(p);
    }
    if !run.is_empty() {
        chart.draw_series(LineSeries::new(run.iter().copied(), &color))?;
    }
    chart.draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 3, color.filled())))?;

    Ok(())
}

/// Draw a dashed horizontal reference line.
fn draw_horizontal_line(
    chart: &mut ChartContext<BitMapBackend, Cartesian2d<plotters::coord::types::RangedCoordf32, plotters::coord::types::RangedCoordf32>>,
    y_val: f32,
    x_min: f32,
    x_max: f32,
) -> Result<()> {
    chart.draw_series(DashedLineSeries::new(
        vec![(x_min, y_val), (x_max, y_val)],
        5,
        3,
        COLOR_THRESHOLD.into(),
    ))?;
    Ok(())
}

fn midpoint(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

/// Compute y-axis range with margin, falling back to defaults if no data.
fn min_max_with_margin(values: &[f32], default_min: f32, default_max: f32) -> (f32, f32) {
    if values.is_empty() {
        return (default_min, default_max);
    }
    let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let margin = (max - min).max(1.0) * 0.1;
    (min - margin, max + margin)
}
