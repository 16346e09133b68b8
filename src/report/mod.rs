pub mod charts;
pub mod compare;

use console::style;

use crate::analysis::analyzer::FileAnalysis;
use crate::dsp::contour::ContourResult;
use crate::dsp::notes;
use crate::util;

/// Print one file's analysis. `verbose` adds the per-segment pitches.
pub fn print_analysis(a: &FileAnalysis, verbose: bool) {
    println!();
    println!("{}", style(format!("=== {} ===", a.file_name)).bold());

    if a.time_range.is_partial() {
        let start = a
            .time_range
            .start_secs
            .map_or_else(|| "start".to_string(), util::format_time);
        let end = a
            .time_range
            .end_secs
            .map_or_else(|| "end".to_string(), util::format_time);
        println!(
            "  Time range: {start} - {end} ({} analysed)",
            util::format_time(a.time_range.analysed_secs)
        );
    }

    let pitch = &a.overall_pitch;
    match pitch.frequency_hz {
        Some(freq) => {
            println!("  Frequency:  {}", style(format!("{freq:.2} Hz")).cyan());
            println!("  Note:       {}", style(&a.note).cyan().bold());
        }
        None => println!("  Frequency:  {}", style("no pitch detected").yellow()),
    }
    println!("  Confidence: {}", confidence_label(pitch.confidence));
    println!("  Method:     {}", a.method);

    if verbose {
        for e in &pitch.contributing_estimates {
            if let Some(f) = e.frequency_hz {
                println!("    {:<16} {f:>8.2} Hz  ({:.2})", e.method.to_string(), e.confidence);
            }
        }

        if !a.segment_pitches.is_empty() {
            println!("  Voiced segments:");
            for (i, seg) in a.segment_pitches.iter().enumerate() {
                println!(
                    "    {:>2}. {:>8.2} Hz ({:<4}) [{:.2}s - {:.2}s]",
                    i + 1,
                    seg.frequency_hz,
                    seg.note,
                    seg.start_secs,
                    seg.end_secs
                );
            }
        }
    }
}

/// Print a contour as a frame table followed by its summary.
pub fn print_contour(name: &str, c: &ContourResult) {
    println!();
    println!("{}", style(format!("=== Pitch contour: {name} ===")).bold());

    match c.reference_frequency_hz {
        Some(r) => println!(
            "  Reference: {:.2} Hz ({})",
            r,
            style(notes::note_name(r)).cyan()
        ),
        None => println!("  Reference: {}", style("none (no voiced frames)").yellow()),
    }
    println!();
    println!(
        "  {:>9} {:>9} {:>10} {:>6} {:>10} {:>6}",
        "start", "end", "Hz", "note", "interval", "conf"
    );

    for f in &c.frames {
        let (hz, interval) = match (f.frequency_hz, f.semitone_interval) {
            (Some(hz), Some(i)) => (format!("{hz:.2}"), format!("{i:+.2}")),
            _ => ("-".to_string(), "-".to_string()),
        };
        let note = if f.is_voiced() {
            style(f.note_name.clone()).cyan()
        } else {
            style(f.note_name.clone()).dim()
        };
        println!(
            "  {:>9} {:>9} {:>10} {:>6} {:>10} {:>6.2}",
            util::format_time(f.start_time_s),
            util::format_time(f.end_time_s),
            hz,
            note,
            interval,
            f.confidence
        );
    }

    let s = &c.summary;
    println!();
    println!("  Voiced frames:  {}/{}", s.voiced_frames, c.frames.len());
    if s.voiced_frames > 0 {
        println!("  Mean frequency: {:.2} Hz", s.avg_frequency);
        println!(
            "  Interval range: {:.2} semitones ({:+.2} to {:+.2})",
            s.interval_range, s.min_interval, s.max_interval
        );
        println!("  Mean confidence: {}", confidence_label(s.avg_confidence));
    }
}

/// Confidence with a colour hinting how far to trust it.
fn confidence_label(confidence: f32) -> String {
    let text = format!("{confidence:.2}");
    if confidence >= 0.7 {
        style(text).green().to_string()
    } else if confidence >= 0.4 {
        style(text).yellow().to_string()
    } else {
        style(text).red().to_string()
    }
}
