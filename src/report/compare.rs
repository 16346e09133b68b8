use std::path::PathBuf;

use anyhow::{bail, Result};
use console::style;

use super::print_analysis;
use crate::analysis::analyzer::{self, AnalysisOptions};
use crate::analysis::compare::{compare_analyses, compare_many, MultiComparison, PitchComparison};
use crate::paths;

/// Entry point for `pitchmatch compare`: two files get a detailed
/// comparison, more get a pairwise summary.
pub fn compare_files(
    files: &[PathBuf],
    options: &AnalysisOptions,
    tolerance: f32,
    visualize: bool,
    json: bool,
    verbose: bool,
) -> Result<()> {
    if files.len() < 2 {
        bail!("compare needs at least two files, got {}", files.len());
    }

    let analyses = analyzer::analyze_files(files, options, json)?;
    if analyses.len() < 2 {
        bail!(
            "Only {} of {} files could be analysed, nothing to compare",
            analyses.len(),
            files.len()
        );
    }

    if verbose && !json {
        for a in &analyses {
            print_analysis(a, true);
        }
    }

    if analyses.len() == 2 {
        let cmp = compare_analyses(&analyses[0], &analyses[1], tolerance);
        if json {
            println!("{}", serde_json::to_string_pretty(&cmp)?);
        } else {
            print_comparison(&cmp);
        }
    } else {
        let multi = compare_many(&analyses, tolerance)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&multi)?);
        } else {
            print_multi(&multi, verbose);
        }
    }

    if visualize {
        for a in &analyses {
            let chart = paths::chart_path(&a.path, "analysis");
            super::charts::analysis_chart(a, &chart)?;
            if !json {
                println!("Chart saved to {}", style(chart.display()).green());
            }
        }
    }

    Ok(())
}

/// Print a two-file comparison.
pub fn print_comparison(c: &PitchComparison) {
    println!();
    println!("{}", style("=== Pitch Comparison ===").bold());
    println!();

    for i in 0..2 {
        let freq = c.frequencies_hz[i].map_or_else(|| "-".to_string(), |f| format!("{f:.2} Hz"));
        println!(
            "  {:<24} {:>12}  {}",
            c.files[i],
            freq,
            style(&c.notes[i]).cyan()
        );
    }
    println!();

    let r = &c.result;
    if !r.is_comparable() {
        println!("  {}", style("No usable pitch in at least one file").yellow());
        return;
    }

    println!("  Difference:     {:.2} Hz", r.frequency_difference_hz);
    println!("  Relative error: {:.1}%", r.relative_error * 100.0);
    println!();

    if r.is_same_pitch {
        println!(
            "  {} Same pitch (error ≤ {:.1}%)",
            style("✓").green(),
            r.tolerance_used * 100.0
        );
    } else {
        println!(
            "  {} Different pitch (error > {:.1}%)",
            style("✗").red(),
            r.tolerance_used * 100.0
        );
    }
    if c.same_note {
        println!("  {} Same note", style("✓").green());
    } else {
        println!("  {} Different note", style("✗").red());
    }
    println!("  Confidence:     {:.2}", c.confidence);

    let seg = &c.segment_similarity;
    if seg.total_comparisons > 0 {
        println!();
        println!("{}", style("  Segments").bold());
        println!("    Mean similarity: {:.2}", seg.avg_similarity);
        println!(
            "    Matching:        {}/{} ({:.1}%)",
            seg.matching_segments,
            seg.total_comparisons,
            seg.match_ratio * 100.0
        );
    }
}

/// Print the summary of a many-file comparison; `verbose` lists each pair.
pub fn print_multi(m: &MultiComparison, verbose: bool) {
    let s = &m.summary;
    println!();
    println!("{}", style("=== Multi-file Comparison ===").bold());
    println!();
    println!("  Files:            {}", m.file_count);
    println!("  Pairs compared:   {}", s.total_pairs);
    println!("  Same-pitch pairs: {}", s.same_pitch_pairs);
    println!("  Same-pitch ratio: {:.1}%", s.same_pitch_ratio * 100.0);
    println!("  Mean confidence:  {:.2}", s.average_confidence);

    if verbose {
        println!();
        for (i, c) in m.pairwise.iter().enumerate() {
            let verdict = if c.result.is_same_pitch {
                style("same").green()
            } else {
                style("different").red()
            };
            let freq = |f: Option<f32>| f.map_or_else(|| "-".to_string(), |f| format!("{f:.1}"));
            println!(
                "  {:>3}. {} vs {}: {} ({} Hz vs {} Hz, error {})",
                i + 1,
                c.files[0],
                c.files[1],
                verdict,
                freq(c.frequencies_hz[0]),
                freq(c.frequencies_hz[1]),
                if c.result.is_comparable() {
                    format!("{:.1}%", c.result.relative_error * 100.0)
                } else {
                    "n/a".to_string()
                }
            );
        }
    }
}
