mod analysis;
mod audio;
mod cli;
mod config;
mod dsp;
mod error;
mod paths;
mod report;
mod util;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use env_logger::Env;

use analysis::analyzer::AnalysisOptions;
use analysis::contour::ContourRequest;
use cli::{Cli, Command, TimeArgs};
use config::AppConfig;
use dsp::contour::ContourConfig;
use dsp::notes::{self, Note};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", style("error:").red().bold());
        std::process::exit(1);
    }
}

/// `-v` lowers the default filter to debug; RUST_LOG still wins.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = config::load_config()?;
    if let Some(method) = cli.method {
        config.detection.method = method;
    }
    if let Some(sr) = cli.sample_rate {
        config.audio.sample_rate = sr;
    }
    config.validate()?;

    match cli.command {
        Command::Analyze {
            files,
            time,
            visualize,
            json,
        } => {
            let options = analysis_options(&config, &time)?;
            analysis::analyzer::run(&files, &options, visualize, json, cli.verbose)
        }

        Command::Compare {
            files,
            tolerance,
            time,
            visualize,
            json,
        } => {
            let tolerance = tolerance.unwrap_or(config.comparison.tolerance);
            if !(tolerance >= 0.0) {
                bail!("Tolerance must be non-negative, got {tolerance}");
            }
            let options = analysis_options(&config, &time)?;
            report::compare::compare_files(&files, &options, tolerance, visualize, json, cli.verbose)
        }

        Command::Contour {
            file,
            time,
            frame_size,
            reference_note,
            reference_hz,
            visualize,
            json,
        } => {
            let (start, end) = parse_time_args(&time)?;
            let reference_hz = match reference_note {
                Some(name) => {
                    let number = notes::parse_note(&name)
                        .with_context(|| format!("Invalid note name '{name}' (expected e.g. A4, C#3, Bb2)"))?;
                    Some(notes::note_to_frequency(number))
                }
                None => reference_hz,
            };

            let request = ContourRequest {
                start_secs: start.unwrap_or(0.0),
                end_secs: end,
                sample_rate: config.audio.sample_rate,
                contour: ContourConfig {
                    frame_size_secs: frame_size.unwrap_or(config.contour.frame_size_secs),
                    reference_hz,
                    mode: config.detection.method,
                },
                pitch: config.pitch_config(),
            };
            analysis::contour::run(&file, &request, visualize, json)
        }

        Command::Synth {
            output,
            freqs,
            step_duration,
            amplitude,
        } => {
            let buffer = audio::synth::write_tones(
                &output,
                &freqs,
                step_duration,
                config.audio.sample_rate,
                amplitude.clamp(0.0, 1.0),
            )?;
            println!(
                "Wrote {} ({:.2}s at {} Hz) to {}",
                freqs
                    .iter()
                    .map(|f| format!("{f} Hz"))
                    .collect::<Vec<_>>()
                    .join(", "),
                buffer.duration(),
                buffer.sample_rate(),
                style(output.display()).green()
            );
            Ok(())
        }

        Command::Note { value } => print_note(&value),

        Command::Paths => {
            println!("Config: {}", style(paths::config_file().display()).cyan());
            println!(
                "Formats: {}",
                audio::wav::supported_formats().join(", ")
            );
            Ok(())
        }
    }
}

fn parse_time_args(time: &TimeArgs) -> Result<(Option<f32>, Option<f32>)> {
    let start = time.start_time.as_deref().map(util::parse_time).transpose()?;
    let end = time.end_time.as_deref().map(util::parse_time).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if e <= s {
            bail!("End time must be after start time");
        }
    }
    Ok((start, end))
}

fn analysis_options(config: &AppConfig, time: &TimeArgs) -> Result<AnalysisOptions> {
    let (start_secs, end_secs) = parse_time_args(time)?;
    Ok(AnalysisOptions {
        start_secs,
        end_secs,
        ..AnalysisOptions::from_config(config)
    })
}

/// Hz in, note out; or note in, Hz out.
fn print_note(value: &str) -> Result<()> {
    if let Ok(hz) = value.trim().parse::<f32>() {
        match Note::from_frequency(hz) {
            Some(note) => println!(
                "{hz:.2} Hz = {} ({:+.1} cents from {:.2} Hz)",
                style(note).cyan().bold(),
                note.cents,
                note.nominal_frequency()
            ),
            None => println!("{hz} Hz = {}", style(notes::SILENT).dim()),
        }
        return Ok(());
    }

    let number = notes::parse_note(value)
        .with_context(|| format!("'{value}' is neither a frequency nor a note name"))?;
    println!(
        "{} = {:.2} Hz",
        style(Note::from_number(number)).cyan().bold(),
        notes::note_to_frequency(number)
    );
    Ok(())
}
