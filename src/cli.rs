use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::dsp::pitch::DetectionMode;

#[derive(Parser)]
#[command(name = "pitchmatch")]
#[command(about = "Detect, compare and track the pitch of audio recordings")]
#[command(version)]
pub struct Cli {
    /// Pitch detection method (default from config: multi)
    #[arg(short, long, global = true, value_enum)]
    pub method: Option<DetectionMode>,

    /// Analysis sample rate in Hz (default from config: 22050)
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    /// Show per-segment details and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Optional analysis window, as "90", "90.5", "1:30" or "1:30.5".
#[derive(Args, Debug, Clone, Default)]
pub struct TimeArgs {
    /// Start of the analysed span
    #[arg(long)]
    pub start_time: Option<String>,

    /// End of the analysed span
    #[arg(long)]
    pub end_time: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect the pitch of one or more audio files
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        time: TimeArgs,

        /// Write <name>_analysis.png next to each file
        #[arg(long)]
        visualize: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the pitch of two or more audio files
    Compare {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Relative tolerance for "same pitch", e.g. 0.05 = 5%
        #[arg(short, long)]
        tolerance: Option<f32>,

        #[command(flatten)]
        time: TimeArgs,

        /// Write <name>_analysis.png next to each file
        #[arg(long)]
        visualize: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Track pitch over time in semitones from a reference
    Contour {
        file: PathBuf,

        #[command(flatten)]
        time: TimeArgs,

        /// Frame length in seconds (default from config: 0.1)
        #[arg(long)]
        frame_size: Option<f32>,

        /// Reference note, e.g. A4 or C#3, used when no frame is voiced
        #[arg(long, conflicts_with = "reference_hz")]
        reference_note: Option<String>,

        /// Reference frequency in Hz, used when no frame is voiced
        #[arg(long)]
        reference_hz: Option<f32>,

        /// Write <name>_contour.png next to the file
        #[arg(long)]
        visualize: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a test tone (or a sequence of tones) to a WAV file
    Synth {
        output: PathBuf,

        /// Tone frequencies in Hz, played in order
        #[arg(long = "freq", required = true, num_args = 1..)]
        freqs: Vec<f32>,

        /// Length of each tone in seconds
        #[arg(long, default_value_t = 1.0)]
        step_duration: f32,

        /// Peak amplitude, 0-1
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
    },

    /// Convert a frequency to a note or a note to its frequency
    Note {
        /// A frequency in Hz (440) or a note name (A4, C#3, Bb2)
        value: String,
    },

    /// Show where the config file is read from
    Paths,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_method_after_subcommand() {
        let cli = Cli::parse_from(["pitchmatch", "analyze", "a.wav", "-m", "yin", "-v"]);
        assert_eq!(cli.method, Some(DetectionMode::Yin));
        assert!(cli.verbose);
        match cli.command {
            Command::Analyze { files, .. } => assert_eq!(files, vec![PathBuf::from("a.wav")]),
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn compare_needs_two_files() {
        assert!(Cli::try_parse_from(["pitchmatch", "compare", "a.wav"]).is_err());
        let cli = Cli::try_parse_from(["pitchmatch", "compare", "a.wav", "b.wav", "-t", "0.1"]).unwrap();
        match cli.command {
            Command::Compare { tolerance, .. } => assert_eq!(tolerance, Some(0.1)),
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn contour_time_args() {
        let cli = Cli::parse_from([
            "pitchmatch", "contour", "a.wav", "--start-time", "1:00", "--end-time", "75",
            "--reference-note", "A4",
        ]);
        match cli.command {
            Command::Contour { time, reference_note, .. } => {
                assert_eq!(time.start_time.as_deref(), Some("1:00"));
                assert_eq!(time.end_time.as_deref(), Some("75"));
                assert_eq!(reference_note.as_deref(), Some("A4"));
            }
            _ => panic!("expected contour"),
        }
    }
}
