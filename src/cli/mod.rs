//! CLI Module
//!
//! Command-line interface for the auralab experiment runner.

pub mod commands;

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::{FadeCurve, DEFAULT_FADE_MS};

/// Default work directory for uploads and derived files
pub const DEFAULT_WORK_DIR: &str = "uploads";

/// Auralab - audio experiments: fades, tempo changes, podcast clips and a narrative report
#[derive(Parser, Debug)]
#[command(name = "auralab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full experiment over exactly two audio files
    #[command(name = "run")]
    Run {
        /// Input audio files (MP3 or WAV)
        files: Vec<PathBuf>,

        /// Directory for uploads, derived audio and the report
        #[arg(short, long, default_value = DEFAULT_WORK_DIR)]
        work_dir: PathBuf,

        /// Experiment config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Delete derived audio once the report is written
        #[arg(long)]
        discard_audio: bool,

        /// Also write report.json
        #[arg(long)]
        json: bool,
    },

    /// Print duration, RMS and peak of a file
    #[command(name = "analyze")]
    Analyze {
        /// Audio file
        file: PathBuf,
    },

    /// Fade a file in and out
    #[command(name = "fade")]
    Fade {
        /// Audio file
        file: PathBuf,

        /// Fade-in length in milliseconds
        #[arg(long, default_value_t = DEFAULT_FADE_MS)]
        in_ms: u32,

        /// Fade-out length in milliseconds
        #[arg(long, default_value_t = DEFAULT_FADE_MS)]
        out_ms: u32,

        /// Gain curve
        #[arg(long, value_enum, default_value_t = FadeCurve::Linear)]
        curve: FadeCurve,
    },

    /// Change the tempo of a file without changing its pitch
    #[command(name = "tempo")]
    Tempo {
        /// Audio file
        file: PathBuf,

        /// Speed factor (0.75 = slower, 1.5 = faster)
        #[arg(short, long)]
        rate: f64,
    },

    /// Cut the start or the end out of a file
    #[command(name = "clip")]
    #[command(group(ArgGroup::new("edge").required(true).args(["head", "tail"])))]
    Clip {
        /// Audio file
        file: PathBuf,

        /// Keep the start of the file
        #[arg(long)]
        head: bool,

        /// Keep the end of the file
        #[arg(long)]
        tail: bool,

        /// Length to keep in milliseconds
        #[arg(long)]
        ms: u32,
    },

    /// Render a waveform plot as SVG
    #[command(name = "plot")]
    Plot {
        /// Audio file
        file: PathBuf,

        /// Plot title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Output SVG (defaults to the input path with .svg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a sine test tone
    #[command(name = "tone")]
    Tone {
        /// Output WAV file
        output: PathBuf,

        /// Frequency in Hz
        #[arg(long, default_value_t = 440.0)]
        freq: f32,

        /// Length in seconds
        #[arg(long, default_value_t = 30.0)]
        secs: f32,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,

        /// Write two channels
        #[arg(long)]
        stereo: bool,
    },

    /// Delete every file in the work directory
    #[command(name = "clean")]
    Clean {
        #[arg(short, long, default_value = DEFAULT_WORK_DIR)]
        work_dir: PathBuf,
    },
}
