//! Auralab - Audio Experiment Runner
//!
//! Takes two audio files and runs a fixed series of experiments on them:
//! 1. Fade in/out
//! 2. Tempo change (slower and faster, pitch preserved)
//! 3. Podcast intro/outro built from the start of one file and the end of the other
//! 4. Fade and tempo change combined
//!
//! Every result is shown as an audio reference plus a waveform plot, and the
//! run closes with a narrative report built from re-analysing each file.
//!
//! # Architecture
//!
//! - `storage`: work directory, upload persistence, derived file tracking
//! - `engine`: in-memory audio, file import/export, signal statistics
//! - `dsp`: effects behind the `Effect` trait, composable in an `EffectChain`
//! - `render`: waveform plots and the surfaces output is shown on
//! - `report`: narrative and discussion
//! - `pipeline`: the stage-by-stage experiment

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod storage;

pub use error::{AuralabError, Result};
