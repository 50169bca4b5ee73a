//! Audio Engine Module
//!
//! Core audio handling:
//! - Audio buffer management
//! - File I/O operations
//! - Signal statistics

pub mod analysis;
pub mod buffer;
pub mod io;

pub use analysis::{analyze, analyze_file, AudioStats};
pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{
    export_audio, generate_stereo_test_tone, generate_test_tone, import_audio, ExportFormat,
};
