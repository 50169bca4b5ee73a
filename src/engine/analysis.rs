//! Signal statistics
//!
//! Duration, RMS and peak of a decoded signal. Multi-channel audio is
//! down-mixed to mono first. Results are never cached: analysing a file
//! twice decodes it twice.

use std::path::Path;

use serde::Serialize;

use crate::engine::buffer::{linear_to_db, AudioBuffer};
use crate::engine::io::import_audio;
use crate::error::Result;

/// Duration, RMS and peak amplitude of one signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AudioStats {
    /// Length in seconds
    pub duration_secs: f64,
    /// Root-mean-square amplitude (linear, 0.0..)
    pub rms: f32,
    /// Maximum absolute sample value (linear, 0.0..)
    pub peak: f32,
}

impl AudioStats {
    /// RMS level in dBFS
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }

    /// Peak-to-RMS ratio; `None` for silence
    pub fn crest_factor(&self) -> Option<f32> {
        (self.rms > 0.0).then(|| self.peak / self.rms)
    }
}

/// Compute duration, RMS and peak of a buffer
pub fn analyze(buffer: &AudioBuffer) -> AudioStats {
    let mono = buffer.to_mono();

    let rms = if mono.is_empty() {
        0.0
    } else {
        let sum_squares: f64 = mono.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_squares / mono.len() as f64).sqrt() as f32
    };

    let peak = mono.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);

    AudioStats {
        duration_secs: buffer.duration_secs(),
        rms,
        peak,
    }
}

/// Decode `path` and compute its statistics
pub fn analyze_file(path: &Path) -> Result<AudioStats> {
    let buffer = import_audio(path)?;
    Ok(analyze(&buffer))
}
