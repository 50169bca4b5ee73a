//! Experiment configuration
//!
//! Every parameter the experiment uses, with the stock values as defaults.
//! A JSON file only needs to name the fields it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::{rate_suffix, FadeCurve, TimeStretch, DEFAULT_FADE_MS, PODCAST_CLIP_MS, PODCAST_FADE_MS};
use crate::engine::ExportFormat;
use crate::error::{AuralabError, Result};

/// Parameters of one experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub fade_in_ms: u32,
    pub fade_out_ms: u32,
    pub fade_curve: FadeCurve,
    /// Rate of the slowed-down variant
    pub slow_rate: f64,
    /// Rate of the sped-up variant
    pub fast_rate: f64,
    /// Rate applied after the fade in the combined experiment
    pub combined_rate: f64,
    /// Length of the podcast intro and outro
    pub clip_ms: u32,
    /// Fade applied to the podcast intro and outro
    pub clip_fade_ms: u32,
    /// Bit depth of derived WAV files
    pub bit_depth: u16,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: DEFAULT_FADE_MS,
            fade_out_ms: DEFAULT_FADE_MS,
            fade_curve: FadeCurve::Linear,
            slow_rate: 0.75,
            fast_rate: 1.5,
            combined_rate: 1.2,
            clip_ms: PODCAST_CLIP_MS,
            clip_fade_ms: PODCAST_FADE_MS,
            bit_depth: 24,
        }
    }
}

impl ExperimentConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AuralabError::FileNotFound {
            path: path.display().to_string(),
            source: Some(e),
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject rates a time-stretch can't use, slow and fast rates that would
    /// name the same file, and unsupported bit depths
    pub fn validate(&self) -> Result<()> {
        for rate in [self.slow_rate, self.fast_rate, self.combined_rate] {
            TimeStretch::new(rate)?;
        }

        let (slow, fast) = (rate_suffix(self.slow_rate), rate_suffix(self.fast_rate));
        if slow == fast {
            return Err(AuralabError::invalid_parameter(
                "fast_rate",
                format!(
                    "{} and slow_rate {} both produce `{}` files",
                    self.fast_rate, self.slow_rate, fast
                ),
            ));
        }

        if !matches!(self.bit_depth, 16 | 24 | 32) {
            return Err(AuralabError::invalid_parameter(
                "bit_depth",
                format!("{} is not one of 16, 24, 32", self.bit_depth),
            ));
        }

        Ok(())
    }

    /// The rates of the tempo experiment, slow first
    pub fn tempo_rates(&self) -> [f64; 2] {
        [self.slow_rate, self.fast_rate]
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::new(self.bit_depth)
    }
}
