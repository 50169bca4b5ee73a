//! Fade Effect
//!
//! Gain ramps over the start (fade-in) and end (fade-out) of a clip.
//! The length of the audio is never changed.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dsp::effect::{apply_to_file, Effect};
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;
use crate::storage::Storage;

/// Default fade-in and fade-out length in milliseconds
pub const DEFAULT_FADE_MS: u32 = 2000;

/// Level at the silent end of a [`FadeCurve::Decibel`] ramp
const DECIBEL_FLOOR: f32 = -120.0;

/// Shape of the gain ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FadeCurve {
    /// Gain rises linearly in amplitude
    #[default]
    Linear,
    /// Gain rises linearly in decibels from -120 dB to 0 dB
    Decibel,
}

impl FadeCurve {
    /// Gain at position `t` in `[0, 1]` along the ramp (0 = silent end)
    #[inline]
    pub fn gain(self, t: f32) -> f32 {
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Decibel => db_to_linear(DECIBEL_FLOOR * (1.0 - t)),
        }
    }
}

/// Fade-in / fade-out effect
///
/// # Example
/// ```
/// use auralab::dsp::{Effect, Fade};
/// use auralab::engine::generate_test_tone;
///
/// let tone = generate_test_tone(440.0, 3.0, 8000);
/// let faded = Fade::new(500, 500).process(&tone).unwrap();
/// assert_eq!(faded.len(), tone.len());
/// assert_eq!(faded.samples[0][0], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fade {
    fade_in_ms: u32,
    fade_out_ms: u32,
    curve: FadeCurve,
}

impl Fade {
    /// Create a linear fade
    pub fn new(fade_in_ms: u32, fade_out_ms: u32) -> Self {
        Self {
            fade_in_ms,
            fade_out_ms,
            curve: FadeCurve::Linear,
        }
    }

    /// Fade-in only
    pub fn fade_in(ms: u32) -> Self {
        Self::new(ms, 0)
    }

    /// Fade-out only
    pub fn fade_out(ms: u32) -> Self {
        Self::new(0, ms)
    }

    /// Use a different ramp shape
    pub fn with_curve(mut self, curve: FadeCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn fade_in_ms(&self) -> u32 {
        self.fade_in_ms
    }

    pub fn fade_out_ms(&self) -> u32 {
        self.fade_out_ms
    }

    pub fn curve(&self) -> FadeCurve {
        self.curve
    }

    /// Ramp length in frames, clamped to the clip
    fn ramp_frames(&self, ms: u32, buffer: &AudioBuffer, which: &str) -> usize {
        let frames = buffer.frames_for_ms(ms);
        if frames > buffer.len() {
            warn!(
                "{} of {} ms exceeds clip length {:.3}s; clamping",
                which,
                ms,
                buffer.duration_secs()
            );
            buffer.len()
        } else {
            frames
        }
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_MS, DEFAULT_FADE_MS)
    }
}

impl Effect for Fade {
    impl_effect_common!(Fade, "fade", "Fade In/Out");

    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let mut output = input.clone();
        let len = output.len();
        let fade_in = self.ramp_frames(self.fade_in_ms, input, "Fade-in");
        let fade_out = self.ramp_frames(self.fade_out_ms, input, "Fade-out");

        for channel in output.samples.iter_mut() {
            for (i, sample) in channel[..fade_in].iter_mut().enumerate() {
                *sample *= self.curve.gain(i as f32 / fade_in as f32);
            }

            let tail_start = len - fade_out;
            for (i, sample) in channel[tail_start..].iter_mut().enumerate() {
                let remaining = fade_out - 1 - i;
                *sample *= self.curve.gain(remaining as f32 / fade_out as f32);
            }
        }

        Ok(output)
    }

    fn file_suffix(&self) -> String {
        "_fade".to_string()
    }

    fn get_params(&self) -> Value {
        json!({
            "fade_in_ms": self.fade_in_ms,
            "fade_out_ms": self.fade_out_ms,
            "curve": self.curve,
        })
    }
}

/// Fade a file in and out, saving `<stem>_fade.wav`
pub fn apply_fade(
    storage: &mut Storage,
    src: &Path,
    fade_in_ms: u32,
    fade_out_ms: u32,
) -> Result<PathBuf> {
    apply_to_file(storage, src, &Fade::new(fade_in_ms, fade_out_ms))
}
