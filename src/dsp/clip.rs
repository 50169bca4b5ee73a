//! Clip Extraction
//!
//! Cuts the first or last N milliseconds out of a clip, and builds the
//! podcast intro/outro pair from two sources.

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dsp::chain::EffectChain;
use crate::dsp::effect::Effect;
use crate::dsp::fade::Fade;
use crate::engine::{import_audio, AudioBuffer};
use crate::error::Result;
use crate::impl_effect_common;
use crate::storage::Storage;

/// Length of the podcast intro and outro in milliseconds
pub const PODCAST_CLIP_MS: u32 = 10_000;
/// Fade applied to the podcast intro and outro in milliseconds
pub const PODCAST_FADE_MS: u32 = 3_000;

/// Extract the start or the end of a clip
///
/// A source shorter than the requested length is returned whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clip {
    /// First N milliseconds
    Head(u32),
    /// Last N milliseconds
    Tail(u32),
}

impl Effect for Clip {
    impl_effect_common!(Clip, "clip", "Clip");

    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let len = input.len();
        let range = match *self {
            Clip::Head(ms) => 0..input.frames_for_ms(ms),
            Clip::Tail(ms) => len.saturating_sub(input.frames_for_ms(ms))..len,
        };
        Ok(input.slice_frames(range))
    }

    fn file_suffix(&self) -> String {
        match self {
            Clip::Head(ms) => format!("_head{}ms", ms),
            Clip::Tail(ms) => format!("_tail{}ms", ms),
        }
    }

    fn get_params(&self) -> Value {
        match self {
            Clip::Head(ms) => json!({ "head_ms": ms }),
            Clip::Tail(ms) => json!({ "tail_ms": ms }),
        }
    }
}

/// Paths of the generated podcast segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodcastPaths {
    pub intro: PathBuf,
    pub outro: PathBuf,
}

/// Build a podcast intro from the start of `intro_src` and an outro from the end of `outro_src`
///
/// The intro is the first `clip_ms` with a `fade_ms` fade-in, the outro the
/// last `clip_ms` with a `fade_ms` fade-out. Both land at fresh unique
/// paths in the work directory, so repeated runs never overwrite each other.
pub fn simulate_podcast_intro_outro(
    storage: &mut Storage,
    intro_src: &Path,
    outro_src: &Path,
    clip_ms: u32,
    fade_ms: u32,
) -> Result<PodcastPaths> {
    let intro_chain = EffectChain::new()
        .with(Box::new(Clip::Head(clip_ms)))
        .with(Box::new(Fade::fade_in(fade_ms)));
    let outro_chain = EffectChain::new()
        .with(Box::new(Clip::Tail(clip_ms)))
        .with(Box::new(Fade::fade_out(fade_ms)));

    let intro = intro_chain.process(&import_audio(intro_src)?)?;
    let intro_path = storage.unique_path("podcast_intro_fade");
    storage.write_audio(&intro_path, &intro)?;

    let outro = outro_chain.process(&import_audio(outro_src)?)?;
    let outro_path = storage.unique_path("podcast_outro_fade");
    storage.write_audio(&outro_path, &outro)?;

    info!(
        "Podcast intro {:.2}s -> {}, outro {:.2}s -> {}",
        intro.duration_secs(),
        intro_path.display(),
        outro.duration_secs(),
        outro_path.display()
    );

    Ok(PodcastPaths {
        intro: intro_path,
        outro: outro_path,
    })
}
