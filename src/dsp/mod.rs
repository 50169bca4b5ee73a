//! Effects Library
//!
//! Whole-clip audio transformations. All effects implement the `Effect`
//! trait; the path-level helpers decode a file, apply one effect and save
//! the result through [`Storage`](crate::storage::Storage).

mod chain;
mod clip;
mod effect;
mod fade;
mod tempo;

pub use chain::EffectChain;
pub use clip::{simulate_podcast_intro_outro, Clip, PodcastPaths, PODCAST_CLIP_MS, PODCAST_FADE_MS};
pub use effect::{apply_to_file, Effect};
pub use fade::{apply_fade, Fade, FadeCurve, DEFAULT_FADE_MS};
pub use tempo::{change_tempo, rate_suffix, TimeStretch};
