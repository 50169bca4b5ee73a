//! Effect trait definition
//!
//! Base trait for the audio transformations. Unlike real-time DSP, every
//! effect here renders a whole clip into a new buffer, so effects are free
//! to change the length of the audio (tempo change, clip extraction).

use std::path::{Path, PathBuf};

use log::info;
use serde_json::Value;

use crate::engine::{import_audio, AudioBuffer};
use crate::error::Result;
use crate::storage::Storage;

/// Base trait for all effects
pub trait Effect: Send + Sync {
    /// Render `input` through the effect into a new buffer
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer>;

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Suffix appended to the source file stem when the result is saved
    fn file_suffix(&self) -> String;

    /// Get all parameters as JSON (for logs and reports)
    fn get_params(&self) -> Value;

    /// Clone the effect into a boxed trait object
    fn box_clone(&self) -> Box<dyn Effect>;
}

impl Clone for Box<dyn Effect> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($type:ty, $effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn box_clone(&self) -> Box<dyn Effect> {
            Box::new(self.clone())
        }
    };
}

/// Decode `src`, run it through `effect` and save the result next to the source
///
/// The output path is the source stem plus [`Effect::file_suffix`].
pub fn apply_to_file(storage: &mut Storage, src: &Path, effect: &dyn Effect) -> Result<PathBuf> {
    let input = import_audio(src)?;
    let output = effect.process(&input)?;
    let path = storage.write_derived(src, &effect.file_suffix(), &output)?;

    info!(
        "{} {} -> {} ({:.2}s -> {:.2}s)",
        effect.display_name(),
        src.display(),
        path.display(),
        input.duration_secs(),
        output.duration_secs()
    );

    Ok(path)
}
