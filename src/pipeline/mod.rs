//! Experiment Orchestration
//!
//! Runs the whole experiment over two uploads, one [`Stage`] at a time:
//! save, fade, tempo change, podcast intro/outro, fade + tempo, narrative.
//! Every produced file is shown on the [`Surface`] as it is written.

mod stage;

pub use stage::Stage;

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::dsp::{
    apply_to_file, simulate_podcast_intro_outro, EffectChain, Fade, PodcastPaths, TimeStretch,
};
use crate::error::{AuralabError, Result};
use crate::render::{Surface, WaveformPlot};
use crate::report::{generate_narrative, ExperimentOutputs, Narrative, DISCUSSION};
use crate::storage::{SavedUpload, Storage, Upload};

/// Number of uploads an experiment needs
pub const REQUIRED_UPLOADS: usize = 2;

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub uploads: Vec<SavedUpload>,
    pub outputs: ExperimentOutputs,
    pub narrative: Narrative,
    /// Derived files deleted by the retention policy
    pub removed_files: usize,
}

impl ExperimentReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One experiment over a work directory
pub struct Experiment {
    storage: Storage,
    config: ExperimentConfig,
    stage: Stage,
}

impl Experiment {
    /// Derived files are written with the config's bit depth
    pub fn new(storage: Storage, config: ExperimentConfig) -> Self {
        let storage = storage.with_export_format(config.export_format());
        Self {
            storage,
            config,
            stage: Stage::AwaitingUpload,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            info!("Stage {} -> {}", self.stage, next);
            self.stage = next;
        }
    }

    /// Run every stage over `uploads`
    ///
    /// The upload prompt is always shown. Unless exactly two files are
    /// given nothing else happens and `Ok(None)` is returned.
    ///
    /// # Errors
    /// * `InvalidParameter` - if the experiment has already run or the config is invalid
    /// * Any decode, effect or write error; the run stops at the failing stage
    pub fn run(
        &mut self,
        uploads: &[Upload],
        surface: &mut dyn Surface,
    ) -> Result<Option<ExperimentReport>> {
        if self.stage != Stage::AwaitingUpload {
            return Err(AuralabError::invalid_parameter(
                "stage",
                format!("experiment already ran (stage {})", self.stage),
            ));
        }

        surface.header(Stage::AwaitingUpload.title())?;
        if uploads.len() != REQUIRED_UPLOADS {
            info!(
                "Waiting for {} uploads, got {}",
                REQUIRED_UPLOADS,
                uploads.len()
            );
            return Ok(None);
        }
        self.config.validate()?;

        let saved = self.save(uploads, surface)?;
        let originals: Vec<PathBuf> = saved.iter().map(|s| s.path.clone()).collect();

        let faded = self.fade(&originals, surface)?;
        let (slow, fast) = self.tempo(&originals, surface)?;
        let podcast = self.podcast(&originals, surface)?;
        let combined = self.combined(&originals, surface)?;

        let outputs = ExperimentOutputs {
            originals,
            faded,
            slow,
            fast,
            podcast,
            combined,
        };
        let narrative = self.narrate(&outputs, surface)?;
        let removed_files = self.storage.finish()?;

        Ok(Some(ExperimentReport {
            uploads: saved,
            outputs,
            narrative,
            removed_files,
        }))
    }

    fn save(&mut self, uploads: &[Upload], surface: &mut dyn Surface) -> Result<Vec<SavedUpload>> {
        let saved = uploads
            .iter()
            .map(|upload| self.storage.save_upload(upload))
            .collect::<Result<Vec<_>>>()?;
        self.advance();

        surface.header(self.stage.title())?;
        for upload in &saved {
            show(surface, &upload.path, format!("Original: {}", upload.original_name))?;
        }
        Ok(saved)
    }

    fn fade(&mut self, originals: &[PathBuf], surface: &mut dyn Surface) -> Result<Vec<PathBuf>> {
        let fade = Fade::new(self.config.fade_in_ms, self.config.fade_out_ms)
            .with_curve(self.config.fade_curve);
        let faded = originals
            .iter()
            .map(|src| apply_to_file(&mut self.storage, src, &fade))
            .collect::<Result<Vec<_>>>()?;
        self.advance();

        surface.header(self.stage.title())?;
        show_all(surface, &faded)?;
        Ok(faded)
    }

    fn tempo(
        &mut self,
        originals: &[PathBuf],
        surface: &mut dyn Surface,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let [slow_rate, fast_rate] = self.config.tempo_rates();
        let slow = self.stretch_all(originals, slow_rate)?;
        let fast = self.stretch_all(originals, fast_rate)?;
        self.advance();

        surface.header(self.stage.title())?;
        surface.subheader(&format!("Slow ({}x)", slow_rate))?;
        show_all(surface, &slow)?;
        surface.subheader(&format!("Fast ({}x)", fast_rate))?;
        show_all(surface, &fast)?;
        Ok((slow, fast))
    }

    fn stretch_all(&mut self, originals: &[PathBuf], rate: f64) -> Result<Vec<PathBuf>> {
        let stretch = TimeStretch::new(rate)?;
        originals
            .iter()
            .map(|src| apply_to_file(&mut self.storage, src, &stretch))
            .collect()
    }

    fn podcast(&mut self, originals: &[PathBuf], surface: &mut dyn Surface) -> Result<PodcastPaths> {
        let podcast = simulate_podcast_intro_outro(
            &mut self.storage,
            &originals[0],
            &originals[1],
            self.config.clip_ms,
            self.config.clip_fade_ms,
        )?;
        self.advance();

        let clip_secs = self.config.clip_ms as f64 / 1000.0;
        surface.header(self.stage.title())?;
        surface.subheader(&format!(
            "Opening (fade in over the first {} s of audio 1)",
            clip_secs
        ))?;
        show(surface, &podcast.intro, "Podcast Opening")?;
        surface.subheader(&format!(
            "Closing (fade out over the last {} s of audio 2)",
            clip_secs
        ))?;
        show(surface, &podcast.outro, "Podcast Closing")?;
        Ok(podcast)
    }

    fn combined(&mut self, originals: &[PathBuf], surface: &mut dyn Surface) -> Result<Vec<PathBuf>> {
        let chain = EffectChain::new()
            .with(Box::new(
                Fade::new(self.config.fade_in_ms, self.config.fade_out_ms)
                    .with_curve(self.config.fade_curve),
            ))
            .with(Box::new(TimeStretch::new(self.config.combined_rate)?));

        let combined = originals
            .iter()
            .map(|src| apply_to_file(&mut self.storage, src, &chain))
            .collect::<Result<Vec<_>>>()?;
        self.advance();

        surface.header(self.stage.title())?;
        for path in &combined {
            show(
                surface,
                path,
                format!("Fade + tempo combined ({})", file_name(path)),
            )?;
        }
        Ok(combined)
    }

    fn narrate(&mut self, outputs: &ExperimentOutputs, surface: &mut dyn Surface) -> Result<Narrative> {
        let narrative = generate_narrative(outputs, &self.config)?;
        self.advance();

        surface.header(self.stage.title())?;
        surface.markdown(&narrative.to_markdown())?;
        surface.subheader("Measurements")?;
        surface.markdown(&narrative.stats_table())?;
        surface.header("Discussion")?;
        surface.markdown(DISCUSSION)?;
        Ok(narrative)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Emit an audio reference followed by its waveform
fn show(surface: &mut dyn Surface, path: &Path, title: impl Into<String>) -> Result<()> {
    surface.audio(path)?;
    surface.plot(&WaveformPlot::from_file(path, title)?)
}

fn show_all(surface: &mut dyn Surface, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        show(surface, path, format!("Waveform: {}", file_name(path)))?;
    }
    Ok(())
}
