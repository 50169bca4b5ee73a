//! Narrative generator
//!
//! Re-analyses every file an experiment produced and fills a fixed
//! template. The statistics table behind the text is kept on the
//! [`Narrative`] so it can also be exported as JSON.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::dsp::PodcastPaths;
use crate::engine::{analyze_file, AudioStats};
use crate::error::{AuralabError, Result};

/// Every file produced by one experiment run
///
/// Per-original lists are in upload order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentOutputs {
    pub originals: Vec<PathBuf>,
    pub faded: Vec<PathBuf>,
    pub slow: Vec<PathBuf>,
    pub fast: Vec<PathBuf>,
    pub podcast: PodcastPaths,
    pub combined: Vec<PathBuf>,
}

/// Statistics of one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStats {
    pub path: PathBuf,
    #[serde(flatten)]
    pub stats: AudioStats,
}

impl FileStats {
    fn analyze(path: &Path) -> Result<Self> {
        let stats = analyze_file(path)?;
        debug!(
            "{}: {:.2}s rms {:.4} peak {:.4}",
            path.display(),
            stats.duration_secs,
            stats.rms,
            stats.peak
        );
        Ok(Self {
            path: path.to_path_buf(),
            stats,
        })
    }

    fn analyze_all(paths: &[PathBuf]) -> Result<Vec<Self>> {
        paths.iter().map(|p| Self::analyze(p)).collect()
    }
}

/// Analysis of a finished experiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub generated_at: DateTime<Utc>,
    pub slow_rate: f64,
    pub fast_rate: f64,
    pub combined_rate: f64,
    pub clip_secs: f64,
    pub originals: Vec<FileStats>,
    pub faded: Vec<FileStats>,
    pub slow: Vec<FileStats>,
    pub fast: Vec<FileStats>,
    pub intro: FileStats,
    pub outro: FileStats,
    pub combined: Vec<FileStats>,
}

/// Analyse every output and build the narrative
///
/// # Errors
/// * `InvalidParameter` - unless there are exactly two originals, with one
///   derived file per original in each experiment
/// * Any decode error from re-analysing a file
pub fn generate_narrative(
    outputs: &ExperimentOutputs,
    config: &ExperimentConfig,
) -> Result<Narrative> {
    if outputs.originals.len() != 2 {
        return Err(AuralabError::invalid_parameter(
            "originals",
            format!("expected 2 files, got {}", outputs.originals.len()),
        ));
    }
    for (name, paths) in [
        ("faded", &outputs.faded),
        ("slow", &outputs.slow),
        ("fast", &outputs.fast),
        ("combined", &outputs.combined),
    ] {
        if paths.len() != 2 {
            return Err(AuralabError::invalid_parameter(
                name,
                format!("expected 2 files, got {}", paths.len()),
            ));
        }
    }

    Ok(Narrative {
        generated_at: Utc::now(),
        slow_rate: config.slow_rate,
        fast_rate: config.fast_rate,
        combined_rate: config.combined_rate,
        clip_secs: config.clip_ms as f64 / 1000.0,
        originals: FileStats::analyze_all(&outputs.originals)?,
        faded: FileStats::analyze_all(&outputs.faded)?,
        slow: FileStats::analyze_all(&outputs.slow)?,
        fast: FileStats::analyze_all(&outputs.fast)?,
        intro: FileStats::analyze(&outputs.podcast.intro)?,
        outro: FileStats::analyze(&outputs.podcast.outro)?,
        combined: FileStats::analyze_all(&outputs.combined)?,
    })
}

impl Narrative {
    /// Every analysed file, originals first
    pub fn all_stats(&self) -> impl Iterator<Item = &FileStats> {
        self.originals
            .iter()
            .chain(&self.faded)
            .chain(&self.slow)
            .chain(&self.fast)
            .chain([&self.intro, &self.outro])
            .chain(&self.combined)
    }

    /// The narrative text
    pub fn to_markdown(&self) -> String {
        let o = &self.originals;
        let mut md = String::new();

        // Writing to a String can't fail
        let _ = writeln!(
            md,
            "In this experiment two audio files were uploaded and processed automatically.\n"
        );

        let _ = writeln!(md, "**1. Fade in and out**:");
        for (i, (orig, faded)) in o.iter().zip(&self.faded).enumerate() {
            let _ = writeln!(
                md,
                "- Duration of audio {} before fade: {:.2} s, after fade: {:.2} s.",
                i + 1,
                orig.stats.duration_secs,
                faded.stats.duration_secs
            );
        }
        let _ = writeln!(
            md,
            "- RMS amplitude before fade: audio 1 = {:.4}, audio 2 = {:.4}",
            o[0].stats.rms, o[1].stats.rms
        );
        let _ = writeln!(
            md,
            "- Peak amplitude before fade: audio 1 = {:.4}, audio 2 = {:.4}\n",
            o[0].stats.peak, o[1].stats.peak
        );

        let _ = writeln!(md, "**2. Tempo change**:");
        for (i, (slow, fast)) in self.slow.iter().zip(&self.fast).enumerate() {
            let _ = writeln!(
                md,
                "- Duration of audio {} slowed down ({}x): {:.2} s, sped up ({}x): {:.2} s.",
                i + 1,
                self.slow_rate,
                slow.stats.duration_secs,
                self.fast_rate,
                fast.stats.duration_secs
            );
        }
        let _ = writeln!(md);

        let clip = self.clip_secs;
        let _ = writeln!(md, "**3. Podcast simulation**:");
        let _ = writeln!(
            md,
            "- The opening uses the first {} seconds of audio 1 with a fade in, giving a gentle start ({:.2} s).",
            clip, self.intro.stats.duration_secs
        );
        let _ = writeln!(
            md,
            "- The closing takes the last {} seconds of audio 2 with a fade out so the exit feels natural ({:.2} s).\n",
            clip, self.outro.stats.duration_secs
        );

        let _ = writeln!(md, "**4. Fade + tempo combined ({}x)**:", self.combined_rate);
        let _ = writeln!(
            md,
            "- Combining the effects noticeably changes the dynamics of the sound."
        );
        let _ = writeln!(
            md,
            "- RMS amplitude after the combined effect: audio 1 = {:.4}, audio 2 = {:.4}\n",
            self.combined[0].stats.rms, self.combined[1].stats.rms
        );

        let _ = writeln!(
            md,
            "The waveforms show that the fade makes the entry and exit smoother. \
             A tempo change affects the amplitude pattern as well as the duration. \
             Fade and tempo together give a rhythmic variation that can be tuned for \
             artistic or communication needs."
        );

        md
    }

    /// Markdown table of every analysed file
    pub fn stats_table(&self) -> String {
        let mut md = String::from("| File | Duration (s) | RMS | Peak |\n|---|---:|---:|---:|\n");
        for file in self.all_stats() {
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = writeln!(
                md,
                "| {} | {:.2} | {:.4} | {:.4} |",
                name, file.stats.duration_secs, file.stats.rms, file.stats.peak
            );
        }
        md
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
