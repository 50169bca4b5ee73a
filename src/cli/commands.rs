//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::ExperimentConfig;
use crate::dsp::{apply_to_file, change_tempo, Clip, Fade, FadeCurve};
use crate::engine::{
    analyze_file, export_audio, generate_stereo_test_tone, generate_test_tone, ExportFormat,
};
use crate::error::{AuralabError, Result};
use crate::pipeline::{Experiment, Stage, REQUIRED_UPLOADS};
use crate::render::{MarkdownSurface, WaveformPlot};
use crate::storage::{purge_dir, RetentionPolicy, Storage, Upload};

/// File name of the JSON report in the work directory
pub const REPORT_JSON: &str = "report.json";

/// Storage for single-effect commands: outputs land next to the input
fn storage_beside(file: &Path) -> Storage {
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Storage::new(dir)
}

/// Run the full experiment.
pub fn run(
    files: &[PathBuf],
    work_dir: &Path,
    config: Option<&Path>,
    discard_audio: bool,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            info!("Loading config: {}", path.display());
            ExperimentConfig::load(path)?
        }
        None => ExperimentConfig::default(),
    };

    let uploads = files
        .iter()
        .map(|f| Upload::from_path(f))
        .collect::<Result<Vec<_>>>()?;

    let retention = if discard_audio {
        RetentionPolicy::DiscardAudio
    } else {
        RetentionPolicy::Keep
    };
    let storage = Storage::new(work_dir).with_retention(retention);
    let mut experiment = Experiment::new(storage, config);
    let mut surface = MarkdownSurface::new(work_dir);
    if discard_audio {
        surface = surface.without_audio_links();
    }

    let report = match experiment.run(&uploads, &mut surface)? {
        Some(report) => report,
        None => {
            println!("{}", Stage::AwaitingUpload.title());
            println!(
                "Got {} file(s); pass exactly {} audio files (MP3 or WAV).",
                files.len(),
                REQUIRED_UPLOADS
            );
            return Ok(());
        }
    };

    let report_path = surface.finish()?;

    println!("=== Auralab Experiment ===");
    for upload in &report.uploads {
        println!(
            "Saved {} -> {} (sha256 {})",
            upload.original_name,
            upload.path.display(),
            &upload.checksum[..12]
        );
    }
    println!();
    println!("{}", report.narrative.stats_table());

    if json {
        let json_path = work_dir.join(REPORT_JSON);
        fs::write(&json_path, report.to_json()?).map_err(|e| AuralabError::FileWrite {
            path: json_path.clone(),
            source: e,
        })?;
        println!("JSON report: {}", json_path.display());
    }

    if report.removed_files > 0 {
        println!("Removed {} derived audio files.", report.removed_files);
    }
    println!("Report: {}", report_path.display());

    Ok(())
}

/// Print duration, RMS and peak of a file.
pub fn analyze(file: &Path) -> Result<()> {
    let stats = analyze_file(file)?;

    println!("File: {}", file.display());
    println!("Duration: {:.2} s", stats.duration_secs);
    println!("RMS: {:.4} ({:.1} dBFS)", stats.rms, stats.rms_db());
    println!("Peak: {:.4} ({:.1} dBFS)", stats.peak, stats.peak_db());
    if let Some(crest) = stats.crest_factor() {
        println!("Crest factor: {:.2}", crest);
    }

    Ok(())
}

/// Fade a file in and out.
pub fn fade(file: &Path, in_ms: u32, out_ms: u32, curve: FadeCurve) -> Result<()> {
    let fade = Fade::new(in_ms, out_ms).with_curve(curve);
    let output = apply_to_file(&mut storage_beside(file), file, &fade)?;
    println!("Faded: {}", output.display());
    Ok(())
}

/// Change the tempo of a file.
pub fn tempo(file: &Path, rate: f64) -> Result<()> {
    let output = change_tempo(&mut storage_beside(file), file, rate)?;
    println!("Tempo {}x: {}", rate, output.display());
    Ok(())
}

/// Cut the start or end out of a file.
pub fn clip(file: &Path, head: bool, ms: u32) -> Result<()> {
    let clip = if head { Clip::Head(ms) } else { Clip::Tail(ms) };
    let output = apply_to_file(&mut storage_beside(file), file, &clip)?;
    println!("Clipped: {}", output.display());
    Ok(())
}

/// Render one waveform SVG.
pub fn plot(file: &Path, title: Option<&str>, output: Option<&Path>) -> Result<()> {
    let title = match title {
        Some(t) => t.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.with_extension("svg"));

    WaveformPlot::from_file(file, title)?.save_svg(&output)?;
    println!("Plot: {}", output.display());
    Ok(())
}

/// Write a sine test tone.
pub fn tone(output: &Path, freq: f32, secs: f32, sample_rate: u32, stereo: bool) -> Result<()> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(AuralabError::invalid_parameter("secs", "must be positive"));
    }
    if sample_rate == 0 {
        return Err(AuralabError::invalid_parameter("sample_rate", "must be positive"));
    }

    let buffer = if stereo {
        generate_stereo_test_tone(freq, freq, secs, sample_rate)
    } else {
        generate_test_tone(freq, secs, sample_rate)
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    export_audio(&buffer, output, ExportFormat::default())?;

    println!(
        "Tone: {} ({} Hz, {:.2} s, {} Hz, {} ch)",
        output.display(),
        freq,
        buffer.duration_secs(),
        sample_rate,
        buffer.channels()
    );
    Ok(())
}

/// Purge the work directory.
pub fn clean(work_dir: &Path) -> Result<()> {
    let removed = purge_dir(work_dir)?;
    println!("Removed {} files from {}", removed, work_dir.display());
    Ok(())
}
