//! Integration Tests
//!
//! End-to-end runs of the experiment over generated test tones.

use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use auralab::config::ExperimentConfig;
use auralab::engine::{
    analyze_file, export_audio, generate_stereo_test_tone, generate_test_tone, import_audio,
    ExportFormat,
};
use auralab::pipeline::{Experiment, Stage};
use auralab::render::{Block, MarkdownSurface, MemorySurface};
use auralab::report::DISCUSSION;
use auralab::storage::{RetentionPolicy, Storage, Upload};
use auralab::AuralabError;

const RATE: u32 = 8000;

/// Write a mono tone as WAV and read it back as an upload
fn tone_upload(dir: &TempDir, name: &str, freq: f32, secs: f32) -> Upload {
    let path = dir.path().join(name);
    export_audio(&generate_test_tone(freq, secs, RATE), &path, ExportFormat::pcm16()).unwrap();
    Upload::from_path(&path).unwrap()
}

fn duration(path: &Path) -> f64 {
    analyze_file(path).unwrap().duration_secs
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

/// Short clips with short fades
fn quick_config() -> ExperimentConfig {
    ExperimentConfig {
        fade_in_ms: 500,
        fade_out_ms: 500,
        clip_ms: 1000,
        clip_fade_ms: 300,
        ..ExperimentConfig::default()
    }
}

// === Full Experiment ===

#[test]
fn test_two_30s_clips() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "first.wav", 220.0, 30.0),
        tone_upload(&inputs, "second.wav", 330.0, 30.0),
    ];

    let mut experiment = Experiment::new(Storage::new(work.path()), ExperimentConfig::default());
    let mut surface = MemorySurface::new();
    let report = experiment
        .run(&uploads, &mut surface)
        .unwrap()
        .expect("two uploads should run the experiment");

    assert_eq!(experiment.stage(), Stage::Narrated);
    let outputs = &report.outputs;

    assert_eq!(outputs.faded.len(), 2);
    for path in &outputs.faded {
        assert!(file_name(path).ends_with("_fade.wav"));
        assert_abs_diff_eq!(duration(path), 30.0, epsilon = 1e-3);
    }

    assert_eq!(outputs.slow.len(), 2);
    for path in &outputs.slow {
        assert!(file_name(path).ends_with("_075x.wav"));
        assert_abs_diff_eq!(duration(path), 40.0, epsilon = 0.01);
    }

    assert_eq!(outputs.fast.len(), 2);
    for path in &outputs.fast {
        assert!(file_name(path).ends_with("_15x.wav"));
        assert_abs_diff_eq!(duration(path), 20.0, epsilon = 0.01);
    }

    assert!(file_name(&outputs.podcast.intro).starts_with("podcast_intro_fade_"));
    assert!(file_name(&outputs.podcast.outro).starts_with("podcast_outro_fade_"));
    assert!(duration(&outputs.podcast.intro) <= 10.0);
    assert!(duration(&outputs.podcast.outro) <= 10.0);

    assert_eq!(outputs.combined.len(), 2);
    for path in &outputs.combined {
        assert!(file_name(path).ends_with("_fade_12x.wav"));
        assert_abs_diff_eq!(duration(path), 25.0, epsilon = 0.01);
    }

    // Intro fades in from silence, outro fades out to it
    let intro = import_audio(&outputs.podcast.intro).unwrap();
    assert!(intro.samples[0][0].abs() < 1e-3);
    let outro = import_audio(&outputs.podcast.outro).unwrap();
    assert!(outro.samples[0][outro.len() - 1].abs() < 1e-3);

    assert_eq!(report.removed_files, 0);
    assert_eq!(report.narrative.originals.len(), 2);
    assert_abs_diff_eq!(
        report.narrative.originals[0].stats.rms,
        0.5 / 2.0_f32.sqrt(),
        epsilon = 1e-3
    );
}

#[test]
fn test_surface_receives_every_stage() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 3.0),
        tone_upload(&inputs, "b.wav", 330.0, 2.0),
    ];

    let mut experiment = Experiment::new(Storage::new(work.path()), quick_config());
    let mut surface = MemorySurface::new();
    experiment.run(&uploads, &mut surface).unwrap().unwrap();

    assert_eq!(
        surface.headers(),
        vec![
            Stage::AwaitingUpload.title(),
            Stage::Saved.title(),
            Stage::Faded.title(),
            Stage::TempoShifted.title(),
            Stage::PodcastSimulated.title(),
            Stage::Combined.title(),
            Stage::Narrated.title(),
            "Discussion",
        ]
    );

    // 2 originals, 2 faded, 4 tempo, intro, outro, 2 combined
    assert_eq!(surface.plots.len(), 12);
    assert_eq!(surface.audio_paths().len(), 12);
    for block in &surface.blocks {
        if let Block::Audio(path) = block {
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    assert_eq!(
        surface.blocks.last(),
        Some(&Block::Markdown(DISCUSSION.to_string()))
    );
}

#[test]
fn test_stereo_and_mono_inputs() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();

    let stereo_path = inputs.path().join("stereo.wav");
    export_audio(
        &generate_stereo_test_tone(220.0, 330.0, 2.0, RATE),
        &stereo_path,
        ExportFormat::default(),
    )
    .unwrap();
    let uploads = vec![
        Upload::from_path(&stereo_path).unwrap(),
        tone_upload(&inputs, "mono.wav", 330.0, 2.0),
    ];

    let mut experiment = Experiment::new(Storage::new(work.path()), quick_config());
    let report = experiment
        .run(&uploads, &mut MemorySurface::new())
        .unwrap()
        .unwrap();

    let slow_stereo = import_audio(&report.outputs.slow[0]).unwrap();
    assert_eq!(slow_stereo.channels(), 2);
    assert_eq!(slow_stereo.sample_rate, RATE);
    let slow_mono = import_audio(&report.outputs.slow[1]).unwrap();
    assert_eq!(slow_mono.channels(), 1);

    assert_abs_diff_eq!(duration(&report.outputs.podcast.intro), 1.0, epsilon = 1e-3);
    assert_eq!(import_audio(&report.outputs.podcast.intro).unwrap().channels(), 2);
}

// === Tempo Rates ===

#[test]
fn test_rates_with_shared_digits_get_separate_files() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 3.0),
        tone_upload(&inputs, "b.wav", 330.0, 3.0),
    ];
    let config = ExperimentConfig {
        slow_rate: 1.5,
        fast_rate: 15.0,
        ..quick_config()
    };

    let mut experiment = Experiment::new(Storage::new(work.path()), config);
    let report = experiment
        .run(&uploads, &mut MemorySurface::new())
        .unwrap()
        .unwrap();

    for (slow, fast) in report.outputs.slow.iter().zip(&report.outputs.fast) {
        assert_ne!(slow, fast);
        assert!(file_name(slow).ends_with("_15x.wav"));
        assert!(file_name(fast).ends_with("_150x.wav"));
        assert_abs_diff_eq!(duration(slow), 2.0, epsilon = 0.01);
        assert_abs_diff_eq!(duration(fast), 0.2, epsilon = 0.01);
    }
    assert_abs_diff_eq!(report.narrative.slow[0].stats.duration_secs, 2.0, epsilon = 0.01);
    assert_abs_diff_eq!(report.narrative.fast[0].stats.duration_secs, 0.2, epsilon = 0.01);
}

#[test]
fn test_rates_naming_the_same_file_are_rejected_before_saving() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let work_dir = work.path().join("uploads");
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 1.0),
        tone_upload(&inputs, "b.wav", 330.0, 1.0),
    ];
    let config = ExperimentConfig {
        slow_rate: 1.05,
        fast_rate: 10.5,
        ..quick_config()
    };

    let mut experiment = Experiment::new(Storage::new(&work_dir), config);
    let err = experiment
        .run(&uploads, &mut MemorySurface::new())
        .unwrap_err();

    assert!(matches!(err, AuralabError::InvalidParameter { .. }));
    assert_eq!(experiment.stage(), Stage::AwaitingUpload);
    assert!(!work_dir.exists());
}

// === Upload Count ===

#[test]
fn test_wrong_upload_count_writes_nothing() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let work_dir = work.path().join("uploads");
    let upload = tone_upload(&inputs, "a.wav", 220.0, 1.0);

    for uploads in [vec![], vec![upload.clone()], vec![upload.clone(); 3]] {
        let mut experiment =
            Experiment::new(Storage::new(&work_dir), ExperimentConfig::default());
        let mut surface = MemorySurface::new();

        assert!(experiment.run(&uploads, &mut surface).unwrap().is_none());
        assert_eq!(experiment.stage(), Stage::AwaitingUpload);
        assert_eq!(surface.blocks.len(), 1);
    }
    assert!(!work_dir.exists());
}

#[test]
fn test_second_run_rejected() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 1.5),
        tone_upload(&inputs, "b.wav", 330.0, 1.5),
    ];

    let mut experiment = Experiment::new(Storage::new(work.path()), quick_config());
    experiment.run(&uploads, &mut MemorySurface::new()).unwrap();

    let err = experiment
        .run(&uploads, &mut MemorySurface::new())
        .unwrap_err();
    assert!(matches!(err, AuralabError::InvalidParameter { .. }));
}

// === Storage Retention ===

#[test]
fn test_discard_audio_keeps_uploads_only() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 2.0),
        tone_upload(&inputs, "b.wav", 330.0, 2.0),
    ];

    let storage = Storage::new(work.path()).with_retention(RetentionPolicy::DiscardAudio);
    let mut experiment = Experiment::new(storage, quick_config());
    let report = experiment
        .run(&uploads, &mut MemorySurface::new())
        .unwrap()
        .unwrap();

    assert_eq!(report.removed_files, 10);
    for path in report
        .outputs
        .faded
        .iter()
        .chain(&report.outputs.slow)
        .chain(&report.outputs.fast)
        .chain(&report.outputs.combined)
    {
        assert!(!path.exists());
    }
    assert!(!report.outputs.podcast.intro.exists());
    for upload in &report.uploads {
        assert!(upload.path.exists());
    }
}

// === Markdown Report ===

#[test]
fn test_markdown_report() {
    let inputs = tempdir().unwrap();
    let work = tempdir().unwrap();
    let uploads = vec![
        tone_upload(&inputs, "a.wav", 220.0, 2.0),
        tone_upload(&inputs, "b.wav", 330.0, 2.0),
    ];

    let mut experiment = Experiment::new(Storage::new(work.path()), quick_config());
    let mut surface = MarkdownSurface::new(work.path());
    let report = experiment.run(&uploads, &mut surface).unwrap().unwrap();
    let report_path = surface.finish().unwrap();

    let markdown = fs::read_to_string(report_path).unwrap();
    assert!(markdown.contains("## 1. Fade in/out"));
    assert!(markdown.contains("## Discussion"));
    assert!(markdown.contains(&report.narrative.to_markdown().trim_end().to_string()));

    let svgs = fs::read_dir(work.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "svg"))
        .count();
    assert_eq!(svgs, 12);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["uploads"].as_array().unwrap().len(), 2);
}
