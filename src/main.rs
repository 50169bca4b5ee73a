//! Auralab CLI - Audio Experiment Runner
//!
//! Command-line interface for the auralab audio experiments.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use auralab::cli::{commands, Cli, Commands};
use auralab::AuralabError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still wins over the default filter
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Auralab v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd).map_err(|err| {
            if let Some(cause) = err.downcast_ref::<AuralabError>() {
                eprintln!("[{}] {:#}", cause.error_code(), err);
                for suggestion in cause.recovery_suggestions() {
                    eprintln!("  - {}", suggestion);
                }
            }
            err
        }),
        None => {
            println!("Auralab v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    debug!("Command: {:?}", cmd);

    match cmd {
        Commands::Run {
            files,
            work_dir,
            config,
            discard_audio,
            json,
        } => commands::run(&files, &work_dir, config.as_deref(), discard_audio, json)
            .with_context(|| format!("experiment in {} failed", work_dir.display())),
        Commands::Analyze { file } => commands::analyze(&file)
            .with_context(|| format!("failed to analyze {}", file.display())),
        Commands::Fade {
            file,
            in_ms,
            out_ms,
            curve,
        } => commands::fade(&file, in_ms, out_ms, curve)
            .with_context(|| format!("failed to fade {}", file.display())),
        Commands::Tempo { file, rate } => commands::tempo(&file, rate)
            .with_context(|| format!("failed to change tempo of {}", file.display())),
        Commands::Clip {
            file,
            head,
            tail: _,
            ms,
        } => commands::clip(&file, head, ms)
            .with_context(|| format!("failed to clip {}", file.display())),
        Commands::Plot {
            file,
            title,
            output,
        } => commands::plot(&file, title.as_deref(), output.as_deref())
            .with_context(|| format!("failed to plot {}", file.display())),
        Commands::Tone {
            output,
            freq,
            secs,
            sample_rate,
            stereo,
        } => commands::tone(&output, freq, secs, sample_rate, stereo)
            .with_context(|| format!("failed to write {}", output.display())),
        Commands::Clean { work_dir } => commands::clean(&work_dir)
            .with_context(|| format!("failed to clean {}", work_dir.display())),
    }
}
