//! Subliminal CLI
//!
//! Command-line interface for the subliminal mixer.

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use subliminal::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Subliminal Mixer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Subliminal Mixer v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Mix {
            affirmation,
            background,
            output_dir,
            settings,
        } => {
            commands::mix(&affirmation, &background, &output_dir, &settings).map_err(|e| {
                eprintln!("{}", e.friendly_message());
                for suggestion in e.recovery_suggestions() {
                    eprintln!("  - {}", suggestion);
                }
                e
            })?;
        }
        Commands::Batch {
            folder,
            background,
            output_dir,
            settings,
        } => {
            commands::batch(&folder, &background, &output_dir, &settings)
                .with_context(|| format!("batch over {} failed", folder.display()))?;
        }
        Commands::Inspect { path } => commands::inspect_file(&path)
            .with_context(|| format!("{} is not a usable audio file", path.display()))?,
        Commands::GenerateTestAudio { dir } => commands::generate_test_audio(&dir)
            .with_context(|| format!("could not write test audio to {}", dir.display()))?,
        Commands::Cleanup {
            folders,
            max_age_hours,
            max_files,
        } => commands::cleanup(&folders, max_age_hours, max_files)?,
        Commands::Limits => commands::print_limits()?,
    }
    Ok(())
}
