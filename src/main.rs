//! silver-anno CLI entry point.

use anyhow::Result;
use clap::Parser;
use silver_anno::cli::{commands, Cli, Commands};
use silver_anno::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Load .env files if present (API keys). Variables already set win, so the
    // project directory's file takes precedence over the working directory's.
    if let Some(base) = settings.base_dir() {
        let _ = dotenvy::from_path(base.join(".env"));
    }
    let _ = dotenvy::dotenv();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("silver_anno={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match &cli.command {
        Commands::Annotate {
            input_file,
            output_dir,
            keep_input,
            provider,
            model,
        } => {
            commands::run_annotate(
                input_file,
                output_dir.clone(),
                *keep_input,
                provider.clone(),
                model.clone(),
                settings,
            )
            .await?;
        }

        Commands::Validate { input, column } => {
            commands::run_validate(input, column)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
