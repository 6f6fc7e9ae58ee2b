//! Announcement speaker console - main entry point
//!
//! Headless core of the airport announcement station: fetches schedules
//! from the collaborator service and plays rendered announcements over the
//! configured multi-zone output device.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use speaker_console::app::App;
use speaker_console::config::Config;

/// Command-line arguments for speaker-console
#[derive(Parser, Debug)]
#[command(name = "speaker-console")]
#[command(about = "Airport announcement speaker console")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "speaker.toml", env = "SPEAKER_CONFIG")]
    config: PathBuf,

    /// Override the collaborator base URL from the config file
    #[arg(long, env = "SPEAKER_API_URL")]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }

    init_tracing(&config)?;

    info!(
        api_url = %config.api_url,
        device = config.device.name.as_deref().unwrap_or("<default>"),
        "starting speaker console"
    );

    // Startup-critical checks (zone catalog, output device) happen inside
    // bootstrap; the process must not come up without them.
    let app = App::bootstrap(config)
        .await
        .context("failed to initialize the console")?;
    info!("console initialized");

    app.run(shutdown_signal()).await?;

    info!("console shutdown complete");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "speaker_console={0},speaker_common={0}",
            config.logging.level
        ))
    });

    match &config.logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create log dir {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
