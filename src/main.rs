mod app;
mod audio;
mod catalog;
mod config;
mod error;
mod messages;
mod permission;
mod services;
mod session;
mod ui;

use app::App;
use config::Config;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;

    tracing::info!("starting voxnote");

    let config = Config::load()?;
    config.validate()?;

    // LocalSet for !Send futures: the recorder holds a cpal::Stream and the
    // player a rodio::OutputStream.
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move { App::new(config).run().await })
        .await
}

/// Logs go to a file: stdout belongs to the terminal UI. Level is taken
/// from the VOXNOTE_LOG env filter, `info` by default.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = Config::config_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory: {log_dir:?}"))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &log_dir,
        "voxnote.log",
    ));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VOXNOTE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
