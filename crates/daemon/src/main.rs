// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! EventBridge Local Daemon (ebld)
//!
//! Serves `PutEvents`, shares entries with other daemons over the broker,
//! and runs subscribed handlers and schedules.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};

use clap::Parser;
use ebl_core::Config;
use ebl_daemon::{lifecycle, Args, ProjectFile};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut project = ProjectFile::load(&args.config)?;
    args.apply(&mut project.event_bridge);

    let _log_guard = setup_logging(&project.event_bridge, args.log_file.as_deref())?;

    let project_dir = project_dir(&args.config);
    info!(
        config = %args.config.display(),
        project_dir = %project_dir.display(),
        "starting ebld"
    );

    let daemon = match lifecycle::startup(&project, &project_dir).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown();
    info!("Daemon stopped");
    Ok(())
}

/// Handlers run from the directory holding the project file
fn project_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn setup_logging(
    config: &Config,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)?;
            let file_name = path.file_name().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("log file has no name: {}", path.display()),
                )
            })?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
