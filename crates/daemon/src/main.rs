// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mxbi station daemon (mxbid)
//!
//! Runs one training session on one apparatus: loads the configuration,
//! drives the scheduler and forwards operator keys from stdin.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod detector;
mod lifecycle;
mod operator;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mxbi_core::SessionConfig;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::lifecycle::{write_startup_error, write_startup_marker, LifecycleError, Paths};
use crate::operator::OperatorCommand;

const DEFAULT_CONFIG: &str = "mxbi.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = SessionConfig::load(&config_path)?;
    let paths = Paths::for_config(&config)?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&paths.log_path)?;
    let log_guard = setup_logging(&paths.log_path)?;
    info!(config = %config_path.display(), "starting mxbid");

    let today = chrono::Local::now().date_naive();
    let station = match lifecycle::startup(&config, paths.clone(), today) {
        Ok(station) => station,
        Err(e) => {
            write_startup_error(&paths.log_path, &e);
            error!(error = %e, "failed to start station");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut operator_input = spawn_operator_input()?;
    let mut input_open = true;

    let handle = station.scheduler.handle();
    let mut run = tokio::spawn({
        let scheduler = Arc::clone(&station.scheduler);
        async move { scheduler.run().await }
    });

    println!("READY");

    let result = loop {
        tokio::select! {
            result = &mut run => break result,

            line = operator_input.recv(), if input_open => {
                let Some(line) = line else {
                    info!("operator input closed");
                    input_open = false;
                    continue;
                };
                match OperatorCommand::parse(&line) {
                    Some(command) => {
                        info!(?command, "operator command");
                        operator::apply(command, &handle, station.mock.as_ref());
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(input = %line.trim(), "unknown operator command"),
                }
            }

            // Graceful shutdown on SIGTERM
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                handle.quit();
            }

            // Graceful shutdown on SIGINT
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                handle.quit();
            }
        }
    };

    station.shutdown();
    match result {
        Ok(Ok(())) => {
            info!("mxbid stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "scheduler failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "scheduler task panicked");
            Err(e.into())
        }
    }
}

/// Read stdin lines on a dedicated thread; a blocking read must not hold up
/// runtime shutdown
fn spawn_operator_input() -> Result<mpsc::UnboundedReceiver<String>, LifecycleError> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let directory = log_path.parent().ok_or(LifecycleError::NoDataDir)?;
    let file_name = log_path.file_name().ok_or(LifecycleError::NoDataDir)?;
    std::fs::create_dir_all(directory)?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
