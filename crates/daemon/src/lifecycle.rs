// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use fs2::FileExt;
use mxbi_adapters::{
    DetectorError, LogRewarder, MockControl, NoOpRewarder, Rewarder, SessionContext,
    TracedRewarder, TracedTaskFactory,
};
use mxbi_core::{ConfigError, RewarderKind, SessionConfig, SystemClock};
use mxbi_engine::{Scheduler, SchedulerDeps, SchedulerError, TaskRegistry};
use mxbi_storage::{HistoryError, JsonProgressStore, JsonlHistory, SessionDirs, StorageError};
use thiserror::Error;
use tracing::{info, warn};

use crate::detector::StationDetector;

/// Scheduler with the concrete adapters the daemon runs
pub type StationScheduler = Scheduler<
    StationDetector,
    TracedTaskFactory<TaskRegistry<SystemClock>>,
    JsonProgressStore,
    JsonlHistory,
    SystemClock,
>;

/// Filesystem locations derived from the configuration
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Per-animal progress shared by every session
    pub progress_path: PathBuf,
}

impl Paths {
    /// Use the configured data directory, or `<platform data dir>/mxbi`
    pub fn for_config(config: &SessionConfig) -> Result<Self, LifecycleError> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or(LifecycleError::NoDataDir)?
                .join("mxbi"),
        };
        Ok(Self::in_dir(data_dir))
    }

    pub fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            lock_path: data_dir.join("mxbid.pid"),
            log_path: data_dir.join("mxbid.log"),
            progress_path: data_dir.join("progress.json"),
            data_dir,
        }
    }
}

/// A started station, ready to run
pub struct Station {
    pub paths: Paths,
    pub dirs: SessionDirs,
    pub scheduler: Arc<StationScheduler>,
    /// Present when the mock detector is configured
    pub mock: Option<MockControl>,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl Station {
    /// Release the apparatus
    pub fn shutdown(self) {
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!(error = %e, "failed to remove PID file");
            }
        }
        info!(session_id = self.dirs.session_id(), "station shut down");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine data directory")]
    NoDataDir,

    #[error("failed to acquire lock: mxbid already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the station
pub fn startup(
    config: &SessionConfig,
    paths: Paths,
    today: NaiveDate,
) -> Result<Station, LifecycleError> {
    match startup_inner(config, paths.clone(), today) {
        Ok(station) => Ok(station),
        Err(e) => {
            cleanup_on_failure(&paths, &e);
            Err(e)
        }
    }
}

fn startup_inner(
    config: &SessionConfig,
    paths: Paths,
    today: NaiveDate,
) -> Result<Station, LifecycleError> {
    std::fs::create_dir_all(&paths.data_dir)?;

    // Acquire lock file FIRST; one daemon per apparatus
    let mut lock_file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let dirs = SessionDirs::allocate(&paths.data_dir, today)?;
    let detector = StationDetector::from_config(config)?;
    let mock = detector.mock_control();

    let progress = JsonProgressStore::open(&paths.progress_path)?;
    let history = JsonlHistory::open(&dirs.history_path())?;

    let ctx = SessionContext::new(config.stage_table()?, rewarder(config.rewarder))
        .with_dirs(dirs.clone());
    let scheduler = Scheduler::new(
        SchedulerDeps {
            detector,
            factory: TracedTaskFactory::new(TaskRegistry::new(SystemClock)),
            progress,
            history,
        },
        ctx,
        &config.animals,
        SystemClock,
    )?;

    info!(
        experimenter = %config.experimenter,
        session_id = dirs.session_id(),
        session_dir = %dirs.root().display(),
        animals = config.animals.len(),
        "station started"
    );

    Ok(Station {
        paths,
        dirs,
        scheduler: Arc::new(scheduler),
        mock,
        lock_file,
    })
}

fn rewarder(kind: RewarderKind) -> Arc<dyn Rewarder> {
    match kind {
        RewarderKind::Log => Arc::new(TracedRewarder::new(LogRewarder::new())),
        RewarderKind::None => Arc::new(TracedRewarder::new(NoOpRewarder::new())),
    }
}

/// Remove the PID file unless another daemon holds it
fn cleanup_on_failure(paths: &Paths, error: &LifecycleError) {
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- mxbid: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- mxbid: starting (pid: ";

/// Append the startup marker to the log file
pub fn write_startup_marker(log_path: &Path) -> Result<(), LifecycleError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write a startup error synchronously; the tracing writer may not flush in time
pub fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start mxbid: {}", error);
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
