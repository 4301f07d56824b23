// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler

use mxbi_adapters::{DetectorError, TaskError};
use mxbi_core::TaskKind;
use mxbi_storage::StorageError;
use thiserror::Error;

/// Errors that end a scheduler run
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already started")]
    AlreadyStarted,
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to create {task} task: {source}")]
    SystemTask {
        task: TaskKind,
        #[source]
        source: TaskError,
    },
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
