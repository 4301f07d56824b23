// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task execution seam
//!
//! A [`TaskRunner`] runs one trial for one animal. The scheduler awaits
//! [`TaskRunner::start`] while detector handlers may call
//! [`TaskRunner::quit`] or [`TaskRunner::on_return`] from elsewhere.

mod context;

pub use context::{SessionContext, StageContext};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTaskFactory, FakeTaskRunner, TaskCall};

use async_trait::async_trait;
use mxbi_core::{AnimalState, Feedback, ScheduleCondition, TaskKind};
use mxbi_storage::StorageError;
use std::sync::Arc;
use thiserror::Error;

/// Errors from task creation and control
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("no stage configured for {task} (animal {animal})")]
    NoStage { task: TaskKind, animal: String },
    #[error("level {level} of {task} has invalid parameters: {source}")]
    InvalidLevel {
        task: TaskKind,
        level: u32,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to quit task: {0}")]
    Quit(String),
}

/// One running trial
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Run the trial to completion, cancellation included
    async fn start(&self) -> Feedback;

    /// Cancel the trial. Idempotent; a pending `start` resolves promptly
    /// with [`Feedback::Cancelled`].
    fn quit(&self) -> Result<(), TaskError>;

    /// The animal came back before the trial was abandoned
    fn on_return(&self);

    fn kind(&self) -> TaskKind;

    /// Schedule in force for the animal while this task runs
    fn condition(&self) -> Option<ScheduleCondition>;
}

/// Builds the task for an animal's current task and level
pub trait TaskFactory: Send + Sync + 'static {
    fn create(
        &self,
        ctx: &SessionContext,
        animal: &AnimalState,
    ) -> Result<Arc<dyn TaskRunner>, TaskError>;
}
