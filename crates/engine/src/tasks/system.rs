// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle and error screens

use async_trait::async_trait;
use mxbi_adapters::{TaskError, TaskRunner};
use mxbi_core::{Feedback, ScheduleCondition, TaskKind};
use tokio_util::sync::CancellationToken;

/// Runs until cancelled or until an animal returns
pub struct SystemTask {
    kind: TaskKind,
    cancel: CancellationToken,
}

impl SystemTask {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl TaskRunner for SystemTask {
    async fn start(&self) -> Feedback {
        tracing::debug!(task = %self.kind, "system task shown");
        self.cancel.cancelled().await;
        Feedback::Cancelled
    }

    fn quit(&self) -> Result<(), TaskError> {
        self.cancel.cancel();
        Ok(())
    }

    fn on_return(&self) {
        self.cancel.cancel();
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn condition(&self) -> Option<ScheduleCondition> {
        None
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
