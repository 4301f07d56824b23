// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::reward::{RewardError, Rewarder};
use crate::task::{SessionContext, TaskError, TaskFactory, TaskRunner};
use async_trait::async_trait;
use mxbi_core::{AnimalState, Feedback, ScheduleCondition, TaskKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any TaskFactory and the tasks it builds
#[derive(Clone)]
pub struct TracedTaskFactory<F> {
    inner: F,
}

impl<F> TracedTaskFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: TaskFactory> TaskFactory for TracedTaskFactory<F> {
    fn create(
        &self,
        ctx: &SessionContext,
        animal: &AnimalState,
    ) -> Result<Arc<dyn TaskRunner>, TaskError> {
        let span = tracing::info_span!(
            "task.create",
            animal = %animal.name,
            task = %animal.task,
            level = animal.level
        );
        let _guard = span.enter();

        match self.inner.create(ctx, animal) {
            Ok(runner) => {
                tracing::debug!("created");
                Ok(Arc::new(TracedTaskRunner::new(runner, animal.name.clone())))
            }
            Err(e) => {
                tracing::error!(error = %e, "create failed");
                Err(e)
            }
        }
    }
}

/// Wrapper that adds tracing to a running task
pub struct TracedTaskRunner {
    inner: Arc<dyn TaskRunner>,
    animal: String,
}

impl TracedTaskRunner {
    pub fn new(inner: Arc<dyn TaskRunner>, animal: String) -> Self {
        Self { inner, animal }
    }
}

#[async_trait]
impl TaskRunner for TracedTaskRunner {
    async fn start(&self) -> Feedback {
        let span = tracing::info_span!("task.start", animal = %self.animal, task = %self.inner.kind());
        async {
            tracing::info!("starting");
            let start = Instant::now();
            let feedback = self.inner.start().await;
            tracing::info!(
                ?feedback,
                elapsed_ms = elapsed_ms(start.elapsed()),
                "finished"
            );
            feedback
        }
        .instrument(span)
        .await
    }

    fn quit(&self) -> Result<(), TaskError> {
        let span = tracing::info_span!("task.quit", animal = %self.animal, task = %self.inner.kind());
        let _guard = span.enter();

        let result = self.inner.quit();
        match &result {
            Ok(()) => tracing::debug!("quit requested"),
            Err(e) => tracing::warn!(error = %e, "quit failed"),
        }
        result
    }

    fn on_return(&self) {
        tracing::info!(animal = %self.animal, task = %self.inner.kind(), "animal returned");
        self.inner.on_return();
    }

    fn kind(&self) -> TaskKind {
        self.inner.kind()
    }

    fn condition(&self) -> Option<ScheduleCondition> {
        self.inner.condition()
    }
}

/// Wrapper that adds tracing to any Rewarder
#[derive(Clone)]
pub struct TracedRewarder<R> {
    inner: R,
}

impl<R> TracedRewarder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Rewarder> Rewarder for TracedRewarder<R> {
    async fn give_reward(&self, duration: Duration) -> Result<(), RewardError> {
        let span = tracing::info_span!("reward", duration_ms = elapsed_ms(duration));
        async {
            let start = Instant::now();
            let result = self.inner.give_reward(duration).await;
            match &result {
                Ok(()) => tracing::debug!(elapsed_ms = elapsed_ms(start.elapsed()), "delivered"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start.elapsed()),
                    error = %e,
                    "reward failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn elapsed_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
