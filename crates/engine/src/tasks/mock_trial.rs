// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted trial for exercising the scheduler without an animal-facing task

use super::{level_params, TrialIds};
use async_trait::async_trait;
use mxbi_adapters::{SessionContext, TaskError, TaskRunner};
use mxbi_core::{AnimalState, Clock, Feedback, ScheduleCondition, TaskKind};
use mxbi_storage::TrialLog;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a mock trial decides its outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockStrategy {
    #[default]
    AlwaysCorrect,
    AlwaysIncorrect,
    /// Correct on even lifetime trial ids
    Alternate,
    /// Correct with probability `correct_probability`
    Random,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct MockLevel {
    #[serde(default = "default_latency", with = "humantime_serde")]
    pub latency: Duration,
    #[serde(default)]
    pub strategy: MockStrategy,
    #[serde(default = "default_correct_probability")]
    pub correct_probability: f64,
}

fn default_latency() -> Duration {
    Duration::from_secs(1)
}

fn default_correct_probability() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MockTrialRecord {
    animal: String,
    level: u32,
    trial_id: u64,
    level_trial_id: u32,
    strategy: MockStrategy,
    trial_start_time: f64,
    trial_end_time: f64,
    result: Feedback,
}

pub struct MockTrial<C> {
    ids: TrialIds,
    latency: Duration,
    strategy: MockStrategy,
    outcome: Feedback,
    condition: ScheduleCondition,
    trial_log: Option<TrialLog>,
    clock: C,
    cancel: CancellationToken,
}

impl<C: Clock> MockTrial<C> {
    pub fn new(ctx: &SessionContext, animal: &AnimalState, clock: C) -> Result<Self, TaskError> {
        let (condition, params) = level_params::<MockLevel>(ctx, animal)?;
        let trial_log = ctx.trial_log(&animal.name, animal.task)?;

        let correct = match params.strategy {
            MockStrategy::AlwaysCorrect => true,
            MockStrategy::AlwaysIncorrect => false,
            MockStrategy::Alternate => animal.trial_id % 2 == 0,
            MockStrategy::Random => {
                let p = params.correct_probability;
                p > 0.0 && ctx.with_rng(|rng| rng.gen_bool(p.min(1.0)))
            }
        };

        Ok(Self {
            ids: TrialIds::of(animal),
            latency: params.latency,
            strategy: params.strategy,
            outcome: if correct {
                Feedback::Correct
            } else {
                Feedback::Incorrect
            },
            condition,
            trial_log,
            clock,
            cancel: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl<C: Clock> TaskRunner for MockTrial<C> {
    async fn start(&self) -> Feedback {
        let trial_start_time = self.clock.timestamp();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Feedback::Cancelled,
            _ = tokio::time::sleep(self.latency) => {}
        }

        if let Some(log) = &self.trial_log {
            let record = MockTrialRecord {
                animal: self.ids.animal.clone(),
                level: self.ids.level,
                trial_id: self.ids.trial_id,
                level_trial_id: self.ids.level_trial_id,
                strategy: self.strategy,
                trial_start_time,
                trial_end_time: self.clock.timestamp(),
                result: self.outcome,
            };
            if let Err(e) = log.append(&record) {
                tracing::warn!(animal = %self.ids.animal, error = %e, "failed to write trial record");
            }
        }
        self.outcome
    }

    fn quit(&self) -> Result<(), TaskError> {
        self.cancel.cancel();
        Ok(())
    }

    fn on_return(&self) {}

    fn kind(&self) -> TaskKind {
        TaskKind::Mock
    }

    fn condition(&self) -> Option<ScheduleCondition> {
        Some(self.condition.clone())
    }
}

#[cfg(test)]
#[path = "mock_trial_tests.rs"]
mod tests;
