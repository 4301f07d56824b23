// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stay-to-reward habituation
//!
//! The animal is rewarded for staying at the apparatus. Rewards arrive at
//! random intervals while it stays, and the trial is correct once the
//! animal has stayed for the level's target duration. The first trial of a
//! visit may open with an entry reward.

use super::{level_params, TrialIds};
use async_trait::async_trait;
use mxbi_adapters::{SessionContext, TaskError, TaskRunner};
use mxbi_core::{AnimalState, Clock, Feedback, ScheduleCondition, TaskKind};
use mxbi_storage::TrialLog;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Parameters of one stay-to-reward level
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct StayLevel {
    #[serde(with = "humantime_serde")]
    pub stay_target: Duration,
    #[serde(default = "default_reward_duration", with = "humantime_serde")]
    pub reward_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub min_reward_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub max_reward_interval: Duration,
    /// Probability of an entry reward on the first trial of a visit
    #[serde(default)]
    pub entry_reward: f64,
}

fn default_reward_duration() -> Duration {
    Duration::from_secs(1)
}

/// One line of the stay-to-reward trial log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayTrialRecord {
    pub animal: String,
    pub level: u32,
    pub trial_id: u64,
    pub level_trial_id: u32,
    pub animal_session_trial_id: u32,
    pub trial_start_time: f64,
    pub trial_end_time: f64,
    pub result: Feedback,
    /// Seconds the animal stayed during this trial
    pub stay_duration: f64,
    pub rewards: u32,
}

pub struct StayToReward<C> {
    ids: TrialIds,
    params: StayLevel,
    condition: ScheduleCondition,
    entry_reward: bool,
    ctx: SessionContext,
    trial_log: Option<TrialLog>,
    clock: C,
    cancel: CancellationToken,
    returned: Notify,
}

impl<C: Clock> StayToReward<C> {
    pub fn new(ctx: &SessionContext, animal: &AnimalState, clock: C) -> Result<Self, TaskError> {
        let (condition, params) = level_params::<StayLevel>(ctx, animal)?;
        let trial_log = ctx.trial_log(&animal.name, animal.task)?;

        let probability = params.entry_reward;
        let entry_reward = animal.current_animal_session_trial_id == 1
            && probability > 0.0
            && ctx.with_rng(|rng| rng.gen_bool(probability.min(1.0)));

        Ok(Self {
            ids: TrialIds::of(animal),
            params,
            condition,
            entry_reward,
            ctx: ctx.clone(),
            trial_log,
            clock,
            cancel: CancellationToken::new(),
            returned: Notify::new(),
        })
    }

    /// Random pause before the next reward
    fn draw_interval(&self) -> Duration {
        let (low, high) = if self.params.min_reward_interval <= self.params.max_reward_interval {
            (self.params.min_reward_interval, self.params.max_reward_interval)
        } else {
            (self.params.max_reward_interval, self.params.min_reward_interval)
        };
        if low == high {
            return low;
        }
        self.ctx.with_rng(|rng| rng.gen_range(low..=high))
    }

    async fn reward(&self, rewards: &mut u32) {
        let rewarder = self.ctx.rewarder();
        match rewarder.give_reward(self.params.reward_duration).await {
            Ok(()) => {
                *rewards += 1;
                let totals = self.ctx.record_stage(&self.ids.animal, |s| s.rewards += 1);
                tracing::debug!(animal = %self.ids.animal, total = totals.rewards, "reward delivered");
            }
            Err(e) => tracing::warn!(animal = %self.ids.animal, error = %e, "reward failed"),
        }
    }

    /// Reward unless the trial is cancelled first; false when cancelled
    async fn reward_unless_cancelled(&self, rewards: &mut u32) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.reward(rewards) => true,
        }
    }

    async fn stay(&self, rewards: &mut u32) -> Feedback {
        if self.cancel.is_cancelled() {
            return Feedback::Cancelled;
        }
        if self.entry_reward {
            if !self.reward_unless_cancelled(rewards).await {
                return Feedback::Cancelled;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Feedback::Cancelled,
                _ = tokio::time::sleep(self.params.reward_duration) => {}
            }
        }

        let mut window_start = Instant::now();
        let mut next_reward = window_start + self.draw_interval();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Feedback::Cancelled,
                _ = self.returned.notified() => {
                    tracing::debug!(animal = %self.ids.animal, "stay window restarted");
                    window_start = Instant::now();
                }
                _ = tokio::time::sleep_until(window_start + self.params.stay_target) => {
                    return Feedback::Correct;
                }
                _ = tokio::time::sleep_until(next_reward) => {
                    if !self.reward_unless_cancelled(rewards).await {
                        return Feedback::Cancelled;
                    }
                    next_reward = Instant::now() + self.params.reward_duration + self.draw_interval();
                }
            }
        }
    }
}

#[async_trait]
impl<C: Clock> TaskRunner for StayToReward<C> {
    async fn start(&self) -> Feedback {
        let trial_start_time = self.clock.timestamp();
        let started = Instant::now();
        let mut rewards = 0;

        let result = self.stay(&mut rewards).await;

        if result.is_cancelled() {
            return result;
        }
        let stayed = started.elapsed();
        self.ctx
            .record_stage(&self.ids.animal, |s| s.duration += stayed);

        let record = StayTrialRecord {
            animal: self.ids.animal.clone(),
            level: self.ids.level,
            trial_id: self.ids.trial_id,
            level_trial_id: self.ids.level_trial_id,
            animal_session_trial_id: self.ids.animal_session_trial_id,
            trial_start_time,
            trial_end_time: self.clock.timestamp(),
            result,
            stay_duration: stayed.as_secs_f64(),
            rewards,
        };
        if let Some(log) = &self.trial_log {
            if let Err(e) = log.append(&record) {
                tracing::warn!(animal = %self.ids.animal, error = %e, "failed to write trial record");
            }
        }
        result
    }

    fn quit(&self) -> Result<(), TaskError> {
        self.cancel.cancel();
        Ok(())
    }

    fn on_return(&self) {
        self.returned.notify_one();
    }

    fn kind(&self) -> TaskKind {
        TaskKind::InitialHabituation
    }

    fn condition(&self) -> Option<ScheduleCondition> {
        Some(self.condition.clone())
    }
}

#[cfg(test)]
#[path = "stay_to_reward_tests.rs"]
mod tests;
