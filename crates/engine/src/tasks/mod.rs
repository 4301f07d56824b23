// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in tasks and the registry that creates them

mod mock_trial;
mod stay_to_reward;
mod system;

pub use mock_trial::{MockStrategy, MockTrial};
pub use stay_to_reward::{StayToReward, StayTrialRecord};
pub use system::SystemTask;

use mxbi_adapters::{SessionContext, TaskError, TaskFactory, TaskRunner};
use mxbi_core::{AnimalState, Clock, ScheduleCondition, TaskKind};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Production task factory over the closed set of task kinds
#[derive(Clone)]
pub struct TaskRegistry<C> {
    clock: C,
}

impl<C: Clock> TaskRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> TaskFactory for TaskRegistry<C> {
    fn create(
        &self,
        ctx: &SessionContext,
        animal: &AnimalState,
    ) -> Result<Arc<dyn TaskRunner>, TaskError> {
        match animal.task {
            TaskKind::Idle | TaskKind::Error => Ok(Arc::new(SystemTask::new(animal.task))),
            TaskKind::InitialHabituation => Ok(Arc::new(StayToReward::new(
                ctx,
                animal,
                self.clock.clone(),
            )?)),
            TaskKind::Mock => Ok(Arc::new(MockTrial::new(ctx, animal, self.clock.clone())?)),
        }
    }
}

/// Condition and decoded level parameters for the animal's current level.
///
/// A stage without a level table decodes its single level from an empty
/// parameter map.
pub(crate) fn level_params<T: DeserializeOwned>(
    ctx: &SessionContext,
    animal: &AnimalState,
) -> Result<(ScheduleCondition, T), TaskError> {
    let stage = ctx.stage(animal.task, &animal.name)?;
    let condition = stage.condition_at(animal.level);
    let params = stage
        .level(animal.level)
        .cloned()
        .unwrap_or_default()
        .decode()
        .map_err(|source| TaskError::InvalidLevel {
            task: animal.task,
            level: animal.level,
            source,
        })?;
    Ok((condition, params))
}

/// Snapshot of the counters a trial record reports
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrialIds {
    pub animal: String,
    pub level: u32,
    pub trial_id: u64,
    pub level_trial_id: u32,
    pub animal_session_trial_id: u32,
}

impl TrialIds {
    pub fn of(animal: &AnimalState) -> Self {
        Self {
            animal: animal.name.clone(),
            level: animal.level,
            trial_id: animal.trial_id,
            level_trial_id: animal.current_level_trial_id,
            animal_session_trial_id: animal.current_animal_session_trial_id,
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
