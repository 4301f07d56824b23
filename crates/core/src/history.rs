// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler run states and the history records emitted on transitions

use crate::animal::AnimalState;
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the scheduler loop is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Nobody present; the idle task is shown
    Idle,
    /// An animal is present and trains on its task
    Schedule,
    /// The detector reported a fault; the error task is shown
    Error,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "IDLE",
            RunState::Schedule => "SCHEDULE",
            RunState::Error => "ERROR",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of transition a history record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerEvent {
    TaskSwitch,
    LevelChange,
    StateChange,
}

/// One line of the scheduler history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerHistoryRecord {
    pub event: SchedulerEvent,
    pub timestamp: f64,
    pub scheduler_state: RunState,
    pub running: bool,
    pub animal_name: Option<String>,
    pub task: Option<TaskKind>,
    pub level: Option<u32>,
    pub trial_id: Option<u64>,
    pub current_level_trial_id: Option<u32>,
    pub correct_trial: Option<u32>,
    pub correct_rate: Option<f64>,
    pub previous_state: Option<RunState>,
    pub new_state: Option<RunState>,
    pub reason: Option<String>,
    pub previous_task: Option<TaskKind>,
    pub previous_level: Option<u32>,
}

impl SchedulerHistoryRecord {
    /// Snapshot the scheduler and, if given, the animal's counters
    pub fn snapshot(
        event: SchedulerEvent,
        timestamp: f64,
        scheduler_state: RunState,
        running: bool,
        animal: Option<&AnimalState>,
    ) -> Self {
        Self {
            event,
            timestamp,
            scheduler_state,
            running,
            animal_name: animal.map(|a| a.name.clone()),
            task: animal.map(|a| a.task),
            level: animal.map(|a| a.level),
            trial_id: animal.map(|a| a.trial_id),
            current_level_trial_id: animal.map(|a| a.current_level_trial_id),
            correct_trial: animal.map(|a| a.correct_trial),
            correct_rate: animal.and_then(|a| a.correct_rate()),
            previous_state: None,
            new_state: None,
            reason: None,
            previous_task: None,
            previous_level: None,
        }
    }

    pub fn with_states(mut self, previous: RunState, new: RunState) -> Self {
        self.previous_state = Some(previous);
        self.new_state = Some(new);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_previous_task(mut self, task: TaskKind) -> Self {
        self.previous_task = Some(task);
        self
    }

    pub fn with_previous_level(mut self, level: u32) -> Self {
        self.previous_level = Some(level);
        self
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
