// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-animal training record
//!
//! One `AnimalState` exists per configured animal for the lifetime of a
//! session. Counters follow two rules:
//! - `trial_id` only grows
//! - `current_level_trial_id` and `correct_trial` are zeroed together by
//!   [`AnimalState::reset`] whenever the task or level changes

use crate::condition::ScheduleCondition;
use crate::task::{Feedback, TaskKind};
use serde::{Deserialize, Serialize};

/// Persisted training position of one animal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalProgress {
    pub task: TaskKind,
    pub level: u32,
    #[serde(default)]
    pub level_trial_id: Option<u32>,
}

/// Mutable training state of one animal
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalState {
    pub name: String,
    pub task: TaskKind,
    pub level: u32,
    /// Lifetime trial counter
    pub trial_id: u64,
    /// Trials since the last level or task change
    pub current_level_trial_id: u32,
    /// Correct trials since the last level or task change
    pub correct_trial: u32,
    /// Epoch seconds when the animal last arrived; 0 while absent
    pub animal_session_start_time: f64,
    /// Trials since the animal last arrived
    pub current_animal_session_trial_id: u32,
    /// Schedule attached when the current task was created
    pub condition: Option<ScheduleCondition>,
}

impl AnimalState {
    pub fn new(name: impl Into<String>, task: TaskKind, level: u32) -> Self {
        Self {
            name: name.into(),
            task,
            level,
            trial_id: 0,
            current_level_trial_id: 0,
            correct_trial: 0,
            animal_session_start_time: 0.0,
            current_animal_session_trial_id: 0,
            condition: None,
        }
    }

    /// Placeholder record handed to system tasks, which run for nobody
    pub fn system() -> Self {
        Self::new("", TaskKind::Idle, 0)
    }

    /// Restore the in-level trial counter saved by a previous session
    pub fn with_level_trial_id(mut self, level_trial_id: u32) -> Self {
        self.current_level_trial_id = level_trial_id;
        self
    }

    /// Fraction of correct trials at the current level, `None` before the first trial
    pub fn correct_rate(&self) -> Option<f64> {
        if self.current_level_trial_id == 0 {
            return None;
        }
        Some(f64::from(self.correct_trial) / f64::from(self.current_level_trial_id))
    }

    /// Record a finished trial. Cancelled trials leave every counter untouched.
    pub fn update(&mut self, feedback: Feedback) {
        if feedback.is_cancelled() {
            return;
        }
        self.trial_id += 1;
        self.current_level_trial_id += 1;
        if feedback.is_correct() {
            self.correct_trial += 1;
        }
    }

    /// Zero the in-level counters
    pub fn reset(&mut self) {
        self.current_level_trial_id = 0;
        self.correct_trial = 0;
    }

    /// Mark the animal as arrived at `timestamp`
    pub fn enter_session(&mut self, timestamp: f64) {
        self.animal_session_start_time = timestamp;
    }

    /// Bookkeeping for an animal walking away
    pub fn leave_session(&mut self) {
        self.animal_session_start_time = 0.0;
        self.current_animal_session_trial_id = 0;
    }

    pub fn is_present(&self) -> bool {
        self.animal_session_start_time > 0.0
    }

    /// The persisted view of this state
    pub fn progress(&self) -> AnimalProgress {
        let present_level_trial_id = self
            .condition
            .as_ref()
            .map(|c| c.present_level_trial_id)
            .unwrap_or(false);
        AnimalProgress {
            task: self.task,
            level: self.level,
            level_trial_id: present_level_trial_id.then_some(self.current_level_trial_id),
        }
    }
}

#[cfg(test)]
#[path = "animal_tests.rs"]
mod tests;
