// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifiers and trial feedback
//!
//! The set of task kinds is closed: adding a training paradigm means adding
//! a variant here and a constructor arm in the engine's task registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a training task (or one of the reserved system tasks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Attract display shown while no animal is present
    Idle,
    /// Fault display shown after a detector error
    Error,
    /// Stay-to-reward habituation: reward the animal for staying at the apparatus
    InitialHabituation,
    /// Headless trial that resolves from a configured strategy
    Mock,
}

impl TaskKind {
    /// All task kinds, in declaration order
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Idle,
        TaskKind::Error,
        TaskKind::InitialHabituation,
        TaskKind::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Idle => "idle",
            TaskKind::Error => "error",
            TaskKind::InitialHabituation => "initial_habituation",
            TaskKind::Mock => "mock",
        }
    }

    /// Reserved tasks run by the scheduler itself, never assigned to an animal's training
    pub fn is_system(&self) -> bool {
        matches!(self, TaskKind::Idle | TaskKind::Error)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a task identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task: {0}")]
pub struct UnknownTask(pub String);

impl FromStr for TaskKind {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTask(s.to_string()))
    }
}

/// Outcome of one trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Correct,
    Incorrect,
    /// The trial was interrupted by `quit()`; it does not count toward any score
    Cancelled,
}

impl Feedback {
    pub fn is_correct(&self) -> bool {
        matches!(self, Feedback::Correct)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Feedback::Cancelled)
    }
}

impl From<bool> for Feedback {
    fn from(correct: bool) -> Self {
        if correct {
            Feedback::Correct
        } else {
            Feedback::Incorrect
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
