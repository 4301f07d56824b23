// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake task factory for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SessionContext, TaskError, TaskFactory, TaskRunner};
use async_trait::async_trait;
use mxbi_core::{AnimalState, Feedback, ScheduleCondition, TaskKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Recorded task call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCall {
    Create {
        animal: String,
        task: TaskKind,
        level: u32,
    },
    Start {
        animal: String,
        task: TaskKind,
    },
    Finish {
        animal: String,
        task: TaskKind,
        feedback: Feedback,
    },
    Quit {
        animal: String,
        task: TaskKind,
    },
    OnReturn {
        animal: String,
        task: TaskKind,
    },
}

struct FactoryState {
    feedback: VecDeque<Feedback>,
    conditions: HashMap<TaskKind, ScheduleCondition>,
    failing: HashSet<TaskKind>,
    quit_fails: bool,
    trial_duration: Duration,
    calls: Vec<TaskCall>,
}

/// Factory whose training tasks resolve with scripted feedback.
///
/// Each training task takes the next scripted feedback and resolves after
/// the trial duration; once the script is exhausted, and for system tasks,
/// `start` waits until `quit`.
#[derive(Clone)]
pub struct FakeTaskFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl Default for FakeTaskFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTaskFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FactoryState {
                feedback: VecDeque::new(),
                conditions: HashMap::new(),
                failing: HashSet::new(),
                quit_fails: false,
                trial_duration: Duration::from_secs(1),
                calls: Vec::new(),
            })),
        }
    }

    /// Condition attached to animals running `task`
    pub fn with_condition(self, task: TaskKind, condition: ScheduleCondition) -> Self {
        self.lock().conditions.insert(task, condition);
        self
    }

    pub fn with_trial_duration(self, duration: Duration) -> Self {
        self.lock().trial_duration = duration;
        self
    }

    /// Append feedback for upcoming training trials
    pub fn script(&self, feedback: impl IntoIterator<Item = Feedback>) {
        self.lock().feedback.extend(feedback);
    }

    pub fn remaining_feedback(&self) -> usize {
        self.lock().feedback.len()
    }

    /// Make creation of `task` fail
    pub fn fail_create(&self, task: TaskKind) {
        self.lock().failing.insert(task);
    }

    /// Make `quit` report an error (the task is still cancelled)
    pub fn set_quit_fails(&self, fails: bool) {
        self.lock().quit_fails = fails;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TaskCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FactoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TaskFactory for FakeTaskFactory {
    fn create(
        &self,
        _ctx: &SessionContext,
        animal: &AnimalState,
    ) -> Result<Arc<dyn TaskRunner>, TaskError> {
        let mut state = self.lock();
        state.calls.push(TaskCall::Create {
            animal: animal.name.clone(),
            task: animal.task,
            level: animal.level,
        });
        if state.failing.contains(&animal.task) {
            return Err(TaskError::NoStage {
                task: animal.task,
                animal: animal.name.clone(),
            });
        }
        let feedback = if animal.task.is_system() {
            None
        } else {
            state.feedback.pop_front()
        };
        Ok(Arc::new(FakeTaskRunner {
            animal: animal.name.clone(),
            kind: animal.task,
            condition: state.conditions.get(&animal.task).cloned(),
            feedback,
            trial_duration: state.trial_duration,
            cancel: CancellationToken::new(),
            factory: Arc::clone(&self.state),
        }))
    }
}

/// Task created by [`FakeTaskFactory`]
pub struct FakeTaskRunner {
    animal: String,
    kind: TaskKind,
    condition: Option<ScheduleCondition>,
    feedback: Option<Feedback>,
    trial_duration: Duration,
    cancel: CancellationToken,
    factory: Arc<Mutex<FactoryState>>,
}

impl FakeTaskRunner {
    fn record(&self, call: TaskCall) {
        self.factory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .push(call);
    }
}

#[async_trait]
impl TaskRunner for FakeTaskRunner {
    async fn start(&self) -> Feedback {
        self.record(TaskCall::Start {
            animal: self.animal.clone(),
            task: self.kind,
        });
        let feedback = match self.feedback {
            Some(feedback) => tokio::select! {
                _ = self.cancel.cancelled() => Feedback::Cancelled,
                _ = tokio::time::sleep(self.trial_duration) => feedback,
            },
            None => {
                self.cancel.cancelled().await;
                Feedback::Cancelled
            }
        };
        self.record(TaskCall::Finish {
            animal: self.animal.clone(),
            task: self.kind,
            feedback,
        });
        feedback
    }

    fn quit(&self) -> Result<(), TaskError> {
        self.record(TaskCall::Quit {
            animal: self.animal.clone(),
            task: self.kind,
        });
        self.cancel.cancel();
        let fails = self
            .factory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .quit_fails;
        if fails {
            return Err(TaskError::Quit("injected quit failure".to_string()));
        }
        Ok(())
    }

    fn on_return(&self) {
        self.record(TaskCall::OnReturn {
            animal: self.animal.clone(),
            task: self.kind,
        });
        if self.kind.is_system() {
            self.cancel.cancel();
        }
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn condition(&self) -> Option<ScheduleCondition> {
        self.condition.clone()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
