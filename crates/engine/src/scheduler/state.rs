// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler state guarded by the scheduler lock
//!
//! Every mutation of the run state, the active animal and the per-animal
//! training records happens through [`Shared`] while the lock is held.
//! Task calls are never made under the lock: methods that need the running
//! task quit or notified return a [`TaskAction`] for the caller to perform
//! after releasing it.

use mxbi_adapters::TaskRunner;
use mxbi_core::{
    policy, AnimalState, DetectorEvent, Feedback, Progression, RunState, SchedulerEvent,
    SchedulerHistoryRecord, TaskKind,
};
use mxbi_storage::{HistorySink, ProgressStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The task the run loop is currently awaiting
#[derive(Clone)]
pub(crate) struct ActiveTask {
    pub id: u64,
    pub task: Arc<dyn TaskRunner>,
}

/// Work on the running task, performed after the lock is released
pub(crate) enum TaskAction {
    Quit(Arc<dyn TaskRunner>),
    Return(Arc<dyn TaskRunner>),
}

/// Identity of a started trial, used to match its feedback on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrialTicket {
    pub id: u64,
    /// `None` for system tasks
    pub animal: Option<String>,
    pub task: TaskKind,
    pub level: u32,
}

pub(crate) struct Shared<P, H> {
    pub running: bool,
    pub state: RunState,
    pub active: Option<String>,
    pub current_task: Option<ActiveTask>,
    pub animals: BTreeMap<String, AnimalState>,
    next_task_id: u64,
    progress: P,
    history: H,
}

impl<P: ProgressStore, H: HistorySink> Shared<P, H> {
    pub fn new(animals: BTreeMap<String, AnimalState>, progress: P, history: H) -> Self {
        Self {
            running: false,
            state: RunState::Schedule,
            active: None,
            current_task: None,
            animals,
            next_task_id: 0,
            progress,
            history,
        }
    }

    pub fn active_animal(&self) -> Option<&AnimalState> {
        self.animals.get(self.active.as_deref()?)
    }

    /// Install `task` as the running task and return its ticket
    pub fn install(
        &mut self,
        task: Arc<dyn TaskRunner>,
        animal: Option<String>,
        kind: TaskKind,
        level: u32,
    ) -> TrialTicket {
        self.next_task_id += 1;
        let ticket = TrialTicket {
            id: self.next_task_id,
            animal,
            task: kind,
            level,
        };
        self.current_task = Some(ActiveTask {
            id: ticket.id,
            task,
        });
        ticket
    }

    fn running_task(&self) -> Option<Arc<dyn TaskRunner>> {
        self.current_task.as_ref().map(|active| Arc::clone(&active.task))
    }

    /// Move to `new_state`, logging the change. No-op when already there.
    pub fn transition(&mut self, new_state: RunState, reason: &str, timestamp: f64) {
        let previous = self.state;
        if previous == new_state {
            return;
        }
        self.state = new_state;
        tracing::info!(from = %previous, to = %new_state, reason, "scheduler state changed");

        let record = SchedulerHistoryRecord::snapshot(
            SchedulerEvent::StateChange,
            timestamp,
            self.state,
            self.running,
            self.active_animal(),
        )
        .with_states(previous, new_state)
        .with_reason(reason);
        self.record(&record);
    }

    /// Apply one detector event
    pub fn apply_event(&mut self, event: &DetectorEvent, timestamp: f64) -> Option<TaskAction> {
        match event {
            DetectorEvent::AnimalEntered { name } => {
                self.select(name, timestamp, "animal_entered")?;
                self.running_task().map(TaskAction::Quit)
            }
            DetectorEvent::AnimalChanged { name } => {
                self.select(name, timestamp, "animal_changed")?;
                self.running_task().map(TaskAction::Quit)
            }
            DetectorEvent::AnimalReturned { name } => {
                if !self.animals.contains_key(name) {
                    tracing::error!(animal = %name, "unknown animal from detector");
                    return None;
                }
                self.active = Some(name.clone());
                if let Some(animal) = self.animals.get_mut(name) {
                    animal.enter_session(timestamp);
                }
                self.transition(RunState::Schedule, "animal_returned", timestamp);
                self.running_task().map(TaskAction::Return)
            }
            DetectorEvent::AnimalLeft => {
                if let Some(animal) = self
                    .active
                    .as_deref()
                    .and_then(|name| self.animals.get_mut(name))
                {
                    animal.leave_session();
                }
                self.transition(RunState::Idle, "animal_left", timestamp);
                self.running_task().map(TaskAction::Quit)
            }
            DetectorEvent::AnimalStayed => {
                self.transition(RunState::Schedule, "animal_stayed", timestamp);
                let task = self.running_task()?;
                let animal = self.active_animal()?;
                // Only the idle screen yields to a staying animal
                if animal.task == TaskKind::Idle || task.kind() != TaskKind::Idle {
                    return None;
                }
                Some(TaskAction::Quit(task))
            }
            DetectorEvent::ErrorDetected => {
                self.transition(RunState::Error, "error_detected", timestamp);
                self.running_task().map(TaskAction::Quit)
            }
        }
    }

    /// Make `name` the active animal and stamp its arrival
    fn select(&mut self, name: &str, timestamp: f64, reason: &str) -> Option<()> {
        let Some(animal) = self.animals.get_mut(name) else {
            tracing::error!(animal = %name, "unknown animal from detector");
            return None;
        };
        animal.enter_session(timestamp);
        let previous = self.active.replace(name.to_string());
        if let Some(previous) = previous.filter(|previous| previous != name) {
            if let Some(animal) = self.animals.get_mut(&previous) {
                animal.leave_session();
            }
        }
        self.transition(RunState::Schedule, reason, timestamp);
        Some(())
    }

    /// Operator forces the active animal on to its next task
    pub fn advance_task(&mut self, timestamp: f64) -> Option<TaskAction> {
        let Some(name) = self.active.clone() else {
            tracing::warn!("no animal selected, cannot advance task");
            return None;
        };
        let action = self.current_task.take().map(|a| TaskAction::Quit(a.task));

        let Some(animal) = self.animals.get_mut(&name) else {
            return action;
        };
        match policy::advance_task(animal) {
            Some(progression) => {
                tracing::info!(
                    animal = %name,
                    from = %progression.previous_task,
                    to = %progression.task,
                    "manual task advance"
                );
                self.persist(&name);
                self.log_task_switch(&name, progression.previous_task, timestamp);
                self.log_level_change(&name, progression.previous_level, timestamp);
            }
            None => tracing::warn!(animal = %name, "manual task advance requested but no next task is defined"),
        }
        action
    }

    /// Operator forces one difficulty increase for the active animal
    pub fn advance_level(&mut self, timestamp: f64) -> Option<TaskAction> {
        let Some(name) = self.active.clone() else {
            tracing::warn!("no animal selected, cannot advance level");
            return None;
        };
        let has_condition = self
            .animals
            .get(&name)
            .is_some_and(|animal| animal.condition.is_some());
        if !has_condition {
            tracing::warn!(animal = %name, "manual level advance requested but no condition is defined");
            return None;
        }
        let action = self.current_task.take().map(|a| TaskAction::Quit(a.task));

        let Some(animal) = self.animals.get_mut(&name) else {
            return action;
        };
        match policy::increase(animal) {
            Some(progression) => {
                tracing::info!(
                    animal = %name,
                    task = %progression.task,
                    level = progression.level,
                    "manual level advance"
                );
                self.persist(&name);
                self.log_progression(&name, progression, timestamp);
            }
            None => tracing::info!(
                animal = %name,
                "manual level advance requested but already at the highest level"
            ),
        }
        action
    }

    /// Fold a finished trial into its animal's record and run the policy
    pub fn finish_trial(&mut self, ticket: &TrialTicket, feedback: Feedback, timestamp: f64) {
        if self.current_task.as_ref().is_some_and(|a| a.id == ticket.id) {
            self.current_task = None;
        }
        let Some(name) = ticket.animal.as_deref() else {
            return;
        };
        let Some(animal) = self.animals.get_mut(name) else {
            return;
        };
        if animal.task != ticket.task || animal.level != ticket.level {
            tracing::debug!(animal = %name, ?feedback, "discarding feedback of a superseded task");
            return;
        }
        if feedback.is_cancelled() {
            tracing::debug!(animal = %name, task = %ticket.task, "trial cancelled");
            return;
        }

        animal.update(feedback);
        tracing::info!(
            animal = %name,
            task = %animal.task,
            level = animal.level,
            ?feedback,
            trial_id = animal.trial_id,
            level_trial_id = animal.current_level_trial_id,
            correct_trial = animal.correct_trial,
            "trial finished"
        );

        let decision = policy::evaluate(animal);
        let progression = policy::apply(animal, decision);
        let has_condition = animal.condition.is_some();

        if let Some(progression) = progression {
            tracing::info!(animal = %name, ?decision, task = %progression.task, level = progression.level, "difficulty adjusted");
            self.persist(name);
            self.log_progression(name, progression, timestamp);
        } else if has_condition {
            self.persist(name);
        }
    }

    /// Reset every animal that trained this session and persist it
    pub fn shutdown(&mut self) -> Option<Arc<dyn TaskRunner>> {
        self.running = false;
        let names: Vec<String> = self
            .animals
            .values_mut()
            .filter(|animal| animal.condition.is_some())
            .map(|animal| {
                animal.reset();
                animal.name.clone()
            })
            .collect();
        for name in &names {
            self.persist(name);
        }
        self.current_task.take().map(|a| a.task)
    }

    fn persist(&mut self, name: &str) {
        let Some(animal) = self.animals.get(name) else {
            return;
        };
        if let Err(e) = self.progress.save(name, &animal.progress()) {
            tracing::warn!(animal = %name, error = %e, "failed to persist progress");
        }
    }

    fn log_progression(&mut self, name: &str, progression: Progression, timestamp: f64) {
        if progression.task_changed() {
            self.log_task_switch(name, progression.previous_task, timestamp);
        } else {
            self.log_level_change(name, progression.previous_level, timestamp);
        }
    }

    fn log_task_switch(&mut self, name: &str, previous_task: TaskKind, timestamp: f64) {
        let Some(animal) = self.animals.get(name) else {
            return;
        };
        if animal.task == previous_task {
            return;
        }
        let record = SchedulerHistoryRecord::snapshot(
            SchedulerEvent::TaskSwitch,
            timestamp,
            self.state,
            self.running,
            Some(animal),
        )
        .with_previous_task(previous_task);
        self.record(&record);
    }

    fn log_level_change(&mut self, name: &str, previous_level: u32, timestamp: f64) {
        let Some(animal) = self.animals.get(name) else {
            return;
        };
        if animal.level == previous_level {
            return;
        }
        let record = SchedulerHistoryRecord::snapshot(
            SchedulerEvent::LevelChange,
            timestamp,
            self.state,
            self.running,
            Some(animal),
        )
        .with_previous_level(previous_level);
        self.record(&record);
    }

    fn record(&mut self, record: &SchedulerHistoryRecord) {
        if let Err(e) = self.history.append(record) {
            tracing::warn!(error = %e, "failed to write scheduler history");
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
