// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Difficulty adaptation
//!
//! [`evaluate`] is a pure decision over an animal's counters and attached
//! condition. [`increase`], [`decrease`] and [`advance_task`] apply a move
//! and report what changed; callers persist and log the returned
//! [`Progression`].

use crate::animal::AnimalState;
use crate::task::TaskKind;

/// What the policy wants after a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoOp,
    Increase,
    Decrease,
}

/// Task and level before and after an applied move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub previous_task: TaskKind,
    pub previous_level: u32,
    pub task: TaskKind,
    pub level: u32,
}

impl Progression {
    fn capture(state: &AnimalState) -> Self {
        Self {
            previous_task: state.task,
            previous_level: state.level,
            task: state.task,
            level: state.level,
        }
    }

    fn finish(mut self, state: &AnimalState) -> Self {
        self.task = state.task;
        self.level = state.level;
        self
    }

    pub fn task_changed(&self) -> bool {
        self.task != self.previous_task
    }

    pub fn level_changed(&self) -> bool {
        self.level != self.previous_level
    }
}

/// Decide whether the animal should move up, down, or stay
pub fn evaluate(state: &AnimalState) -> Decision {
    let Some(condition) = state.condition.as_ref() else {
        return Decision::NoOp;
    };
    let Some(correct_rate) = state.correct_rate() else {
        return Decision::NoOp;
    };

    if state.current_level_trial_id < condition.evaluation_interval {
        return Decision::NoOp;
    }

    if correct_rate >= condition.difficulty_increase_threshold {
        Decision::Increase
    } else if condition.allow_decrease && correct_rate <= condition.difficulty_decrease_threshold {
        Decision::Decrease
    } else {
        Decision::NoOp
    }
}

/// Apply a decision; `None` when nothing moved
pub fn apply(state: &mut AnimalState, decision: Decision) -> Option<Progression> {
    match decision {
        Decision::NoOp => None,
        Decision::Increase => increase(state),
        Decision::Decrease => decrease(state),
    }
}

/// Move one level up, or on to the next task from the top level.
///
/// At the top level of a task without a successor the animal stays put and
/// `None` is returned.
pub fn increase(state: &mut AnimalState) -> Option<Progression> {
    let (top_level, next_task) = {
        let condition = state.condition.as_ref()?;
        (condition.top_level(), condition.next_task)
    };
    let progression = Progression::capture(state);

    if state.level < top_level {
        state.level += 1;
    } else {
        switch_task(state, next_task?);
    }

    state.reset();
    Some(progression.finish(state))
}

/// Move one level down; `None` at level 0
pub fn decrease(state: &mut AnimalState) -> Option<Progression> {
    if state.level == 0 {
        return None;
    }
    let progression = Progression::capture(state);
    state.level -= 1;
    state.reset();
    Some(progression.finish(state))
}

/// Jump straight to the condition's next task at level 0
pub fn advance_task(state: &mut AnimalState) -> Option<Progression> {
    let next_task = state.condition.as_ref()?.next_task?;
    let progression = Progression::capture(state);
    switch_task(state, next_task);
    state.reset();
    Some(progression.finish(state))
}

fn switch_task(state: &mut AnimalState, task: TaskKind) {
    state.task = task;
    state.level = 0;
    // The attached schedule belonged to the previous task
    state.condition = None;
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
