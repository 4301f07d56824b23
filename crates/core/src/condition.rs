// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Difficulty-schedule configuration
//!
//! A stage is the configuration of one task for one animal (or the
//! `default` entry shared by every animal without its own). It carries the
//! schedule thresholds and an ordered table of levels; the level count of a
//! schedule is the length of that table.

use crate::task::TaskKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which the stage shared by all animals is stored
pub const DEFAULT_STAGE_KEY: &str = "default";

/// Thresholds and progression as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub evaluation_interval: u32,
    pub difficulty_increase_threshold: f64,
    pub difficulty_decrease_threshold: f64,
    #[serde(default)]
    pub allow_decrease: bool,
    #[serde(default)]
    pub next_task: Option<TaskKind>,
    #[serde(default)]
    pub present_level_trial_id: bool,
}

/// The difficulty schedule in force for an animal's current task and level.
///
/// Immutable once built; a new one is attached to the animal every time a
/// task is created for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCondition {
    pub level_count: u32,
    pub evaluation_interval: u32,
    pub difficulty_increase_threshold: f64,
    pub difficulty_decrease_threshold: f64,
    pub allow_decrease: bool,
    pub next_task: Option<TaskKind>,
    pub present_level_trial_id: bool,
}

impl ScheduleCondition {
    /// Highest level index reachable within the task
    pub fn top_level(&self) -> u32 {
        self.level_count.saturating_sub(1)
    }
}

/// Per-level parameters.
///
/// `evaluation_interval` overrides the stage's value for this level. All
/// other keys belong to the task and are decoded with [`LevelParams::decode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    #[serde(default)]
    pub evaluation_interval: Option<u32>,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl LevelParams {
    /// Decode the task-specific part of the level into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone()))
    }
}

/// Configuration of one task for one animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub condition: ConditionConfig,
    #[serde(default)]
    pub levels: Vec<LevelParams>,
}

impl StageConfig {
    /// Number of levels; a stage without a level table has one implicit level
    pub fn level_count(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX).max(1)
    }

    pub fn level(&self, level: u32) -> Option<&LevelParams> {
        self.levels.get(usize::try_from(level).ok()?)
    }

    /// Build the schedule condition in force at `level`
    pub fn condition_at(&self, level: u32) -> ScheduleCondition {
        let evaluation_interval = self
            .level(level)
            .and_then(|l| l.evaluation_interval)
            .unwrap_or(self.condition.evaluation_interval);

        ScheduleCondition {
            level_count: self.level_count(),
            evaluation_interval,
            difficulty_increase_threshold: self.condition.difficulty_increase_threshold,
            difficulty_decrease_threshold: self.condition.difficulty_decrease_threshold,
            allow_decrease: self.condition.allow_decrease,
            next_task: self.condition.next_task,
            present_level_trial_id: self.condition.present_level_trial_id,
        }
    }
}

/// Stage configurations for every task, keyed by animal name with a `default` fallback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTable {
    stages: BTreeMap<TaskKind, BTreeMap<String, StageConfig>>,
}

impl StageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: TaskKind, key: impl Into<String>, stage: StageConfig) {
        self.stages.entry(task).or_default().insert(key.into(), stage);
    }

    /// Stage for `animal`, falling back to the task's `default` entry
    pub fn lookup(&self, task: TaskKind, animal: &str) -> Option<&StageConfig> {
        let by_animal = self.stages.get(&task)?;
        by_animal
            .get(animal)
            .or_else(|| by_animal.get(DEFAULT_STAGE_KEY))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
