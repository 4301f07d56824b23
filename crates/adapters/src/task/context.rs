// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session context handed to every task the factory builds

use super::TaskError;
use crate::reward::Rewarder;
use mxbi_core::{StageConfig, StageTable, TaskKind};
use mxbi_storage::{SessionDirs, TrialLog};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Running totals for one animal across the trials of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageContext {
    /// Time spent at the apparatus in completed stays
    pub duration: Duration,
    pub rewards: u32,
}

/// Everything a task needs from the session. Cheap to clone; clones share
/// the per-animal totals and the random source.
#[derive(Clone)]
pub struct SessionContext {
    session_id: u32,
    dirs: Option<SessionDirs>,
    stages: Arc<StageTable>,
    rewarder: Arc<dyn Rewarder>,
    stage_contexts: Arc<Mutex<HashMap<String, StageContext>>>,
    rng: Arc<Mutex<StdRng>>,
}

impl SessionContext {
    /// Context without a data directory; trial logs are skipped
    pub fn new(stages: StageTable, rewarder: Arc<dyn Rewarder>) -> Self {
        Self {
            session_id: 0,
            dirs: None,
            stages: Arc::new(stages),
            rewarder,
            stage_contexts: Arc::new(Mutex::new(HashMap::new())),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn with_dirs(mut self, dirs: SessionDirs) -> Self {
        self.session_id = dirs.session_id();
        self.dirs = Some(dirs);
        self
    }

    /// Make every random draw of the session reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn dirs(&self) -> Option<&SessionDirs> {
        self.dirs.as_ref()
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    /// Stage configuration of `task` for `animal`, with the `default` fallback
    pub fn stage(&self, task: TaskKind, animal: &str) -> Result<&StageConfig, TaskError> {
        self.stages
            .lookup(task, animal)
            .ok_or_else(|| TaskError::NoStage {
                task,
                animal: animal.to_string(),
            })
    }

    pub fn rewarder(&self) -> Arc<dyn Rewarder> {
        Arc::clone(&self.rewarder)
    }

    /// Trial log for `animal` running `task`, if the session has a data directory
    pub fn trial_log(&self, animal: &str, task: TaskKind) -> Result<Option<TrialLog>, TaskError> {
        let Some(dirs) = &self.dirs else {
            return Ok(None);
        };
        let dir = dirs.animal_dir(animal)?;
        Ok(Some(TrialLog::for_task(&dir, task.as_str())))
    }

    pub fn stage_context(&self, animal: &str) -> StageContext {
        self.stage_contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(animal)
            .copied()
            .unwrap_or_default()
    }

    /// Update the animal's running totals, returning the new values
    pub fn record_stage(&self, animal: &str, f: impl FnOnce(&mut StageContext)) -> StageContext {
        let mut contexts = self.stage_contexts.lock().unwrap_or_else(|e| e.into_inner());
        let context = contexts.entry(animal.to_string()).or_default();
        f(context);
        *context
    }

    /// Draw from the session's random source
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
