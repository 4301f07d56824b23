// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-trial JSON-lines data file

use crate::StorageError;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends one JSON object per finished trial
#[derive(Debug, Clone)]
pub struct TrialLog {
    path: PathBuf,
}

impl TrialLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<animal_dir>/<task>.jsonl`
    pub fn for_task(animal_dir: &Path, task: &str) -> Self {
        Self::new(animal_dir.join(format!("{task}.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        let line = serde_json::to_string(record)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "trial_log_tests.rs"]
mod tests;
