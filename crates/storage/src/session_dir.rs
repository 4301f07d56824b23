// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dated session data directories: `<data_dir>/<YYYYMMDD>/<session_id>/<animal>/`

use crate::StorageError;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = "scheduler_history.jsonl";

/// Directory layout of one training session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDirs {
    root: PathBuf,
    session_id: u32,
}

impl SessionDirs {
    /// Allocate the next session id for `date` and create its directory.
    ///
    /// The id is one past the largest numeric directory already present for
    /// that day, or 0 for the first session.
    pub fn allocate(data_dir: &Path, date: NaiveDate) -> Result<Self, StorageError> {
        let day = data_dir.join(date.format("%Y%m%d").to_string());
        let session_id = next_session_id(&day)?;
        let root = day.join(session_id.to_string());
        fs::create_dir_all(&root)?;
        tracing::debug!(path = %root.display(), session_id, "allocated session directory");
        Ok(Self { root, session_id })
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// The animal's directory, created on first use
    pub fn animal_dir(&self, animal: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(animal);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

fn next_session_id(day: &Path) -> Result<u32, StorageError> {
    let entries = match fs::read_dir(day) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<u32> = None;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
            latest = latest.max(Some(id));
        }
    }
    Ok(latest.map_or(0, |id| id + 1))
}

#[cfg(test)]
#[path = "session_dir_tests.rs"]
mod tests;
