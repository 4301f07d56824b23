// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-animal progress store
//!
//! Holds `{task, level, level_trial_id}` for every animal. The JSON store
//! rewrites one file per save: temp sibling, fsync, rename.

use mxbi_core::AnimalProgress;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read/write access to persisted animal progress
pub trait ProgressStore: Send + 'static {
    /// Every saved animal
    fn load_all(&self) -> Result<BTreeMap<String, AnimalProgress>, StorageError>;

    /// Replace one animal's progress and make it durable
    fn save(&mut self, name: &str, progress: &AnimalProgress) -> Result<(), StorageError>;
}

/// JSON file-based progress store
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    cache: BTreeMap<String, AnimalProgress>,
}

impl JsonProgressStore {
    /// Open the store at `path`, reading it if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let cache = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, cache })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.cache)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn load_all(&self) -> Result<BTreeMap<String, AnimalProgress>, StorageError> {
        Ok(self.cache.clone())
    }

    fn save(&mut self, name: &str, progress: &AnimalProgress) -> Result<(), StorageError> {
        self.cache.insert(name.to_string(), progress.clone());
        self.flush()
    }
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    inner: Arc<Mutex<BTreeMap<String, AnimalProgress>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, progress: AnimalProgress) -> Self {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), progress);
        self
    }

    pub fn get(&self, name: &str) -> Option<AnimalProgress> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load_all(&self) -> Result<BTreeMap<String, AnimalProgress>, StorageError> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&mut self, name: &str, progress: &AnimalProgress) -> Result<(), StorageError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), progress.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
