// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler history log
//!
//! Every task switch, level change and scheduler state change is appended
//! as one JSON object per line and synced before the append returns.

use mxbi_core::SchedulerHistoryRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for scheduler history records
pub trait HistorySink: Send + 'static {
    /// Append a record, returning its sequence number
    fn append(&mut self, record: &SchedulerHistoryRecord) -> Result<u64, HistoryError>;
}

/// Append-only JSON-lines history file
pub struct JsonlHistory {
    file: File,
    sequence: u64,
}

impl JsonlHistory {
    /// Open or create the log at `path`
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        // Count existing entries to set sequence number
        let reader = BufReader::new(File::open(path)?);
        let sequence = reader.lines().count() as u64;

        Ok(Self { file, sequence })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read every record from the log
    pub fn replay(path: &Path) -> Result<Vec<SchedulerHistoryRecord>, HistoryError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl HistorySink for JsonlHistory {
    fn append(&mut self, record: &SchedulerHistoryRecord) -> Result<u64, HistoryError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_all()?;
        self.sequence += 1;
        Ok(self.sequence)
    }
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHistory;

impl HistorySink for NoOpHistory {
    fn append(&mut self, _record: &SchedulerHistoryRecord) -> Result<u64, HistoryError> {
        Ok(0)
    }
}

#[derive(Debug, Default)]
struct MemoryHistoryState {
    records: Vec<SchedulerHistoryRecord>,
    failing: bool,
}

/// In-memory history; clones share the same record list
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<Mutex<MemoryHistoryState>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SchedulerHistoryRecord> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .clone()
    }

    /// Make subsequent appends fail with an io error
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }
}

impl HistorySink for MemoryHistory {
    fn append(&mut self, record: &SchedulerHistoryRecord) -> Result<u64, HistoryError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.failing {
            return Err(io::Error::other("history sink unavailable").into());
        }
        inner.records.push(record.clone());
        Ok(inner.records.len() as u64)
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
