// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session configuration
//!
//! Loaded once from TOML at startup. Task stages are keyed by task
//! identifier, then by animal name (or `default`).

use crate::condition::{StageConfig, StageTable};
use crate::task::{TaskKind, UnknownTask};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    UnknownTask(#[from] UnknownTask),
    #[error("stage {task}/{stage}: next_task cannot be the system task {next}")]
    SystemNextTask {
        task: TaskKind,
        stage: String,
        next: TaskKind,
    },
    #[error("animal {0} is assigned a system task")]
    SystemTaskAssigned(String),
    #[error("rfid {rfid} is assigned to both {first} and {second}")]
    DuplicateRfid {
        rfid: String,
        first: String,
        second: String,
    },
    #[error("rfid detector requires a port")]
    MissingPort,
}

/// Which detector drives presence events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    Mock,
    Rfid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub kind: DetectorKind,
    /// Serial device the RFID reader is attached to
    #[serde(default)]
    pub port: Option<PathBuf>,
    /// Time without a re-detection after which the animal counts as gone
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
    #[serde(default, with = "humantime_serde")]
    pub return_window: Duration,
    /// Mock only: report the first animal as present on start
    #[serde(default = "default_true")]
    pub enter_on_start: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::default(),
            port: None,
            debounce: default_debounce(),
            return_window: Duration::ZERO,
            enter_on_start: true,
        }
    }
}

fn default_debounce() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

fn default_experimenter() -> String {
    "auto".to_string()
}

/// Starting position of one animal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalConfig {
    #[serde(default)]
    pub rfid_id: Option<String>,
    pub task: TaskKind,
    #[serde(default)]
    pub level: u32,
}

/// Reward peripheral selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewarderKind {
    /// Log each reward without actuating anything
    #[default]
    Log,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_experimenter")]
    pub experimenter: String,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub rewarder: RewarderKind,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub animals: BTreeMap<String, AnimalConfig>,
    #[serde(default)]
    pub tasks: BTreeMap<String, BTreeMap<String, StageConfig>>,
}

impl SessionConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate configuration text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, animal) in &self.animals {
            if animal.task.is_system() {
                return Err(ConfigError::SystemTaskAssigned(name.clone()));
            }
        }
        self.stage_table()?;
        self.rfid_directory()?;
        if self.detector.kind == DetectorKind::Rfid && self.detector.port.is_none() {
            return Err(ConfigError::MissingPort);
        }
        Ok(())
    }

    /// Stage configurations keyed by parsed task kind
    pub fn stage_table(&self) -> Result<StageTable, ConfigError> {
        let mut table = StageTable::new();
        for (task_id, stages) in &self.tasks {
            let task: TaskKind = task_id.parse()?;
            for (key, stage) in stages {
                if let Some(next) = stage.condition.next_task.filter(TaskKind::is_system) {
                    return Err(ConfigError::SystemNextTask {
                        task,
                        stage: key.clone(),
                        next,
                    });
                }
                table.insert(task, key.clone(), stage.clone());
            }
        }
        Ok(table)
    }

    /// Map from RFID tag to animal name
    pub fn rfid_directory(&self) -> Result<HashMap<String, String>, ConfigError> {
        let mut directory: HashMap<String, String> = HashMap::new();
        for (name, animal) in &self.animals {
            let Some(rfid) = animal.rfid_id.as_ref() else {
                continue;
            };
            if let Some(first) = directory.get(rfid) {
                return Err(ConfigError::DuplicateRfid {
                    rfid: rfid.clone(),
                    first: first.clone(),
                    second: name.clone(),
                });
            }
            directory.insert(rfid.clone(), name.clone());
        }
        Ok(directory)
    }

    /// Animal names, sorted by name
    pub fn animal_names(&self) -> Vec<String> {
        self.animals.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
