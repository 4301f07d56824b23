// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mxbi-core: data model and pure state machines for the training scheduler
//!
//! This crate provides:
//! - Per-animal training state and its persisted progress
//! - Schedule conditions and the difficulty policy
//! - The detector event vocabulary and presence tracking
//! - Scheduler run states and history records
//! - Session configuration

pub mod clock;

pub mod animal;
pub mod condition;
pub mod config;
pub mod detector;
pub mod history;
pub mod policy;
pub mod task;

// Re-exports
pub use animal::{AnimalProgress, AnimalState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{
    ConditionConfig, LevelParams, ScheduleCondition, StageConfig, StageTable, DEFAULT_STAGE_KEY,
};
pub use config::{
    AnimalConfig, ConfigError, DetectorConfig, DetectorKind, RewarderKind, SessionConfig,
};
pub use detector::{
    DetectionResult, DetectorEvent, DetectorEventKind, Presence, PresenceTracker,
};
pub use history::{RunState, SchedulerEvent, SchedulerHistoryRecord};
pub use policy::{Decision, Progression};
pub use task::{Feedback, TaskKind, UnknownTask};
