// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mxbi training engine: the scheduler and the built-in tasks

mod error;
mod scheduler;
pub mod tasks;

pub use error::SchedulerError;
pub use scheduler::{Scheduler, SchedulerCommand, SchedulerDeps, SchedulerHandle};
pub use tasks::{MockStrategy, MockTrial, StayToReward, StayTrialRecord, SystemTask, TaskRegistry};
