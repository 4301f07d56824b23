// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reward peripheral adapters

mod log;
mod noop;

pub use self::log::LogRewarder;
pub use noop::NoOpRewarder;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRewarder;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from reward delivery
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("reward device failed: {0}")]
    Device(String),
}

/// Delivers a reward to the animal at the apparatus
#[async_trait]
pub trait Rewarder: Send + Sync + 'static {
    async fn give_reward(&self, duration: Duration) -> Result<(), RewardError>;
}
