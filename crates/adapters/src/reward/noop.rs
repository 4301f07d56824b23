// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op rewarder

use super::{RewardError, Rewarder};
use async_trait::async_trait;
use std::time::Duration;

/// Rewarder that does nothing
#[derive(Clone, Copy, Default)]
pub struct NoOpRewarder;

impl NoOpRewarder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Rewarder for NoOpRewarder {
    async fn give_reward(&self, _duration: Duration) -> Result<(), RewardError> {
        Ok(())
    }
}
