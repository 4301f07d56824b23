// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rewarder that only logs deliveries

use super::{RewardError, Rewarder};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Logs each reward and counts deliveries; used on benches without a pump
#[derive(Default)]
pub struct LogRewarder {
    delivered: AtomicU64,
}

impl LogRewarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Rewarder for LogRewarder {
    async fn give_reward(&self, duration: Duration) -> Result<(), RewardError> {
        let count = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            duration_ms = duration.as_millis() as u64,
            count,
            "reward delivered"
        );
        Ok(())
    }
}
