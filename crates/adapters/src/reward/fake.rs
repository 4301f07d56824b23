// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake rewarder for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RewardError, Rewarder};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeRewarderState {
    rewards: Vec<Duration>,
    failing: bool,
}

/// Records every reward; clones share the record
#[derive(Clone, Default)]
pub struct FakeRewarder {
    inner: Arc<Mutex<FakeRewarderState>>,
}

impl FakeRewarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations of every reward delivered so far
    pub fn rewards(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rewards
            .clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }
}

#[async_trait]
impl Rewarder for FakeRewarder {
    async fn give_reward(&self, duration: Duration) -> Result<(), RewardError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.failing {
            return Err(RewardError::Device("injected failure".to_string()));
        }
        inner.rewards.push(duration);
        Ok(())
    }
}
