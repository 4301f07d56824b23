// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the apparatus: presence detectors, task execution seams
//! and the reward peripheral

pub mod detector;
pub mod reward;
pub mod task;
pub mod traced;

pub use detector::{
    DetectorError, DetectorEventSource, DetectorHandlers, EventHandler, LineTagReader,
    MockCommand, MockControl, MockDetector, ReaderError, RfidDetector, TagReader,
};
pub use reward::{LogRewarder, NoOpRewarder, RewardError, Rewarder};
pub use task::{SessionContext, StageContext, TaskError, TaskFactory, TaskRunner};
pub use traced::{TracedRewarder, TracedTaskFactory, TracedTaskRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use detector::{DetectorCall, FakeDetector, FakeTagFeed, FakeTagReader};
#[cfg(any(test, feature = "test-support"))]
pub use reward::FakeRewarder;
#[cfg(any(test, feature = "test-support"))]
pub use task::{FakeTaskFactory, FakeTaskRunner, TaskCall};
