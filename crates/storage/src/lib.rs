// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence for the training scheduler: per-animal progress, the
//! scheduler history log, and the dated session data directories

mod history;
mod progress;
mod session_dir;
mod trial_log;

pub use history::{HistoryError, HistorySink, JsonlHistory, MemoryHistory, NoOpHistory};
pub use progress::{JsonProgressStore, MemoryProgressStore, ProgressStore, StorageError};
pub use session_dir::SessionDirs;
pub use trial_log::TrialLog;
