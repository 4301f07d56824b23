// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence detectors
//!
//! A detector turns raw identity readings into [`DetectorEvent`]s and hands
//! them to the handlers registered for each event kind. Handlers run on the
//! detector's own thread of control and must not block.

mod handlers;
mod mock;
mod rfid;

pub use handlers::DetectorHandlers;
pub use mock::{MockCommand, MockControl, MockDetector};
pub use rfid::{LineTagReader, ReaderError, RfidDetector, TagReader};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DetectorCall, FakeDetector, FakeTagFeed, FakeTagReader};

use mxbi_core::{DetectorEvent, DetectorEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Callback invoked for every event of the kind it was registered for
pub type EventHandler = Arc<dyn Fn(&DetectorEvent) + Send + Sync>;

/// Errors from detector lifecycle operations
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector already started")]
    AlreadyStarted,
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("detector must be started inside a tokio runtime")]
    NoRuntime,
    #[error("failed to spawn detector thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Source of presence events for the scheduler
pub trait DetectorEventSource: Send + Sync + 'static {
    /// Add a handler for one event kind
    fn register(&self, kind: DetectorEventKind, handler: EventHandler);

    /// Begin reporting events
    fn start(&self) -> Result<(), DetectorError>;

    /// Stop reporting events. Idempotent; once it returns no handler runs again.
    fn stop(&self);
}
