// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake detector and tag reader for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    DetectorError, DetectorEventSource, DetectorHandlers, EventHandler, ReaderError, TagReader,
};
use mxbi_core::{DetectorEvent, DetectorEventKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded detector call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorCall {
    Register(DetectorEventKind),
    Start,
    Stop,
}

/// Detector whose events are injected by the test
#[derive(Clone, Default)]
pub struct FakeDetector {
    handlers: Arc<DetectorHandlers>,
    calls: Arc<Mutex<Vec<DetectorCall>>>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the registered handlers, as the detector thread would
    pub fn emit(&self, event: DetectorEvent) -> usize {
        self.handlers.dispatch(&event)
    }

    pub fn entered(&self, name: &str) -> usize {
        self.emit(DetectorEvent::AnimalEntered {
            name: name.to_string(),
        })
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<DetectorCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_running(&self) -> bool {
        self.handlers.is_active()
    }

    fn record(&self, call: DetectorCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl DetectorEventSource for FakeDetector {
    fn register(&self, kind: DetectorEventKind, handler: EventHandler) {
        self.record(DetectorCall::Register(kind));
        self.handlers.register(kind, handler);
    }

    fn start(&self) -> Result<(), DetectorError> {
        self.record(DetectorCall::Start);
        if !self.handlers.activate() {
            return Err(DetectorError::AlreadyStarted);
        }
        Ok(())
    }

    fn stop(&self) {
        self.record(DetectorCall::Stop);
        self.handlers.deactivate();
    }
}

enum FeedItem {
    Tag(String),
    Fault,
}

/// Test-side handle that feeds a [`FakeTagReader`]; dropping it disconnects the reader
#[derive(Clone)]
pub struct FakeTagFeed {
    tx: crossbeam_channel::Sender<FeedItem>,
}

impl FakeTagFeed {
    pub fn tag(&self, tag: &str) {
        let _ = self.tx.send(FeedItem::Tag(tag.to_string()));
    }

    pub fn fault(&self) {
        let _ = self.tx.send(FeedItem::Fault);
    }
}

/// Tag reader fed from a [`FakeTagFeed`]
pub struct FakeTagReader {
    rx: crossbeam_channel::Receiver<FeedItem>,
}

impl FakeTagReader {
    pub fn new() -> (Self, FakeTagFeed) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { rx }, FakeTagFeed { tx })
    }
}

impl TagReader for FakeTagReader {
    fn read_tag(&mut self, timeout: Duration) -> Result<Option<String>, ReaderError> {
        match self.rx.recv_timeout(timeout) {
            Ok(FeedItem::Tag(tag)) => Ok(Some(tag)),
            Ok(FeedItem::Fault) => Err(std::io::Error::other("injected reader fault").into()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(ReaderError::Disconnected)
            }
        }
    }
}
