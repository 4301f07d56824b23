// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFID presence detector
//!
//! A polling thread reads tag ids from a [`TagReader`], maps them to animal
//! names and feeds the presence tracker. Every detection rearms a single
//! debounce timer; when the timer outlives its generation unchallenged the
//! animal is reported as gone.

use super::{DetectorError, DetectorEventSource, DetectorHandlers, EventHandler};
use mxbi_core::{DetectionResult, DetectorEventKind, PresenceTracker};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// How long one `read_tag` call may block before the stop flag is rechecked
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("reader io error: {0}")]
    Io(#[from] io::Error),
    #[error("reader disconnected")]
    Disconnected,
}

/// Blocking source of raw tag ids
pub trait TagReader: Send + 'static {
    /// Wait up to `timeout` for the next tag; `Ok(None)` when nothing was read
    fn read_tag(&mut self, timeout: Duration) -> Result<Option<String>, ReaderError>;
}

/// Reads newline-delimited ASCII tag ids from any byte stream
pub struct LineTagReader {
    lines: crossbeam_channel::Receiver<io::Result<String>>,
}

impl LineTagReader {
    pub fn new<R: Read + Send + 'static>(source: R) -> Result<Self, DetectorError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("rfid-line-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(source).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(DetectorError::Spawn)?;
        Ok(Self { lines: rx })
    }

    /// Open a serial device (or any file) as a line source
    pub fn open(path: &Path) -> Result<Self, DetectorError> {
        let file = File::open(path).map_err(|source| DetectorError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl TagReader for LineTagReader {
    fn read_tag(&mut self, timeout: Duration) -> Result<Option<String>, ReaderError> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => {
                let tag = line.trim();
                Ok((!tag.is_empty()).then(|| tag.to_string()))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(ReaderError::Disconnected)
            }
        }
    }
}

struct Debounce {
    tracker: PresenceTracker,
    generation: u64,
    timer: Option<tokio::task::JoinHandle<()>>,
}

struct RfidShared {
    handlers: DetectorHandlers,
    /// RFID tag id -> animal name
    directory: HashMap<String, String>,
    debounce: Duration,
    stopping: AtomicBool,
    state: Mutex<Debounce>,
}

impl RfidShared {
    /// Feed one reading through the tracker and dispatch the resulting event.
    ///
    /// Runs under the debounce lock so timer expiry and fresh detections are
    /// applied one at a time.
    fn observe(self: &Arc<Self>, result: DetectionResult, runtime: &Handle) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let detected = result.animal.is_some() && !result.error;
        let event = state
            .tracker
            .observe(result, tokio::time::Instant::now().into_std());

        if detected {
            state.generation += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            let generation = state.generation;
            let shared = Arc::clone(self);
            let debounce = self.debounce;
            state.timer = Some(runtime.spawn(async move {
                tokio::time::sleep(debounce).await;
                shared.expire(generation);
            }));
        }

        if let Some(event) = event {
            self.handlers.dispatch(&event);
        }
    }

    /// Debounce timer fired; report departure unless a newer detection won
    fn expire(&self, generation: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.generation != generation || self.stopping.load(Ordering::Acquire) {
            return;
        }
        state.timer = None;
        if let Some(event) = state.tracker.observe(
            DetectionResult::absent(),
            tokio::time::Instant::now().into_std(),
        ) {
            self.handlers.dispatch(&event);
        }
    }

    /// Invalidate the armed timer, if any
    fn disarm(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    fn poll<R: TagReader>(self: Arc<Self>, mut reader: R, runtime: Handle) {
        while !self.stopping.load(Ordering::Acquire) {
            match reader.read_tag(POLL_INTERVAL) {
                Ok(None) => {}
                Ok(Some(tag)) => match self.directory.get(&tag) {
                    Some(name) => self.observe(DetectionResult::animal(name.as_str()), &runtime),
                    None => tracing::debug!(tag = %tag, "unknown rfid tag"),
                },
                Err(ReaderError::Disconnected) => {
                    tracing::error!("rfid reader disconnected");
                    self.observe(DetectionResult::error(), &runtime);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rfid read failed");
                    self.observe(DetectionResult::error(), &runtime);
                }
            }
        }
        tracing::debug!("rfid poller exiting");
    }
}

/// Detector backed by an RFID tag reader
pub struct RfidDetector<R: TagReader> {
    shared: Arc<RfidShared>,
    reader: Mutex<Option<R>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<R: TagReader> RfidDetector<R> {
    /// `directory` maps tag ids to animal names; `debounce` is the silence
    /// after which a present animal counts as gone
    pub fn new(
        reader: R,
        directory: HashMap<String, String>,
        debounce: Duration,
        return_window: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(RfidShared {
                handlers: DetectorHandlers::new(),
                directory,
                debounce,
                stopping: AtomicBool::new(false),
                state: Mutex::new(Debounce {
                    tracker: PresenceTracker::new(return_window),
                    generation: 0,
                    timer: None,
                }),
            }),
            reader: Mutex::new(Some(reader)),
            poller: Mutex::new(None),
        }
    }
}

impl<R: TagReader> DetectorEventSource for RfidDetector<R> {
    fn register(&self, kind: DetectorEventKind, handler: EventHandler) {
        self.shared.handlers.register(kind, handler);
    }

    fn start(&self) -> Result<(), DetectorError> {
        let runtime = Handle::try_current().map_err(|_| DetectorError::NoRuntime)?;
        let Some(reader) = self
            .reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            return Err(DetectorError::AlreadyStarted);
        };

        self.shared.handlers.activate();
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("rfid-poll".to_string())
            .spawn(move || shared.poll(reader, runtime))
            .map_err(DetectorError::Spawn)?;
        *self.poller.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        tracing::info!(
            animals = self.shared.directory.len(),
            debounce_ms = self.shared.debounce.as_millis() as u64,
            "rfid detector started"
        );
        Ok(())
    }

    fn stop(&self) {
        self.shared.stopping.store(true, Ordering::Release);
        let was_active = self.shared.handlers.deactivate();
        self.shared.disarm();

        let poller = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = poller {
            if handle.join().is_err() {
                tracing::warn!("rfid poller panicked");
            }
        }
        if was_active {
            tracing::info!("rfid detector stopped");
        }
    }
}

#[cfg(test)]
#[path = "rfid_tests.rs"]
mod tests;
