// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-driven detector for running without RFID hardware

use super::{DetectorError, DetectorEventSource, DetectorHandlers, EventHandler};
use mxbi_core::{DetectionResult, DetectorEventKind, PresenceTracker};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Simulated detector input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCommand {
    /// The first animal by name is detected
    EnterFirst,
    /// The second animal by name is detected
    EnterSecond,
    /// Nobody is detected
    Leave,
    /// The next configured animal (wrapping) is detected
    Cycle,
    /// The reader reports a fault
    Error,
}

impl MockCommand {
    /// Operator key binding
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'p' => Some(MockCommand::EnterFirst),
            'o' => Some(MockCommand::EnterSecond),
            'l' => Some(MockCommand::Leave),
            'c' => Some(MockCommand::Cycle),
            'e' => Some(MockCommand::Error),
            _ => None,
        }
    }
}

struct MockState {
    tracker: PresenceTracker,
    index: usize,
}

struct MockShared {
    handlers: DetectorHandlers,
    animals: Vec<String>,
    state: Mutex<MockState>,
}

impl MockShared {
    fn apply(&self, command: MockCommand) -> bool {
        if !self.handlers.is_active() {
            tracing::debug!(?command, "mock detector not running");
            return false;
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let result = match command {
            MockCommand::EnterFirst => match self.animals.first() {
                Some(name) => {
                    state.index = 0;
                    DetectionResult::animal(name.as_str())
                }
                None => {
                    tracing::info!("no mock animals configured");
                    return false;
                }
            },
            MockCommand::EnterSecond => match self.animals.get(1) {
                Some(name) => {
                    state.index = 1;
                    DetectionResult::animal(name.as_str())
                }
                None => {
                    tracing::info!(animals = ?self.animals, "no second mock animal configured");
                    return false;
                }
            },
            MockCommand::Cycle => {
                if self.animals.is_empty() {
                    tracing::info!("no mock animals to cycle through");
                    return false;
                }
                state.index = (state.index + 1) % self.animals.len();
                DetectionResult::animal(self.animals[state.index].as_str())
            }
            MockCommand::Leave => DetectionResult::absent(),
            MockCommand::Error => DetectionResult::error(),
        };

        tracing::info!(?command, animal = ?result.animal, "mock detection");
        if let Some(event) = state.tracker.observe(result, Instant::now()) {
            self.handlers.dispatch(&event);
        }
        true
    }
}

/// Cloneable handle for injecting [`MockCommand`]s
#[derive(Clone)]
pub struct MockControl {
    shared: Arc<MockShared>,
}

impl MockControl {
    /// Apply a command; false when it had no effect or the detector is stopped
    pub fn send(&self, command: MockCommand) -> bool {
        self.shared.apply(command)
    }
}

/// Detector driven entirely by [`MockControl`]
pub struct MockDetector {
    shared: Arc<MockShared>,
    enter_on_start: bool,
}

impl MockDetector {
    /// `animals` in the order the keys address them; with `enter_on_start` the first one
    /// is reported present as soon as the detector starts
    pub fn new(animals: Vec<String>, return_window: Duration, enter_on_start: bool) -> Self {
        Self {
            shared: Arc::new(MockShared {
                handlers: DetectorHandlers::new(),
                animals,
                state: Mutex::new(MockState {
                    tracker: PresenceTracker::new(return_window),
                    index: 0,
                }),
            }),
            enter_on_start,
        }
    }

    pub fn control(&self) -> MockControl {
        MockControl {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl DetectorEventSource for MockDetector {
    fn register(&self, kind: DetectorEventKind, handler: EventHandler) {
        self.shared.handlers.register(kind, handler);
    }

    fn start(&self) -> Result<(), DetectorError> {
        if !self.shared.handlers.activate() {
            return Err(DetectorError::AlreadyStarted);
        }
        tracing::info!(animals = ?self.shared.animals, "mock detector started");
        if self.enter_on_start {
            self.shared.apply(MockCommand::EnterFirst);
        }
        Ok(())
    }

    fn stop(&self) {
        if self.shared.handlers.deactivate() {
            tracing::info!("mock detector stopped");
        }
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
