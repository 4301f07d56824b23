// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detector event vocabulary and presence tracking
//!
//! Detectors report raw [`DetectionResult`]s. [`PresenceTracker`] turns them
//! into the normalized [`DetectorEvent`] stream the scheduler consumes:
//!
//! ```text
//! {absent} --detect(a)--> {present(a)} --detect(a)--> {present(a)}   STAYED
//!                                      --detect(b)--> {present(b)}   CHANGED
//!                                      --none-------> {absent}       LEFT
//! ```
//!
//! Debounce timers live in the detector; they feed `DetectionResult::absent()`
//! back into the tracker when they fire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Kinds of detector events, used as handler registration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorEventKind {
    AnimalEntered,
    AnimalReturned,
    AnimalLeft,
    AnimalChanged,
    AnimalStayed,
    ErrorDetected,
}

impl DetectorEventKind {
    pub const ALL: [DetectorEventKind; 6] = [
        DetectorEventKind::AnimalEntered,
        DetectorEventKind::AnimalReturned,
        DetectorEventKind::AnimalLeft,
        DetectorEventKind::AnimalChanged,
        DetectorEventKind::AnimalStayed,
        DetectorEventKind::ErrorDetected,
    ];
}

/// A normalized detector event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorEvent {
    AnimalEntered { name: String },
    AnimalReturned { name: String },
    AnimalLeft,
    AnimalChanged { name: String },
    AnimalStayed,
    ErrorDetected,
}

impl DetectorEvent {
    pub fn kind(&self) -> DetectorEventKind {
        match self {
            DetectorEvent::AnimalEntered { .. } => DetectorEventKind::AnimalEntered,
            DetectorEvent::AnimalReturned { .. } => DetectorEventKind::AnimalReturned,
            DetectorEvent::AnimalLeft => DetectorEventKind::AnimalLeft,
            DetectorEvent::AnimalChanged { .. } => DetectorEventKind::AnimalChanged,
            DetectorEvent::AnimalStayed => DetectorEventKind::AnimalStayed,
            DetectorEvent::ErrorDetected => DetectorEventKind::ErrorDetected,
        }
    }

    /// Animal named by the event, if any
    pub fn animal(&self) -> Option<&str> {
        match self {
            DetectorEvent::AnimalEntered { name }
            | DetectorEvent::AnimalReturned { name }
            | DetectorEvent::AnimalChanged { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for DetectorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorEvent::AnimalEntered { name } => write!(f, "animal_entered({name})"),
            DetectorEvent::AnimalReturned { name } => write!(f, "animal_returned({name})"),
            DetectorEvent::AnimalLeft => write!(f, "animal_left"),
            DetectorEvent::AnimalChanged { name } => write!(f, "animal_changed({name})"),
            DetectorEvent::AnimalStayed => write!(f, "animal_stayed"),
            DetectorEvent::ErrorDetected => write!(f, "error_detected"),
        }
    }
}

/// One raw reading from a detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub animal: Option<String>,
    pub error: bool,
}

impl DetectionResult {
    pub fn animal(name: impl Into<String>) -> Self {
        Self {
            animal: Some(name.into()),
            error: false,
        }
    }

    pub fn absent() -> Self {
        Self {
            animal: None,
            error: false,
        }
    }

    pub fn error() -> Self {
        Self {
            animal: None,
            error: true,
        }
    }
}

/// Presence state of the apparatus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Absent {
        /// Last animal to leave, and when
        last: Option<(String, Instant)>,
    },
    Present {
        name: String,
    },
}

/// Converts raw detections into detector events
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    presence: Presence,
    return_window: Duration,
}

impl PresenceTracker {
    /// `return_window`: a re-detection of the animal that just left, within
    /// this window, is reported as a return instead of a fresh entry
    pub fn new(return_window: Duration) -> Self {
        Self {
            presence: Presence::Absent { last: None },
            return_window,
        }
    }

    pub fn present_animal(&self) -> Option<&str> {
        match &self.presence {
            Presence::Present { name } => Some(name),
            Presence::Absent { .. } => None,
        }
    }

    /// Feed one reading; returns the event it produces, if any
    pub fn observe(&mut self, result: DetectionResult, now: Instant) -> Option<DetectorEvent> {
        if result.error {
            return Some(DetectorEvent::ErrorDetected);
        }

        match (&self.presence, result.animal) {
            (Presence::Absent { last }, Some(name)) => {
                let returned = matches!(
                    last,
                    Some((last_name, left_at))
                        if *last_name == name
                            && now.saturating_duration_since(*left_at) < self.return_window
                );
                self.presence = Presence::Present { name: name.clone() };
                if returned {
                    Some(DetectorEvent::AnimalReturned { name })
                } else {
                    Some(DetectorEvent::AnimalEntered { name })
                }
            }
            (Presence::Present { name: current }, Some(name)) => {
                if *current == name {
                    Some(DetectorEvent::AnimalStayed)
                } else {
                    self.presence = Presence::Present { name: name.clone() };
                    Some(DetectorEvent::AnimalChanged { name })
                }
            }
            (Presence::Present { name }, None) => {
                self.presence = Presence::Absent {
                    last: Some((name.clone(), now)),
                };
                Some(DetectorEvent::AnimalLeft)
            }
            (Presence::Absent { .. }, None) => None,
        }
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
