// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry shared by every detector

use super::EventHandler;
use mxbi_core::{DetectorEvent, DetectorEventKind};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct HandlerTable {
    handlers: HashMap<DetectorEventKind, Vec<EventHandler>>,
    active: bool,
}

/// Registered handlers plus the on/off switch that gates dispatch.
///
/// Dispatch holds the read guard while handlers run; [`DetectorHandlers::deactivate`]
/// takes the write guard, so it waits out any dispatch in flight.
#[derive(Default)]
pub struct DetectorHandlers {
    table: RwLock<HandlerTable>,
}

impl DetectorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: DetectorEventKind, handler: EventHandler) {
        self.table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .handlers
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Allow dispatch. Returns false if already active.
    pub fn activate(&self) -> bool {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        !std::mem::replace(&mut table.active, true)
    }

    /// Block dispatch. Returns false if already inactive.
    pub fn deactivate(&self) -> bool {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut table.active, false)
    }

    pub fn is_active(&self) -> bool {
        self.table.read().unwrap_or_else(|e| e.into_inner()).active
    }

    /// Invoke every handler registered for the event's kind.
    ///
    /// Returns the number of handlers called; zero while inactive.
    pub fn dispatch(&self, event: &DetectorEvent) -> usize {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        if !table.active {
            tracing::trace!(%event, "detector inactive, event dropped");
            return 0;
        }
        let Some(handlers) = table.handlers.get(&event.kind()) else {
            tracing::debug!(%event, "no handler registered");
            return 0;
        };
        tracing::debug!(%event, "dispatching detector event");
        for handler in handlers {
            handler(event);
        }
        handlers.len()
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
