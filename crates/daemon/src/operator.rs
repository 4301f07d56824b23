// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator keyboard commands read from stdin

use mxbi_adapters::{MockCommand, MockControl};
use mxbi_engine::SchedulerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    AdvanceTask,
    AdvanceLevel,
    Quit,
    Detector(MockCommand),
}

impl OperatorCommand {
    /// Parse one input line; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Option<Self> {
        let mut chars = line.trim().chars();
        let key = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match key {
            'n' => Some(Self::AdvanceTask),
            'm' => Some(Self::AdvanceLevel),
            'q' => Some(Self::Quit),
            other => MockCommand::from_key(other).map(Self::Detector),
        }
    }
}

/// Forward a command; false when it could not be delivered
pub fn apply(command: OperatorCommand, handle: &SchedulerHandle, mock: Option<&MockControl>) -> bool {
    match command {
        OperatorCommand::AdvanceTask => handle.advance_task(),
        OperatorCommand::AdvanceLevel => handle.advance_level(),
        OperatorCommand::Quit => handle.quit(),
        OperatorCommand::Detector(command) => match mock {
            Some(control) => control.send(command),
            None => {
                tracing::info!(?command, "detector keys need the mock detector");
                false
            }
        },
    }
}

#[cfg(test)]
#[path = "operator_tests.rs"]
mod tests;
