// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command queue between the outside world and the scheduler
//!
//! Detector handlers and operator handles only enqueue. A single dispatcher
//! task drains the queue in order and applies each command under the
//! scheduler lock.

use super::state::TaskAction;
use super::Inner;
use mxbi_adapters::{DetectorEventSource, TaskFactory, TaskRunner};
use mxbi_core::{Clock, DetectorEvent};
use mxbi_storage::{HistorySink, ProgressStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything that can change the scheduler from outside the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCommand {
    Detector(DetectorEvent),
    AdvanceTask,
    AdvanceLevel,
    Quit,
}

/// Cloneable handle for operator commands
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<SchedulerCommand>) -> Self {
        Self { commands }
    }

    /// Move the active animal straight to its next task
    pub fn advance_task(&self) -> bool {
        self.send(SchedulerCommand::AdvanceTask)
    }

    /// Raise the active animal's level once, ignoring the evaluation interval
    pub fn advance_level(&self) -> bool {
        self.send(SchedulerCommand::AdvanceLevel)
    }

    /// Stop the scheduler
    pub fn quit(&self) -> bool {
        self.send(SchedulerCommand::Quit)
    }

    /// Returns false once the scheduler has shut down
    pub fn send(&self, command: SchedulerCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

impl<D, F, P, H, C> Inner<D, F, P, H, C>
where
    D: DetectorEventSource,
    F: TaskFactory,
    P: ProgressStore,
    H: HistorySink,
    C: Clock,
{
    /// Apply one command, then act on the running task outside the lock
    pub(crate) fn apply(&self, command: SchedulerCommand) {
        let timestamp = self.clock.timestamp();
        let action = {
            let mut shared = self.lock();
            if !shared.running {
                tracing::debug!(?command, "scheduler not running, command ignored");
                return;
            }
            match &command {
                SchedulerCommand::Detector(event) => {
                    tracing::debug!(%event, "detector event");
                    shared.apply_event(event, timestamp)
                }
                SchedulerCommand::AdvanceTask => shared.advance_task(timestamp),
                SchedulerCommand::AdvanceLevel => shared.advance_level(timestamp),
                SchedulerCommand::Quit => {
                    tracing::info!("quit requested");
                    shared.running = false;
                    shared
                        .current_task
                        .as_ref()
                        .map(|active| TaskAction::Quit(Arc::clone(&active.task)))
                }
            }
        };

        match action {
            Some(TaskAction::Quit(task)) => quit_task(task.as_ref()),
            Some(TaskAction::Return(task)) => task.on_return(),
            None => {}
        }
    }
}

/// Cancel a task; failures are logged and otherwise treated as success
pub(crate) fn quit_task(task: &dyn TaskRunner) {
    if let Err(e) = task.quit() {
        tracing::warn!(task = %task.kind(), error = %e, "error quitting task");
    }
}

/// Drain the command queue until shutdown
pub(crate) async fn dispatch<D, F, P, H, C>(
    inner: Arc<Inner<D, F, P, H, C>>,
    mut commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    shutdown: CancellationToken,
) where
    D: DetectorEventSource,
    F: TaskFactory,
    P: ProgressStore,
    H: HistorySink,
    C: Clock,
{
    loop {
        let command = tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        };
        inner.apply(command);
    }
    tracing::debug!("dispatcher exiting");
}
