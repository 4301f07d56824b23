// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The training scheduler
//!
//! One run loop picks a task for whoever is at the apparatus, awaits the
//! trial and folds the feedback into the animal's record. Detector events
//! and operator commands arrive concurrently through a command queue and
//! can cancel the running trial at any point.

mod dispatch;
mod state;

pub use dispatch::{SchedulerCommand, SchedulerHandle};

use crate::error::SchedulerError;
use dispatch::{dispatch, quit_task};
use mxbi_adapters::{DetectorEventSource, SessionContext, TaskFactory, TaskRunner};
use mxbi_core::{
    AnimalConfig, AnimalProgress, AnimalState, Clock, DetectorEvent, DetectorEventKind, RunState,
    StageTable, TaskKind,
};
use mxbi_storage::{HistorySink, ProgressStore};
use state::{Shared, TrialTicket};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Adapter dependencies of the scheduler
pub struct SchedulerDeps<D, F, P, H> {
    pub detector: D,
    pub factory: F,
    pub progress: P,
    pub history: H,
}

pub(crate) struct Inner<D, F, P, H, C> {
    detector: Arc<D>,
    factory: F,
    ctx: SessionContext,
    clock: C,
    shared: Mutex<Shared<P, H>>,
    commands: mpsc::UnboundedSender<SchedulerCommand>,
}

/// What the run loop does next
enum Step {
    Run(Arc<dyn TaskRunner>, TrialTicket),
    /// The run state changed without a task to await
    Transitioned,
    Stop,
}

pub struct Scheduler<D, F, P, H, C> {
    inner: Arc<Inner<D, F, P, H, C>>,
    commands: Mutex<Option<mpsc::UnboundedReceiver<SchedulerCommand>>>,
}

impl<D, F, P, H, C> Scheduler<D, F, P, H, C>
where
    D: DetectorEventSource,
    F: TaskFactory,
    P: ProgressStore,
    H: HistorySink,
    C: Clock,
{
    /// Build the scheduler, overlaying stored progress on the configured animals
    pub fn new(
        deps: SchedulerDeps<D, F, P, H>,
        ctx: SessionContext,
        animals: &BTreeMap<String, AnimalConfig>,
        clock: C,
    ) -> Result<Self, SchedulerError> {
        let stored = deps.progress.load_all()?;
        let animals = initial_animals(animals, &stored, ctx.stages());
        tracing::info!(
            session_id = ctx.session_id(),
            animals = animals.len(),
            restored = stored.len(),
            "scheduler created"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            inner: Arc::new(Inner {
                detector: Arc::new(deps.detector),
                factory: deps.factory,
                ctx,
                clock,
                shared: Mutex::new(Shared::new(animals, deps.progress, deps.history)),
                commands: tx,
            }),
            commands: Mutex::new(Some(rx)),
        })
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.inner.commands.clone())
    }

    pub fn state(&self) -> RunState {
        self.inner.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn active_animal(&self) -> Option<String> {
        self.inner.lock().active.clone()
    }

    /// Snapshot of one animal's training record
    pub fn animal(&self, name: &str) -> Option<AnimalState> {
        self.inner.lock().animals.get(name).cloned()
    }

    /// Run until quit or a fatal error, then reset and persist progress.
    ///
    /// A scheduler runs once; a second call returns
    /// [`SchedulerError::AlreadyStarted`].
    pub async fn run(&self) -> Result<(), SchedulerError> {
        let commands = self
            .commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(SchedulerError::AlreadyStarted)?;

        for kind in DetectorEventKind::ALL {
            let tx = self.inner.commands.clone();
            self.inner.detector.register(
                kind,
                Arc::new(move |event: &DetectorEvent| {
                    let _ = tx.send(SchedulerCommand::Detector(event.clone()));
                }),
            );
        }

        self.inner.lock().running = true;
        let shutdown = CancellationToken::new();
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&self.inner),
            commands,
            shutdown.clone(),
        ));
        tracing::info!(session_id = self.inner.ctx.session_id(), "scheduler started");

        let result = match self.inner.detector.start() {
            Ok(()) => self.inner.run_loop().await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "scheduler loop failed");
        }

        self.inner.shutdown().await;
        shutdown.cancel();
        if let Err(e) = dispatcher.await {
            tracing::warn!(error = %e, "dispatcher task failed");
        }
        tracing::info!("scheduler stopped");
        result
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
    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared<P, H>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_loop(&self) -> Result<(), SchedulerError> {
        loop {
            let (task, ticket) = match self.next_step()? {
                Step::Run(task, ticket) => (task, ticket),
                Step::Transitioned => {
                    tokio::task::yield_now().await;
                    continue;
                }
                Step::Stop => return Ok(()),
            };

            let feedback = task.start().await;
            let timestamp = self.clock.timestamp();
            self.lock().finish_trial(&ticket, feedback, timestamp);
            tokio::task::yield_now().await;
        }
    }

    /// Create and install the next task in one critical section
    fn next_step(&self) -> Result<Step, SchedulerError> {
        let timestamp = self.clock.timestamp();
        let mut guard = self.lock();
        let shared = &mut *guard;
        if !shared.running {
            return Ok(Step::Stop);
        }

        let name = match shared.state {
            RunState::Idle => return self.start_system(shared, TaskKind::Idle),
            RunState::Error => return self.start_system(shared, TaskKind::Error),
            RunState::Schedule => match shared.active.clone() {
                Some(name) => name,
                None => {
                    shared.transition(RunState::Idle, "no_animal_selected", timestamp);
                    return Ok(Step::Transitioned);
                }
            },
        };

        let Some(animal) = shared.animals.get_mut(&name) else {
            return Err(SchedulerError::InvariantViolation(format!(
                "active animal {name} has no training record"
            )));
        };
        animal.current_animal_session_trial_id += 1;

        match self.factory.create(&self.ctx, animal) {
            Ok(task) => {
                animal.condition = task.condition();
                let (kind, level) = (animal.task, animal.level);
                tracing::debug!(animal = %name, task = %kind, level, "starting trial");
                let ticket = shared.install(Arc::clone(&task), Some(name), kind, level);
                Ok(Step::Run(task, ticket))
            }
            Err(e) => {
                tracing::error!(animal = %name, error = %e, "failed to create task");
                shared.transition(RunState::Error, "task_create_failed", timestamp);
                Ok(Step::Transitioned)
            }
        }
    }

    fn start_system(&self, shared: &mut Shared<P, H>, kind: TaskKind) -> Result<Step, SchedulerError> {
        let mut placeholder = AnimalState::system();
        placeholder.task = kind;
        let task = self
            .factory
            .create(&self.ctx, &placeholder)
            .map_err(|source| SchedulerError::SystemTask { task: kind, source })?;
        let ticket = shared.install(Arc::clone(&task), None, kind, 0);
        Ok(Step::Run(task, ticket))
    }

    async fn shutdown(&self) {
        let task = self.lock().shutdown();
        if let Some(task) = task {
            quit_task(task.as_ref());
        }

        let detector = Arc::clone(&self.detector);
        if let Err(e) = tokio::task::spawn_blocking(move || detector.stop()).await {
            tracing::warn!(error = %e, "failed to stop detector");
        }
    }
}

/// Configured animals with stored progress applied and levels clamped to
/// the configured stage
fn initial_animals(
    configs: &BTreeMap<String, AnimalConfig>,
    stored: &BTreeMap<String, AnimalProgress>,
    stages: &StageTable,
) -> BTreeMap<String, AnimalState> {
    configs
        .iter()
        .map(|(name, config)| {
            let mut animal = AnimalState::new(name.clone(), config.task, config.level);
            match stored.get(name) {
                Some(progress) if progress.task.is_system() => {
                    tracing::warn!(animal = %name, task = %progress.task, "ignoring stored system task");
                }
                Some(progress) => {
                    animal.task = progress.task;
                    animal.level = progress.level;
                    if let Some(level_trial_id) = progress.level_trial_id {
                        animal = animal.with_level_trial_id(level_trial_id);
                    }
                }
                None => {}
            }

            if let Some(stage) = stages.lookup(animal.task, name) {
                let top = stage.level_count().saturating_sub(1);
                if animal.level > top {
                    tracing::warn!(
                        animal = %name,
                        task = %animal.task,
                        level = animal.level,
                        top,
                        "level out of range, clamping"
                    );
                    animal.level = top;
                    animal.reset();
                }
            }
            (name.clone(), animal)
        })
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
