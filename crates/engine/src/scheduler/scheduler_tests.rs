// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mxbi_adapters::{DetectorCall, FakeDetector, FakeTaskFactory, NoOpRewarder, TaskCall};
use mxbi_core::{
    ConditionConfig, FakeClock, Feedback, LevelParams, ScheduleCondition, SchedulerEvent,
    StageConfig,
};
use mxbi_storage::{MemoryHistory, MemoryProgressStore};
use std::time::Duration;
use tokio::task::JoinHandle;

const FIRST: &str = "mock_001";
const SECOND: &str = "mock_002";

type TestScheduler =
    Scheduler<FakeDetector, FakeTaskFactory, MemoryProgressStore, MemoryHistory, FakeClock>;

fn condition(level_count: u32, evaluation_interval: u32) -> ScheduleCondition {
    ScheduleCondition {
        level_count,
        evaluation_interval,
        difficulty_increase_threshold: 0.8,
        difficulty_decrease_threshold: 0.2,
        allow_decrease: false,
        next_task: None,
        present_level_trial_id: false,
    }
}

fn animal_configs() -> BTreeMap<String, AnimalConfig> {
    [FIRST, SECOND]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                AnimalConfig {
                    rfid_id: None,
                    task: TaskKind::InitialHabituation,
                    level: 0,
                },
            )
        })
        .collect()
}

struct Harness {
    scheduler: Arc<TestScheduler>,
    detector: FakeDetector,
    factory: FakeTaskFactory,
    progress: MemoryProgressStore,
    history: MemoryHistory,
}

impl Harness {
    fn new(factory: FakeTaskFactory) -> Self {
        Self::build(factory, MemoryProgressStore::new(), StageTable::new())
    }

    fn build(factory: FakeTaskFactory, progress: MemoryProgressStore, stages: StageTable) -> Self {
        let detector = FakeDetector::new();
        let history = MemoryHistory::new();
        let scheduler = Scheduler::new(
            SchedulerDeps {
                detector: detector.clone(),
                factory: factory.clone(),
                progress: progress.clone(),
                history: history.clone(),
            },
            SessionContext::new(stages, Arc::new(NoOpRewarder::new())),
            &animal_configs(),
            FakeClock::new(),
        )
        .unwrap();
        Self {
            scheduler: Arc::new(scheduler),
            detector,
            factory,
            progress,
            history,
        }
    }

    fn spawn(&self) -> JoinHandle<Result<(), SchedulerError>> {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move { scheduler.run().await })
    }

    fn reasons(&self) -> Vec<String> {
        self.history
            .records()
            .into_iter()
            .filter_map(|r| r.reason)
            .collect()
    }

    fn created(&self) -> Vec<(String, TaskKind)> {
        self.factory
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                TaskCall::Create { animal, task, .. } => Some((animal, task)),
                _ => None,
            })
            .collect()
    }
}

/// Let the dispatcher and run loop catch up without finishing a trial
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn stop(h: &Harness, join: JoinHandle<Result<(), SchedulerError>>) {
    assert!(h.scheduler.handle().quit());
    tokio::time::timeout(Duration::from_secs(5), join)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn starts_idle_without_animal() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;

    assert!(h.scheduler.is_running());
    assert_eq!(h.scheduler.state(), RunState::Idle);
    assert_eq!(h.created(), vec![(String::new(), TaskKind::Idle)]);
    assert_eq!(h.reasons(), vec!["no_animal_selected"]);

    stop(&h, join).await;
    assert!(!h.scheduler.is_running());
    assert!(!h.detector.is_running());
    assert!(h.detector.calls().contains(&DetectorCall::Stop));
}

#[tokio::test(start_paused = true)]
async fn entering_animal_interrupts_idle_and_trains() {
    let h = Harness::new(FakeTaskFactory::new());
    h.factory.script([Feedback::Correct, Feedback::Incorrect]);
    let join = h.spawn();
    settle().await;

    assert_eq!(h.detector.entered(FIRST), 1);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(h.scheduler.state(), RunState::Schedule);
    assert_eq!(h.scheduler.active_animal().as_deref(), Some(FIRST));
    let animal = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(animal.trial_id, 2);
    assert_eq!(animal.correct_trial, 1);
    assert_eq!(animal.current_animal_session_trial_id, 3);
    assert!(h.factory.calls().contains(&TaskCall::Quit {
        animal: String::new(),
        task: TaskKind::Idle,
    }));
    assert_eq!(h.reasons(), vec!["no_animal_selected", "animal_entered"]);

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn performance_raises_level_and_persists() {
    let factory =
        FakeTaskFactory::new().with_condition(TaskKind::InitialHabituation, condition(3, 2));
    let h = Harness::new(factory);
    h.factory.script([Feedback::Correct, Feedback::Correct]);
    let join = h.spawn();
    settle().await;

    h.detector.entered(FIRST);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let animal = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(animal.level, 1);
    assert_eq!(animal.current_level_trial_id, 0);
    assert_eq!(h.progress.get(FIRST).map(|p| p.level), Some(1));

    let change = h
        .history
        .records()
        .into_iter()
        .find(|r| r.event == SchedulerEvent::LevelChange)
        .unwrap();
    assert_eq!(change.animal_name.as_deref(), Some(FIRST));
    assert_eq!(change.previous_level, Some(0));
    assert_eq!(change.level, Some(1));

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn leaving_mid_trial_cancels_it() {
    let h = Harness::new(FakeTaskFactory::new());
    h.factory.script([Feedback::Correct]);
    let join = h.spawn();
    settle().await;

    h.detector.entered(FIRST);
    settle().await;
    h.detector.emit(DetectorEvent::AnimalLeft);
    settle().await;

    assert_eq!(h.scheduler.state(), RunState::Idle);
    let animal = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(animal.trial_id, 0);
    assert!(!animal.is_present());
    assert!(h.factory.calls().contains(&TaskCall::Finish {
        animal: FIRST.to_string(),
        task: TaskKind::InitialHabituation,
        feedback: Feedback::Cancelled,
    }));
    assert_eq!(
        h.created().last(),
        Some(&(String::new(), TaskKind::Idle))
    );

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn returning_animal_resumes_running_task() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;

    h.detector.entered(FIRST);
    settle().await;
    h.detector.emit(DetectorEvent::AnimalReturned {
        name: FIRST.to_string(),
    });
    settle().await;

    assert!(h.factory.calls().contains(&TaskCall::OnReturn {
        animal: FIRST.to_string(),
        task: TaskKind::InitialHabituation,
    }));
    // The training task was not recreated
    assert_eq!(h.created().len(), 2);

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn advance_level_without_condition_keeps_trial() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;
    h.detector.entered(FIRST);
    settle().await;

    assert!(h.scheduler.handle().advance_level());
    settle().await;

    let quits = h
        .factory
        .calls()
        .into_iter()
        .filter(|c| matches!(c, TaskCall::Quit { animal, .. } if animal == FIRST))
        .count();
    assert_eq!(quits, 0);
    assert_eq!(h.scheduler.animal(FIRST).unwrap().level, 0);

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn advance_task_restarts_on_next_task() {
    let next = ScheduleCondition {
        next_task: Some(TaskKind::Mock),
        ..condition(3, 10)
    };
    let factory = FakeTaskFactory::new().with_condition(TaskKind::InitialHabituation, next);
    let h = Harness::new(factory);
    let join = h.spawn();
    settle().await;
    h.detector.entered(FIRST);
    settle().await;

    assert!(h.scheduler.handle().advance_task());
    settle().await;

    assert_eq!(h.scheduler.animal(FIRST).unwrap().task, TaskKind::Mock);
    assert_eq!(
        h.created().last(),
        Some(&(FIRST.to_string(), TaskKind::Mock))
    );
    assert_eq!(h.progress.get(FIRST).map(|p| p.task), Some(TaskKind::Mock));

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn detector_error_runs_error_task_until_animal_returns() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;

    h.detector.emit(DetectorEvent::ErrorDetected);
    settle().await;
    assert_eq!(h.scheduler.state(), RunState::Error);
    assert_eq!(h.created().last(), Some(&(String::new(), TaskKind::Error)));

    h.detector.entered(SECOND);
    settle().await;
    assert_eq!(h.scheduler.state(), RunState::Schedule);
    assert_eq!(
        h.created().last(),
        Some(&(SECOND.to_string(), TaskKind::InitialHabituation))
    );

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn task_creation_failure_enters_error_state() {
    let h = Harness::new(FakeTaskFactory::new());
    h.factory.fail_create(TaskKind::InitialHabituation);
    let join = h.spawn();
    settle().await;

    h.detector.entered(FIRST);
    settle().await;

    assert_eq!(h.scheduler.state(), RunState::Error);
    assert!(h.reasons().iter().any(|r| r == "task_create_failed"));

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn system_task_failure_is_fatal() {
    let h = Harness::new(FakeTaskFactory::new());
    h.factory.fail_create(TaskKind::Idle);

    let result = h.scheduler.run().await;

    assert!(matches!(
        result,
        Err(SchedulerError::SystemTask {
            task: TaskKind::Idle,
            ..
        })
    ));
    assert!(!h.scheduler.is_running());
    assert!(!h.detector.is_running());
}

#[tokio::test(start_paused = true)]
async fn quit_failure_still_stops() {
    let h = Harness::new(FakeTaskFactory::new());
    h.factory.set_quit_fails(true);
    let join = h.spawn();
    settle().await;
    h.detector.entered(FIRST);
    settle().await;

    stop(&h, join).await;
}

#[tokio::test(start_paused = true)]
async fn quit_resets_and_persists_trained_animals() {
    let factory =
        FakeTaskFactory::new().with_condition(TaskKind::InitialHabituation, condition(3, 10));
    let h = Harness::new(factory);
    h.factory.script([Feedback::Correct]);
    let join = h.spawn();
    settle().await;
    h.detector.entered(FIRST);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    stop(&h, join).await;

    let animal = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(animal.trial_id, 1);
    assert_eq!(animal.current_level_trial_id, 0);
    assert!(h.progress.get(FIRST).is_some());
    assert!(h.progress.get(SECOND).is_none());
}

#[tokio::test(start_paused = true)]
async fn events_after_quit_are_ignored() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;
    stop(&h, join).await;

    h.detector.entered(FIRST);
    assert!(!h.scheduler.handle().advance_level());
    assert_eq!(h.scheduler.active_animal(), None);
}

#[tokio::test(start_paused = true)]
async fn runs_only_once() {
    let h = Harness::new(FakeTaskFactory::new());
    let join = h.spawn();
    settle().await;

    assert!(matches!(
        h.scheduler.run().await,
        Err(SchedulerError::AlreadyStarted)
    ));

    stop(&h, join).await;
}

#[test]
fn stored_progress_overlays_config() {
    let progress = MemoryProgressStore::new()
        .with(
            FIRST,
            AnimalProgress {
                task: TaskKind::Mock,
                level: 2,
                level_trial_id: Some(6),
            },
        )
        .with(
            SECOND,
            AnimalProgress {
                task: TaskKind::Idle,
                level: 0,
                level_trial_id: None,
            },
        );
    let h = Harness::build(FakeTaskFactory::new(), progress, StageTable::new());

    let first = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(first.task, TaskKind::Mock);
    assert_eq!(first.level, 2);
    assert_eq!(first.current_level_trial_id, 6);

    let second = h.scheduler.animal(SECOND).unwrap();
    assert_eq!(second.task, TaskKind::InitialHabituation);
}

#[test]
fn out_of_range_level_is_clamped() {
    let mut stages = StageTable::new();
    stages.insert(
        TaskKind::InitialHabituation,
        "default",
        StageConfig {
            condition: ConditionConfig {
                evaluation_interval: 10,
                difficulty_increase_threshold: 0.8,
                difficulty_decrease_threshold: 0.2,
                allow_decrease: false,
                next_task: None,
                present_level_trial_id: false,
            },
            levels: vec![LevelParams::default(); 2],
        },
    );
    let progress = MemoryProgressStore::new().with(
        FIRST,
        AnimalProgress {
            task: TaskKind::InitialHabituation,
            level: 5,
            level_trial_id: Some(3),
        },
    );
    let h = Harness::build(FakeTaskFactory::new(), progress, stages);

    let animal = h.scheduler.animal(FIRST).unwrap();
    assert_eq!(animal.level, 1);
    assert_eq!(animal.current_level_trial_id, 0);
}
