// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mxbi_adapters::FakeRewarder;
use mxbi_core::{FakeClock, SessionConfig};
use mxbi_storage::SessionDirs;
use std::sync::Arc;

const ANIMAL: &str = "mock_001";

const STAGES: &str = r#"
[tasks.initial_habituation.default.condition]
evaluation_interval = 10
difficulty_increase_threshold = 0.8
difficulty_decrease_threshold = 0.2

[[tasks.initial_habituation.default.levels]]
stay_target = "10s"
reward_duration = "1s"
min_reward_interval = "3s"
max_reward_interval = "3s"
entry_reward = 1.0

[[tasks.initial_habituation.default.levels]]
stay_target = "10s"
reward_duration = "1s"
min_reward_interval = "3s"
max_reward_interval = "3s"
"#;

fn context(rewarder: &FakeRewarder) -> SessionContext {
    let stages = SessionConfig::parse(STAGES).unwrap().stage_table().unwrap();
    SessionContext::new(stages, Arc::new(rewarder.clone())).with_seed(7)
}

fn animal(level: u32, session_trial: u32) -> AnimalState {
    let mut animal = AnimalState::new(ANIMAL, TaskKind::InitialHabituation, level);
    animal.current_animal_session_trial_id = session_trial;
    animal
}

#[tokio::test(start_paused = true)]
async fn stays_to_target_with_periodic_rewards() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap();

    let started = Instant::now();
    assert_eq!(task.start().await, Feedback::Correct);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    assert_eq!(rewarder.rewards(), vec![Duration::from_secs(1); 2]);

    let totals = ctx.stage_context(ANIMAL);
    assert_eq!(totals.rewards, 2);
    assert!(totals.duration >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn entry_reward_opens_first_trial_of_visit() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = StayToReward::new(&ctx, &animal(0, 1), FakeClock::new()).unwrap();

    assert_eq!(task.start().await, Feedback::Correct);
    assert_eq!(rewarder.rewards().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn no_entry_reward_later_in_visit() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = StayToReward::new(&ctx, &animal(0, 2), FakeClock::new()).unwrap();

    assert_eq!(task.start().await, Feedback::Correct);
    assert_eq!(rewarder.rewards().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn quit_cancels_the_stay() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = Arc::new(StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap());
    let running = tokio::spawn({
        let task = Arc::clone(&task);
        async move { task.start().await }
    });

    tokio::time::sleep(Duration::from_secs(4)).await;
    task.quit().unwrap();

    assert_eq!(running.await.unwrap(), Feedback::Cancelled);
    assert_eq!(rewarder.rewards().len(), 1);
    // Only completed stays count toward the stage duration
    assert_eq!(ctx.stage_context(ANIMAL).duration, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn quit_before_start_gives_no_entry_reward() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = StayToReward::new(&ctx, &animal(0, 1), FakeClock::new()).unwrap();

    task.quit().unwrap();

    assert_eq!(task.start().await, Feedback::Cancelled);
    assert!(rewarder.rewards().is_empty());
    assert_eq!(ctx.stage_context(ANIMAL).rewards, 0);
}

#[tokio::test(start_paused = true)]
async fn return_restarts_stay_window() {
    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder);
    let task = Arc::new(StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap());
    let started = Instant::now();
    let running = tokio::spawn({
        let task = Arc::clone(&task);
        async move { task.start().await }
    });

    tokio::time::sleep(Duration::from_secs(6)).await;
    task.on_return();

    assert_eq!(running.await.unwrap(), Feedback::Correct);
    assert!(started.elapsed() >= Duration::from_secs(16));
    // Rewards already given are kept
    assert_eq!(rewarder.rewards().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn failed_reward_does_not_fail_trial() {
    let rewarder = FakeRewarder::new();
    rewarder.set_failing(true);
    let ctx = context(&rewarder);
    let task = StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap();

    assert_eq!(task.start().await, Feedback::Correct);
    assert_eq!(ctx.stage_context(ANIMAL).rewards, 0);
}

#[tokio::test(start_paused = true)]
async fn finished_trial_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let dirs = SessionDirs::allocate(dir.path(), date).unwrap();
    let log_path = dirs.root().join(ANIMAL).join("initial_habituation.jsonl");

    let rewarder = FakeRewarder::new();
    let ctx = context(&rewarder).with_dirs(dirs);
    let mut state = animal(1, 2);
    state.trial_id = 12;
    state.current_level_trial_id = 4;
    let task = StayToReward::new(&ctx, &state, FakeClock::new()).unwrap();

    task.start().await;

    let text = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: StayTrialRecord = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record.animal, ANIMAL);
    assert_eq!(record.level, 1);
    assert_eq!(record.trial_id, 12);
    assert_eq!(record.level_trial_id, 4);
    assert_eq!(record.animal_session_trial_id, 2);
    assert_eq!(record.result, Feedback::Correct);
    assert_eq!(record.rewards, 2);
    assert!(record.stay_duration >= 10.0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_trial_is_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let dirs = SessionDirs::allocate(dir.path(), date).unwrap();
    let log_path = dirs.root().join(ANIMAL).join("initial_habituation.jsonl");

    let ctx = context(&FakeRewarder::new()).with_dirs(dirs);
    let task = StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap();
    task.quit().unwrap();

    assert_eq!(task.start().await, Feedback::Cancelled);
    assert!(!log_path.exists());
}

#[test]
fn condition_reflects_stage() {
    let ctx = context(&FakeRewarder::new());
    let task = StayToReward::new(&ctx, &animal(1, 2), FakeClock::new()).unwrap();

    let condition = task.condition().unwrap();
    assert_eq!(condition.level_count, 2);
    assert_eq!(condition.evaluation_interval, 10);
    assert_eq!(task.kind(), TaskKind::InitialHabituation);
}

#[test]
fn level_without_stay_target_is_rejected() {
    let stages = SessionConfig::parse(
        r#"
[tasks.initial_habituation.default.condition]
evaluation_interval = 10
difficulty_increase_threshold = 0.8
difficulty_decrease_threshold = 0.2

[[tasks.initial_habituation.default.levels]]
reward_duration = "1s"
"#,
    )
    .unwrap()
    .stage_table()
    .unwrap();
    let ctx = SessionContext::new(stages, Arc::new(FakeRewarder::new()));

    let result = StayToReward::new(&ctx, &animal(0, 1), FakeClock::new());
    assert!(matches!(
        result,
        Err(TaskError::InvalidLevel { level: 0, .. })
    ));
}
