// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn condition() -> ConditionConfig {
    ConditionConfig {
        evaluation_interval: 10,
        difficulty_increase_threshold: 0.8,
        difficulty_decrease_threshold: 0.2,
        allow_decrease: true,
        next_task: Some(TaskKind::Mock),
        present_level_trial_id: false,
    }
}

fn level(interval: Option<u32>) -> LevelParams {
    LevelParams {
        evaluation_interval: interval,
        params: serde_json::Map::new(),
    }
}

#[test]
fn level_count_follows_level_table() {
    let stage = StageConfig {
        condition: condition(),
        levels: vec![level(None), level(None), level(None)],
    };
    let cond = stage.condition_at(0);
    assert_eq!(cond.level_count, 3);
    assert_eq!(cond.top_level(), 2);
}

#[test]
fn stage_without_levels_has_one_level() {
    let stage = StageConfig {
        condition: condition(),
        levels: vec![],
    };
    assert_eq!(stage.level_count(), 1);
    assert_eq!(stage.condition_at(0).top_level(), 0);
}

#[test]
fn level_override_replaces_evaluation_interval() {
    let stage = StageConfig {
        condition: condition(),
        levels: vec![level(None), level(Some(25))],
    };
    assert_eq!(stage.condition_at(0).evaluation_interval, 10);
    assert_eq!(stage.condition_at(1).evaluation_interval, 25);
    // Out-of-table levels fall back to the stage value
    assert_eq!(stage.condition_at(7).evaluation_interval, 10);
}

#[test]
fn lookup_prefers_animal_then_default() {
    let mut table = StageTable::new();
    let default_stage = StageConfig {
        condition: condition(),
        levels: vec![],
    };
    let mut alpha_condition = condition();
    alpha_condition.evaluation_interval = 3;
    let alpha_stage = StageConfig {
        condition: alpha_condition,
        levels: vec![],
    };
    table.insert(TaskKind::InitialHabituation, DEFAULT_STAGE_KEY, default_stage);
    table.insert(TaskKind::InitialHabituation, "alpha", alpha_stage);

    let alpha = table.lookup(TaskKind::InitialHabituation, "alpha").unwrap();
    assert_eq!(alpha.condition.evaluation_interval, 3);
    let beta = table.lookup(TaskKind::InitialHabituation, "beta").unwrap();
    assert_eq!(beta.condition.evaluation_interval, 10);
    assert!(table.lookup(TaskKind::Mock, "alpha").is_none());
}

#[test]
fn level_params_decode_task_fields() {
    #[derive(serde::Deserialize)]
    struct Params {
        entry_reward: f64,
    }

    let params: LevelParams =
        serde_json::from_value(json!({"evaluation_interval": 5, "entry_reward": 0.5})).unwrap();
    assert_eq!(params.evaluation_interval, Some(5));
    let decoded: Params = params.decode().unwrap();
    assert_eq!(decoded.entry_reward, 0.5);
}

#[test]
fn stage_config_parses_from_toml() {
    let stage: StageConfig = toml::from_str(
        r#"
        condition = { evaluation_interval = 10, difficulty_increase_threshold = 0.8, difficulty_decrease_threshold = 0.2, next_task = "mock" }

        [[levels]]
        stay_target = "5s"

        [[levels]]
        evaluation_interval = 20
        stay_target = "10s"
        "#,
    )
    .unwrap();

    assert!(!stage.condition.allow_decrease);
    assert_eq!(stage.condition.next_task, Some(TaskKind::Mock));
    assert_eq!(stage.level_count(), 2);
    assert_eq!(stage.condition_at(1).evaluation_interval, 20);
}
