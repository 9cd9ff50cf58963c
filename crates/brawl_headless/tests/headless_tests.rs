//! Integration tests for the headless runner: scenario files on disk,
//! config overrides, batches and determinism checks.

use std::path::PathBuf;

use brawl_core::config::CombatConfig;
use brawl_headless::{run_batch, verify, BatchConfig, BatchResults, Outcome, Scenario, ScenarioError, ScenarioRunner};

fn demo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(relative)
}

#[test]
fn test_demo_scenario_loads_and_runs() {
    let scenario = Scenario::load(demo_path("scenarios/ambush.ron")).unwrap();
    assert_eq!(scenario.name, "ambush");
    assert_eq!(scenario.rooms.len(), 2);
    assert_eq!(scenario.actors.len(), 2);

    let short = Scenario {
        max_ticks: 600,
        ..scenario
    };
    let config = short.combat_config(None);
    let metrics = ScenarioRunner::new(short, config, 4).unwrap().run();
    assert!(metrics.duration_ticks <= 600);
    assert!(metrics.waves_spawned >= 1, "{metrics:?}");
}

#[test]
fn test_demo_config_overrides_defaults() {
    let config = CombatConfig::load(demo_path("config/hardcore.ron")).unwrap();
    let defaults = CombatConfig::default();
    assert!(config.combo.timeout < defaults.combo.timeout);
    assert!(config.momentum.decay_amount > defaults.momentum.decay_amount);
    assert_eq!(config.templates.len(), defaults.templates.len());

    let scenario = Scenario::duel();
    assert_eq!(scenario.combat_config(Some(&config)), config);
}

#[test]
fn test_scenario_file_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.ron");
    std::fs::write(
        &path,
        r#"(
            name: "custom",
            max_ticks: 120,
            actors: [(template: "grunt", position: (x: 2.0, y: 0.0))],
            input: AttackEvery(period: 10, move_axis: (x: 0.0, y: 0.0)),
        )"#,
    )
    .unwrap();

    let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(scenario.name, "custom");
    let metrics = ScenarioRunner::new(scenario, CombatConfig::default(), 0)
        .unwrap()
        .run();
    assert_eq!(metrics.scenario, "custom");
    assert!(metrics.duration_ticks <= 120);
    assert_ne!(metrics.outcome, Outcome::PlayerDied);
}

#[test]
fn test_malformed_scenario_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(name: ").unwrap();
    assert!(matches!(Scenario::load(&path), Err(ScenarioError::ParseError(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ron");
    std::fs::write(&path, "(combo: (timeout: -1.0))").unwrap();
    assert!(CombatConfig::load(&path).is_err());
}

#[test]
fn test_batch_writes_results() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = Scenario {
        max_ticks: 240,
        ..Scenario::gauntlet()
    };
    let batch = BatchConfig::new("gauntlet", 4)
        .with_output(dir.path().to_path_buf())
        .with_seed(100);
    let results = run_batch(batch, &scenario, &CombatConfig::default());

    let path = dir.path().join("batch_results.json");
    results.save(&path).unwrap();
    let loaded = BatchResults::load(&path).unwrap();
    assert_eq!(loaded.summary.runs, 4);
    assert_eq!(loaded.config.seed_start, 100);
    assert!(loaded.errors.is_empty());
}

#[test]
fn test_gauntlet_is_deterministic() {
    let scenario = Scenario {
        max_ticks: 60 * 20,
        ..Scenario::gauntlet()
    };
    let report = verify(&scenario, &CombatConfig::default(), 77, 2).unwrap();
    assert!(report.deterministic, "{report:?}");
}
