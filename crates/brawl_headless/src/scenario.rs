//! Scenario loading and configuration.
//!
//! Scenarios define the initial combat state for headless runs: where the
//! player starts, which actors and rooms exist, which config to use and
//! the scripted input that stands in for a human player.

use std::path::{Path, PathBuf};

use brawl_core::config::CombatConfig;
use brawl_core::error::GameError;
use brawl_core::math::Vec2;
use brawl_core::spawner::{Room, Wave, WaveEntry};
use brawl_core::world::{CombatWorld, PlayerIntent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario's config or setup was rejected by the core.
    #[error("Invalid scenario setup: {0}")]
    Setup(#[from] GameError),
}

/// An actor placed at scenario start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Template name.
    pub template: String,
    /// Spawn position.
    pub position: Vec2,
}

impl Placement {
    /// Create a placement.
    #[must_use]
    pub fn new(template: &str, x: f32, y: f32) -> Self {
        Self {
            template: template.to_string(),
            position: Vec2::new(x, y),
        }
    }
}

/// One step of a scripted input timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedInput {
    /// First tick this input applies to.
    pub from_tick: u64,
    /// Input held until the next step.
    pub intent: PlayerIntent,
}

/// Stand-in for a human player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum InputScript {
    /// No input at all.
    #[default]
    Idle,
    /// Walk along `move_axis` and swing every `period` ticks.
    AttackEvery {
        /// Ticks between swings.
        period: u64,
        /// Movement held throughout.
        move_axis: Vec2,
    },
    /// Explicit timeline, sorted by `from_tick`.
    Timeline(Vec<ScriptedInput>),
}

impl InputScript {
    /// Input for a tick.
    #[must_use]
    pub fn intent_at(&self, tick: u64) -> PlayerIntent {
        match self {
            Self::Idle => PlayerIntent::default(),
            Self::AttackEvery { period, move_axis } => PlayerIntent {
                move_axis: *move_axis,
                attack: *period > 0 && tick % period == 0,
                ..PlayerIntent::default()
            },
            Self::Timeline(steps) => steps
                .iter()
                .take_while(|step| step.from_tick <= tick)
                .last()
                .map(|step| {
                    let mut intent = step.intent;
                    // Edge-triggered buttons fire only on their first tick.
                    if step.from_tick != tick {
                        intent.attack = false;
                        intent.pause = false;
                    }
                    intent
                })
                .unwrap_or_default(),
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Tick limit (60 ticks per second).
    pub max_ticks: u64,
    /// Inline config; `None` uses the defaults.
    pub config: Option<CombatConfig>,
    /// Player start position.
    pub player_spawn: Vec2,
    /// Actors present from the start.
    pub actors: Vec<Placement>,
    /// Rooms with their waves.
    pub rooms: Vec<Room>,
    /// Scripted player input.
    pub input: InputScript,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Empty".to_string(),
            description: "Player alone in the void".to_string(),
            max_ticks: 60 * 60,
            config: None,
            player_spawn: Vec2::ZERO,
            actors: Vec::new(),
            rooms: Vec::new(),
            input: InputScript::Idle,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Resolve a preset name (`duel`, `gauntlet`) or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "duel" => Ok(Self::duel()),
            "gauntlet" => Ok(Self::gauntlet()),
            path => Self::load(PathBuf::from(path)),
        }
    }

    /// The player against one grunt, swinging twice a second.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "Player against a single melee grunt".to_string(),
            max_ticks: 60 * 30,
            actors: vec![Placement::new("grunt", 4.0, 0.0)],
            input: InputScript::AttackEvery {
                period: 30,
                move_axis: Vec2::new(0.5, 0.0),
            },
            ..Self::default()
        }
    }

    /// Three rooms in a row with escalating waves of every archetype.
    #[must_use]
    pub fn gauntlet() -> Self {
        let entry = |template: &str, x: f32, y: f32| WaveEntry {
            template: template.to_string(),
            position: Vec2::new(x, y),
        };
        let wave = |delay: f32, entries: Vec<WaveEntry>| Wave { delay, entries };

        Self {
            name: "gauntlet".to_string(),
            description: "Three rooms of grunts, gunners and drones".to_string(),
            max_ticks: 60 * 120,
            player_spawn: Vec2::new(-2.0, 0.0),
            actors: vec![Placement::new("crate", 3.0, 0.0)],
            rooms: vec![
                Room::new(
                    "entrance",
                    Vec2::new(-5.0, -5.0),
                    Vec2::new(10.0, 5.0),
                    vec![
                        wave(0.5, vec![entry("grunt", 6.0, 0.0), entry("grunt", 8.0, 1.0)]),
                        wave(1.0, vec![entry("gunner", 9.0, 0.0)]),
                    ],
                ),
                Room::new(
                    "hall",
                    Vec2::new(10.0, -5.0),
                    Vec2::new(25.0, 5.0),
                    vec![
                        wave(0.5, vec![entry("grunt", 16.0, 0.0), entry("drone", 18.0, 2.0)]),
                        wave(
                            1.0,
                            vec![
                                entry("gunner", 20.0, 0.0),
                                entry("gunner", 22.0, 1.0),
                                entry("drone", 21.0, 3.0),
                            ],
                        ),
                    ],
                ),
                Room::new(
                    "arena",
                    Vec2::new(25.0, -5.0),
                    Vec2::new(40.0, 5.0),
                    vec![wave(
                        1.0,
                        vec![
                            entry("grunt", 30.0, 0.0),
                            entry("grunt", 32.0, -1.0),
                            entry("grunt", 34.0, 1.0),
                            entry("gunner", 36.0, 0.0),
                            entry("drone", 35.0, 3.0),
                        ],
                    )],
                ),
            ],
            input: InputScript::AttackEvery {
                period: 20,
                move_axis: Vec2::new(0.6, 0.0),
            },
            ..Self::default()
        }
    }

    /// Config for this scenario: `override_config` if given, else the
    /// inline config, else the defaults.
    #[must_use]
    pub fn combat_config(&self, override_config: Option<&CombatConfig>) -> CombatConfig {
        override_config
            .or(self.config.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    /// Build the starting world.
    pub fn build_world(&self, config: CombatConfig, seed: u64) -> Result<CombatWorld, ScenarioError> {
        let mut world = CombatWorld::new(config, seed)?;
        world.spawn_player(self.player_spawn)?;
        for placement in &self.actors {
            world.spawn_template(&placement.template, placement.position)?;
        }
        for room in &self.rooms {
            world.add_room(room.clone());
        }
        tracing::debug!(
            scenario = %self.name,
            seed,
            actors = world.entities().len(),
            rooms = self.rooms.len(),
            "Scenario world built"
        );
        Ok(world)
    }
}
