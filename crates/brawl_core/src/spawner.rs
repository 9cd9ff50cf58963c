//! Room and wave orchestration.
//!
//! A room wakes up when the player steps inside its bounds, spawns its
//! waves one after another (each after its own delay) and reports itself
//! cleared once the last wave is dead. Rooms only track ids; spawning and
//! scheduling are done by the world.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::Vec2;

/// One actor in a wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Template name.
    pub template: String,
    /// Spawn position.
    pub position: Vec2,
}

/// A batch of enemies spawned together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    /// Scaled seconds between the wave being due and it spawning.
    pub delay: f32,
    /// Actors to spawn.
    pub entries: Vec<WaveEntry>,
}

/// Room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoomState {
    /// Waiting for the player.
    #[default]
    Dormant,
    /// Waves in progress.
    Active,
    /// Every wave defeated.
    Cleared,
}

/// What the world should do after a room changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoomProgress {
    /// Schedule the wave with this index after `delay` seconds.
    ScheduleWave {
        /// Wave index.
        wave: usize,
        /// Scaled seconds.
        delay: f32,
    },
    /// The room is finished.
    Cleared,
}

/// Axis-aligned arena with its waves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Display name.
    pub name: String,
    /// Lower-left corner.
    pub min: Vec2,
    /// Upper-right corner.
    pub max: Vec2,
    /// Waves in spawn order.
    pub waves: Vec<Wave>,
    #[serde(skip)]
    state: RoomState,
    #[serde(skip)]
    current_wave: usize,
    #[serde(skip)]
    alive: BTreeSet<EntityId>,
}

impl Room {
    /// Create a dormant room.
    #[must_use]
    pub fn new(name: impl Into<String>, min: Vec2, max: Vec2, waves: Vec<Wave>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            waves,
            state: RoomState::Dormant,
            current_wave: 0,
            alive: BTreeSet::new(),
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RoomState {
        self.state
    }

    /// Index of the wave in progress.
    #[must_use]
    pub const fn current_wave(&self) -> usize {
        self.current_wave
    }

    /// Living actors of the current wave.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.alive.len()
    }

    /// Whether `point` is inside the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Wake the room. Returns what to do next, or `None` if it was not
    /// dormant.
    pub fn activate(&mut self) -> Option<RoomProgress> {
        if self.state != RoomState::Dormant {
            return None;
        }
        self.state = RoomState::Active;
        self.current_wave = 0;
        Some(self.progress_from(0))
    }

    fn progress_from(&mut self, wave: usize) -> RoomProgress {
        match self.waves.get(wave) {
            Some(next) => RoomProgress::ScheduleWave {
                wave,
                delay: next.delay,
            },
            None => {
                self.state = RoomState::Cleared;
                RoomProgress::Cleared
            }
        }
    }

    /// Entries of a wave.
    #[must_use]
    pub fn wave_entries(&self, wave: usize) -> &[WaveEntry] {
        self.waves.get(wave).map_or(&[], |w| w.entries.as_slice())
    }

    /// Record the actors spawned for `wave`. An empty wave counts as
    /// defeated immediately.
    pub fn wave_spawned(&mut self, wave: usize, ids: &[EntityId]) -> Option<RoomProgress> {
        if self.state != RoomState::Active {
            return None;
        }
        self.current_wave = wave;
        self.alive.extend(ids.iter().copied());
        if self.alive.is_empty() {
            return Some(self.progress_from(wave + 1));
        }
        None
    }

    /// Record a death. Returns what to do next when the wave is defeated.
    pub fn on_death(&mut self, id: EntityId) -> Option<RoomProgress> {
        if self.state != RoomState::Active || !self.alive.remove(&id) {
            return None;
        }
        if self.alive.is_empty() {
            return Some(self.progress_from(self.current_wave + 1));
        }
        None
    }
}
