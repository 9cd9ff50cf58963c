//! # Brawl Core
//!
//! Deterministic combat pipeline for a 2D action platformer.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No audio
//! - No IO beyond loading config files
//! - No system randomness (seeded `ChaCha8Rng` only)
//!
//! Everything the host has to present (sounds, tints, floating text,
//! camera offsets, spawned effects) comes back from
//! [`world::CombatWorld::tick`] as [`events::Feedback`] commands.
//!
//! This separation enables:
//! - Headless scenario runs and batch balance testing
//! - Determinism checks via [`world::CombatWorld::state_hash`]
//! - Unit-testing every system without an engine
//!
//! ## Crate Structure
//!
//! - [`world`] - The combat world and its tick order
//! - [`health`], [`hitbox`], [`combo`] - Damage resolution
//! - [`time_dilation`], [`camera`], [`feedback`] - Hit feel
//! - [`momentum`], [`score`] - Player resources
//! - [`enemy`], [`targeting`], [`pathfinding`], [`locomotion`] - AI
//! - [`spawner`], [`projectile`] - Rooms, waves and shots
//! - [`clock`], [`timer`] - Time domains and scheduled actions
//! - [`config`] - Tunables and actor templates

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod camera;
pub mod clock;
pub mod combo;
pub mod components;
pub mod config;
pub mod enemy;
pub mod error;
pub mod events;
pub mod feedback;
pub mod health;
pub mod hitbox;
pub mod locomotion;
pub mod math;
pub mod momentum;
pub mod pathfinding;
pub mod projectile;
pub mod score;
pub mod spawner;
pub mod targeting;
pub mod time_dilation;
pub mod timer;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{ClockDomain, FrameTime};
    pub use crate::combo::ComboManager;
    pub use crate::components::*;
    pub use crate::config::{ActorTemplate, CombatConfig};
    pub use crate::enemy::{Archetype, EnemyAi, EnemyState};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{
        ComboEvent, DamageTaken, DeathEvent, Feedback, HitEvent, HudSlot, RoomEvent, TickEvents,
    };
    pub use crate::health::{DamageOutcome, Damageable, HealthPool};
    pub use crate::hitbox::Hitbox;
    pub use crate::locomotion::{Locomotion, Mover};
    pub use crate::math::Vec2;
    pub use crate::momentum::Momentum;
    pub use crate::pathfinding::{GridPathOracle, NavGrid, PathOracle};
    pub use crate::spawner::{Room, Wave, WaveEntry};
    pub use crate::time_dilation::TimeManager;
    pub use crate::world::{CombatWorld, ControlScheme, PlayerIntent};
}
