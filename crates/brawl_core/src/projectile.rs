//! Travelling projectiles.
//!
//! A projectile is an actor with a permanently armed hitbox. It moves in a
//! straight line, resolves hits through the same pipeline as melee attacks
//! (speed multiplier taken from its own velocity) and is removed on its
//! first hit or when its lifetime runs out.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::enemy::WeaponStats;
use crate::math::Vec2;

/// Per-projectile state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Actor credited with hits.
    pub owner: EntityId,
    /// Base damage before the speed multiplier.
    pub damage: u32,
    /// Travel velocity.
    pub velocity: Vec2,
    lifetime: f32,
    spent: bool,
}

impl Projectile {
    /// Create a projectile.
    #[must_use]
    pub fn new(owner: EntityId, damage: u32, velocity: Vec2, lifetime: f32) -> Self {
        Self {
            owner,
            damage,
            velocity,
            lifetime: lifetime.max(0.0),
            spent: false,
        }
    }

    /// Create a projectile from a weapon fired along `direction`.
    #[must_use]
    pub fn from_weapon(owner: EntityId, weapon: &WeaponStats, direction: Vec2) -> Self {
        Self::new(
            owner,
            weapon.damage,
            direction.normalize_or_zero() * weapon.projectile_speed,
            weapon.projectile_lifetime,
        )
    }

    /// Seconds left before expiry.
    #[must_use]
    pub const fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// Whether the projectile already hit something.
    #[must_use]
    pub const fn is_spent(&self) -> bool {
        self.spent
    }

    /// Mark as used up by a hit.
    pub fn spend(&mut self) {
        self.spent = true;
    }

    /// Count down the lifetime. Returns `true` when the projectile should be
    /// removed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.lifetime -= dt;
        self.spent || self.lifetime <= 0.0
    }
}
