//! Shared component types and the [`Actor`] that carries them.
//!
//! Components are pure data. The larger per-concern components (health,
//! hitboxes, AI) live in their own modules; an actor holds each of them as
//! an optional capability.

use serde::{Deserialize, Serialize};

use crate::enemy::EnemyAi;
use crate::health::HealthPool;
use crate::hitbox::Hitbox;
use crate::locomotion::Locomotion;
use crate::math::Vec2;
use crate::projectile::Projectile;
use crate::targeting::Targeting;

/// Unique identifier for actors.
pub type EntityId = u64;

/// Broad classification of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorKind {
    /// The player character.
    Player,
    /// An AI-driven enemy.
    #[default]
    Enemy,
    /// A travelling projectile.
    Projectile,
    /// Anything else that can be hit (crates, targets).
    Prop,
}

/// Allegiance tag used for friendly-fire checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Faction {
    /// The player and their allies.
    Player,
    /// Hostile actors.
    #[default]
    Enemy,
    /// Unaligned actors, hit by everyone.
    Neutral,
}

impl Faction {
    /// Whether two factions count as friends. Neutral is nobody's friend.
    #[must_use]
    pub const fn is_allied_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Player, Self::Player) | (Self::Enemy, Self::Enemy)
        )
    }
}

/// Collision layer bits. A hitbox only hits actors whose layer intersects
/// its mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Player layer.
    pub const PLAYER: Self = Self(1);
    /// Enemy layer.
    pub const ENEMY: Self = Self(1 << 1);
    /// Prop layer.
    pub const PROP: Self = Self(1 << 2);
    /// Matches everything.
    pub const ALL: Self = Self(u32::MAX);

    /// Whether any bit is shared.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of two masks.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ENEMY
    }
}

/// Linear RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white, the untinted sprite colour.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque red, the default hurt flash.
    pub const RED: Self = Self::rgb(1.0, 0.2, 0.2);
    /// Opaque green, used for heal feedback.
    pub const GREEN: Self = Self::rgb(0.3, 1.0, 0.3);

    /// Opaque colour from components.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Marker that the actor has a sprite renderer the host can tint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sprite {
    /// Resting tint.
    pub base_tint: Color,
}

/// Anything that lives in the combat world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique id, assigned on spawn.
    pub id: EntityId,
    /// Classification.
    pub kind: ActorKind,
    /// Template the actor was built from, empty for hand-built actors.
    pub template: String,
    /// World position.
    pub position: Vec2,
    /// Velocity applied during the last movement step.
    pub velocity: Vec2,
    /// Facing direction; only the sign of `x` mirrors hitboxes.
    pub facing: Vec2,
    /// Steering direction requested by input or AI.
    pub steer: Vec2,
    /// Body radius for overlap checks.
    pub radius: f32,
    /// Owning actor in the transform hierarchy.
    pub parent: Option<EntityId>,
    /// Allegiance.
    pub faction: Faction,
    /// Collision layer.
    pub layer: LayerMask,
    /// Busy with something that blocks incoming attacks (a grapple).
    pub interacting: bool,
    /// Health capability.
    pub health: Option<HealthPool>,
    /// Target tracking.
    pub targeting: Option<Targeting>,
    /// Movement capability.
    pub locomotion: Option<Locomotion>,
    /// Attack volume.
    pub hitbox: Option<Hitbox>,
    /// AI brain.
    pub enemy: Option<EnemyAi>,
    /// Projectile state.
    pub projectile: Option<Projectile>,
    /// Tintable sprite.
    pub sprite: Option<Sprite>,
    /// Effect template spawned on death.
    pub death_effect: Option<String>,
    /// Last actor that damaged this one.
    pub last_attacker: Option<EntityId>,
}

impl Actor {
    /// Bare actor with no capabilities.
    #[must_use]
    pub fn new(kind: ActorKind, position: Vec2) -> Self {
        Self {
            id: 0,
            kind,
            template: String::new(),
            position,
            velocity: Vec2::ZERO,
            facing: Vec2::RIGHT,
            steer: Vec2::ZERO,
            radius: 0.5,
            parent: None,
            faction: Faction::Neutral,
            layer: LayerMask::PROP,
            interacting: false,
            health: None,
            targeting: None,
            locomotion: None,
            hitbox: None,
            enemy: None,
            projectile: None,
            sprite: None,
            death_effect: None,
            last_attacker: None,
        }
    }

    /// Builder: set allegiance and layer.
    #[must_use]
    pub fn with_faction(mut self, faction: Faction, layer: LayerMask) -> Self {
        self.faction = faction;
        self.layer = layer;
        self
    }

    /// Builder: attach a health pool.
    #[must_use]
    pub fn with_health(mut self, health: HealthPool) -> Self {
        self.health = Some(health);
        self
    }

    /// Builder: attach movement.
    #[must_use]
    pub fn with_locomotion(mut self, locomotion: Locomotion) -> Self {
        self.locomotion = Some(locomotion);
        self
    }

    /// Builder: attach an attack volume.
    #[must_use]
    pub fn with_hitbox(mut self, hitbox: Hitbox) -> Self {
        self.hitbox = Some(hitbox);
        self
    }

    /// Builder: attach an AI brain and target tracking.
    #[must_use]
    pub fn with_enemy(mut self, enemy: EnemyAi) -> Self {
        self.enemy = Some(enemy);
        self.targeting.get_or_insert_with(Targeting::new);
        self
    }

    /// Builder: attach a sprite.
    #[must_use]
    pub fn with_sprite(mut self) -> Self {
        self.sprite = Some(Sprite::default());
        self
    }

    /// Builder: set the hierarchy parent.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Whether the actor has health and is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        use crate::health::Damageable;
        self.health.as_ref().is_some_and(Damageable::is_dead)
    }

    /// Whether the actor has health and is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        use crate::health::Damageable;
        self.health.as_ref().is_some_and(|h| !h.is_dead())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_alliances() {
        assert!(Faction::Player.is_allied_with(Faction::Player));
        assert!(Faction::Enemy.is_allied_with(Faction::Enemy));
        assert!(!Faction::Player.is_allied_with(Faction::Enemy));
        assert!(!Faction::Neutral.is_allied_with(Faction::Neutral));
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::ENEMY.with(LayerMask::PROP);
        assert!(mask.intersects(LayerMask::PROP));
        assert!(!mask.intersects(LayerMask::PLAYER));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }

    #[test]
    fn test_actor_liveness() {
        let prop = Actor::new(ActorKind::Prop, Vec2::ZERO);
        assert!(!prop.is_alive());
        assert!(!prop.is_dead());

        let mut enemy = Actor::new(ActorKind::Enemy, Vec2::ZERO).with_health(HealthPool::new(5));
        assert!(enemy.is_alive());
        if let Some(health) = enemy.health.as_mut() {
            use crate::health::Damageable;
            health.die();
        }
        assert!(enemy.is_dead());
    }
}
