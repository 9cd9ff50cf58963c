//! Attack volumes and hit computation.
//!
//! A [`Hitbox`] only deals damage while armed. Each armed session keeps a
//! visited set so a target is hit at most once per swing; disarming clears
//! it. The free functions compute the numbers of a hit: speed multiplier,
//! damage and knockback.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Faction, LayerMask};
use crate::config::{HitConfig, HitboxTemplate};
use crate::math::Vec2;

/// Longest parent chain walked by the hierarchy check.
pub const MAX_HIERARCHY_DEPTH: usize = 16;

/// Whether attacks between allied factions land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FriendlyFire {
    /// Allies can hurt each other.
    Allow,
    /// Hits on allies are rejected.
    #[default]
    Deny,
}

/// Why a hit was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitRejection {
    /// The hitbox is not armed.
    Disarmed,
    /// The target was already hit in this session.
    AlreadyHit,
    /// Target is the attacker or part of its hierarchy.
    SameHierarchy,
    /// Target shares the attacker's faction and friendly fire is off.
    FriendlyFire,
    /// Target's layer is outside the hitbox mask.
    LayerMismatch,
    /// Target cannot take damage.
    NotDamageable,
}

/// An actor's attack volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    /// Damage before multipliers.
    pub base_damage: u32,
    /// Centre offset for a right-facing owner.
    pub offset: Vec2,
    /// Radius of the volume.
    pub radius: f32,
    /// Knockback direction for a right-facing owner.
    pub attack_direction: Vec2,
    /// Knockback impulse strength.
    pub knockback: f32,
    /// Layers this hitbox hits.
    pub mask: LayerMask,
    armed: bool,
    sessions: u32,
    visited: BTreeSet<EntityId>,
}

impl Hitbox {
    /// Create a disarmed hitbox.
    #[must_use]
    pub fn new(base_damage: u32, radius: f32, mask: LayerMask) -> Self {
        Self {
            base_damage,
            offset: Vec2::ZERO,
            radius,
            attack_direction: Vec2::RIGHT,
            knockback: 0.0,
            mask,
            armed: false,
            sessions: 0,
            visited: BTreeSet::new(),
        }
    }

    /// Create a disarmed hitbox from a template.
    #[must_use]
    pub fn from_template(template: &HitboxTemplate) -> Self {
        Self {
            offset: template.offset,
            attack_direction: template.attack_direction,
            knockback: template.knockback,
            ..Self::new(template.base_damage, template.radius, template.mask)
        }
    }

    /// Start an armed session.
    pub fn arm(&mut self) {
        if !self.armed {
            self.visited.clear();
            self.sessions += 1;
        }
        self.armed = true;
    }

    /// End the armed session and forget who was hit.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.visited.clear();
    }

    /// Whether the hitbox is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Armed sessions started so far.
    #[must_use]
    pub const fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Record a hit on `target`. Fails if disarmed or already hit this
    /// session.
    pub fn try_register(&mut self, target: EntityId) -> Result<(), HitRejection> {
        if !self.armed {
            return Err(HitRejection::Disarmed);
        }
        if self.visited.insert(target) {
            Ok(())
        } else {
            Err(HitRejection::AlreadyHit)
        }
    }

    /// Whether `target` was hit in the current session.
    #[must_use]
    pub fn has_hit(&self, target: EntityId) -> bool {
        self.visited.contains(&target)
    }

    /// World-space centre for an owner at `position` facing `facing`.
    #[must_use]
    pub fn center(&self, position: Vec2, facing: Vec2) -> Vec2 {
        position + mirror(self.offset, facing)
    }

    /// World-space attack direction for an owner facing `facing`.
    #[must_use]
    pub fn direction(&self, facing: Vec2) -> Vec2 {
        mirror(self.attack_direction, facing).normalize_or_zero()
    }
}

fn mirror(v: Vec2, facing: Vec2) -> Vec2 {
    if facing.x < 0.0 {
        Vec2::new(-v.x, v.y)
    } else {
        v
    }
}

/// Speed multiplier for an attacker moving at `velocity` along `direction`.
///
/// `1 + log_scale * ln(max(1, |v . d|))`. Speeds below 1 give exactly 1, and
/// non-finite input falls back to 1.
#[must_use]
pub fn speed_multiplier(velocity: Vec2, direction: Vec2, log_scale: f32) -> f32 {
    let along = velocity.dot(direction.normalize_or_zero()).abs();
    if !along.is_finite() || !log_scale.is_finite() {
        return 1.0;
    }
    1.0 + log_scale.max(0.0) * along.max(1.0).ln()
}

/// Combo damage factor given the hits already landed in the streak.
#[must_use]
pub fn combo_factor(prior_hits: u32, config: &HitConfig) -> f32 {
    let factor = 1.0 + config.combo_damage_per_hit * prior_hits as f32;
    factor.clamp(1.0, config.max_combo_damage_factor.max(1.0))
}

/// `ceil(base * speed_multiplier * combo_factor)`.
#[must_use]
pub fn compute_damage(base: u32, speed_mult: f32, prior_combo_hits: u32, config: &HitConfig) -> u32 {
    let speed_mult = if speed_mult.is_finite() {
        speed_mult.max(1.0)
    } else {
        1.0
    };
    let raw = base as f32 * speed_mult * combo_factor(prior_combo_hits, config);
    if raw >= u32::MAX as f32 {
        u32::MAX
    } else {
        raw.ceil() as u32
    }
}

/// Knockback impulse blending the attack direction with the direction from
/// attacker to target.
#[must_use]
pub fn knockback_impulse(
    attack_direction: Vec2,
    attacker: Vec2,
    target: Vec2,
    strength: f32,
    target_weight: f32,
) -> Vec2 {
    let attack = attack_direction.normalize_or_zero();
    let to_target = (target - attacker).normalize_or_zero();
    let blended = (attack + to_target * target_weight).normalize_or_zero();
    let dir = if blended == Vec2::ZERO { attack } else { blended };
    dir * strength
}

/// Whether `a` and `b` are the same actor or one is an ancestor of the
/// other.
pub fn in_same_hierarchy(
    a: EntityId,
    b: EntityId,
    parent_of: impl Fn(EntityId) -> Option<EntityId>,
) -> bool {
    if a == b {
        return true;
    }
    let is_ancestor = |ancestor: EntityId, mut node: EntityId| {
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match parent_of(node) {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => node = parent,
                None => return false,
            }
        }
        false
    };
    is_ancestor(a, b) || is_ancestor(b, a)
}

/// One side of a prospective hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitParty {
    /// Actor id.
    pub id: EntityId,
    /// Allegiance.
    pub faction: Faction,
    /// Collision layer.
    pub layer: LayerMask,
}

/// Rejects self-hits, friendly fire and masked-out layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitFilter {
    /// Friendly-fire policy.
    pub friendly_fire: FriendlyFire,
}

impl HitFilter {
    /// Check a prospective hit. `related` is the hierarchy check result.
    pub fn evaluate(
        &self,
        attacker: HitParty,
        target: HitParty,
        mask: LayerMask,
        related: bool,
    ) -> Result<(), HitRejection> {
        if related || attacker.id == target.id {
            return Err(HitRejection::SameHierarchy);
        }
        if !mask.intersects(target.layer) {
            return Err(HitRejection::LayerMismatch);
        }
        if self.friendly_fire == FriendlyFire::Deny
            && attacker.faction.is_allied_with(target.faction)
        {
            return Err(HitRejection::FriendlyFire);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visited_set_per_session() {
        let mut hitbox = Hitbox::new(10, 1.0, LayerMask::ENEMY);
        assert_eq!(hitbox.try_register(5), Err(HitRejection::Disarmed));

        hitbox.arm();
        assert_eq!(hitbox.try_register(5), Ok(()));
        assert_eq!(hitbox.try_register(5), Err(HitRejection::AlreadyHit));
        assert_eq!(hitbox.try_register(6), Ok(()));

        hitbox.disarm();
        hitbox.arm();
        assert_eq!(hitbox.try_register(5), Ok(()));
        assert_eq!(hitbox.sessions(), 2);
    }

    #[test]
    fn test_rearm_while_armed_keeps_session() {
        let mut hitbox = Hitbox::new(10, 1.0, LayerMask::ENEMY);
        hitbox.arm();
        hitbox.try_register(1).unwrap();
        hitbox.arm();
        assert!(hitbox.has_hit(1));
        assert_eq!(hitbox.sessions(), 1);
    }

    #[test]
    fn test_speed_multiplier_floor() {
        assert_eq!(speed_multiplier(Vec2::ZERO, Vec2::RIGHT, 0.5), 1.0);
        assert_eq!(speed_multiplier(Vec2::new(0.5, 0.0), Vec2::RIGHT, 0.5), 1.0);
        assert_eq!(
            speed_multiplier(Vec2::new(f32::NAN, 0.0), Vec2::RIGHT, 0.5),
            1.0
        );
        assert_eq!(speed_multiplier(Vec2::new(5.0, 0.0), Vec2::ZERO, 0.5), 1.0);

        let fast = speed_multiplier(Vec2::new(std::f32::consts::E, 0.0), Vec2::RIGHT, 0.5);
        assert!((fast - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_speed_multiplier_monotonic() {
        let mut last = 0.0;
        for speed in [1.0, 2.0, 4.0, 8.0, 100.0] {
            let m = speed_multiplier(Vec2::new(speed, 0.0), Vec2::RIGHT, 0.5);
            assert!(m >= last);
            last = m;
        }
    }

    #[test]
    fn test_compute_damage() {
        let config = HitConfig::default();
        assert_eq!(compute_damage(25, 1.0, 0, &config), 25);
        assert_eq!(compute_damage(10, 1.25, 0, &config), 13);
        assert_eq!(compute_damage(10, 1.0, 5, &config), 15);
        assert_eq!(compute_damage(10, f32::NAN, 0, &config), 10);
        assert_eq!(compute_damage(10, 1.0, 1000, &config), 20);
    }

    #[test]
    fn test_knockback_blend() {
        let impulse = knockback_impulse(Vec2::RIGHT, Vec2::ZERO, Vec2::new(0.0, 1.0), 2.0, 1.0);
        assert!((impulse.length() - 2.0).abs() < 1e-5);
        assert!(impulse.x > 0.0 && impulse.y > 0.0);

        let opposed = knockback_impulse(Vec2::RIGHT, Vec2::ZERO, Vec2::new(-1.0, 0.0), 2.0, 1.0);
        assert_eq!(opposed, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_hierarchy() {
        let parent_of = |id: EntityId| match id {
            3 => Some(2),
            2 => Some(1),
            _ => None,
        };
        assert!(in_same_hierarchy(1, 3, parent_of));
        assert!(in_same_hierarchy(3, 1, parent_of));
        assert!(in_same_hierarchy(4, 4, parent_of));
        assert!(!in_same_hierarchy(4, 3, parent_of));
    }

    #[test]
    fn test_hierarchy_cycle_terminates() {
        let parent_of = |id: EntityId| match id {
            1 => Some(2),
            2 => Some(1),
            _ => None,
        };
        assert!(!in_same_hierarchy(5, 1, parent_of));
        assert!(in_same_hierarchy(1, 2, parent_of));
    }

    #[test]
    fn test_filter_policy() {
        let player = HitParty {
            id: 1,
            faction: Faction::Player,
            layer: LayerMask::PLAYER,
        };
        let enemy = HitParty {
            id: 2,
            faction: Faction::Enemy,
            layer: LayerMask::ENEMY,
        };
        let other_enemy = HitParty { id: 3, ..enemy };

        let deny = HitFilter::default();
        assert_eq!(deny.evaluate(player, enemy, LayerMask::ENEMY, false), Ok(()));
        assert_eq!(
            deny.evaluate(player, enemy, LayerMask::PROP, false),
            Err(HitRejection::LayerMismatch)
        );
        assert_eq!(
            deny.evaluate(enemy, other_enemy, LayerMask::ALL, false),
            Err(HitRejection::FriendlyFire)
        );
        assert_eq!(
            deny.evaluate(player, enemy, LayerMask::ALL, true),
            Err(HitRejection::SameHierarchy)
        );

        let allow = HitFilter {
            friendly_fire: FriendlyFire::Allow,
        };
        assert_eq!(allow.evaluate(enemy, other_enemy, LayerMask::ALL, false), Ok(()));
    }

    #[test]
    fn test_center_mirrors_with_facing() {
        let mut hitbox = Hitbox::new(1, 1.0, LayerMask::ALL);
        hitbox.offset = Vec2::new(1.0, 0.5);
        assert_eq!(hitbox.center(Vec2::ZERO, Vec2::RIGHT), Vec2::new(1.0, 0.5));
        assert_eq!(
            hitbox.center(Vec2::ZERO, Vec2::new(-1.0, 0.0)),
            Vec2::new(-1.0, 0.5)
        );
    }
}
