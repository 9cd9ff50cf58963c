//! Target tracking and aim.
//!
//! A [`Targeting`] component holds the actor's current target reference.
//! The reference may go stale at any time (the target despawns); every
//! consumer resolves it through the world and falls back to the actor's
//! facing direction when it cannot.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::Vec2;
use crate::timer::Cooldown;

/// Radius-and-cone vision check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionCone {
    /// Maximum sight distance.
    pub radius: f32,
    /// Half-angle of the cone in degrees, measured from the facing
    /// direction. 180 means all-round vision.
    pub half_angle_deg: f32,
}

impl VisionCone {
    /// Whether `point` is within sight of an observer at `origin` looking
    /// along `facing`.
    #[must_use]
    pub fn can_see(&self, origin: Vec2, facing: Vec2, point: Vec2) -> bool {
        let to_point = point - origin;
        let dist_sq = to_point.length_squared();
        if !dist_sq.is_finite() || dist_sq > self.radius * self.radius {
            return false;
        }
        if self.half_angle_deg >= 180.0 || dist_sq <= crate::math::EPSILON {
            return true;
        }
        facing.angle_between_deg(to_point) <= self.half_angle_deg
    }
}

impl Default for VisionCone {
    fn default() -> Self {
        Self {
            radius: 8.0,
            half_angle_deg: 70.0,
        }
    }
}

/// Current target and periodic re-acquisition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    target: Option<EntityId>,
    last_known: Option<Vec2>,
    reacquire: Cooldown,
}

impl Targeting {
    /// Targeting with no target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targeting locked onto `target`.
    #[must_use]
    pub fn with_target(target: EntityId) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    /// Current target reference, which may be stale.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Last position the target was seen at.
    #[must_use]
    pub const fn last_known(&self) -> Option<Vec2> {
        self.last_known
    }

    /// Lock onto a new target.
    pub fn set_target(&mut self, target: EntityId) {
        if self.target != Some(target) {
            self.last_known = None;
        }
        self.target = Some(target);
    }

    /// Record where the target was seen this tick.
    pub fn observe(&mut self, position: Vec2) {
        self.last_known = Some(position);
    }

    /// Drop the target and wait `retry_after` seconds before trying again.
    pub fn clear(&mut self, retry_after: f32) {
        self.target = None;
        self.last_known = None;
        self.reacquire.start(retry_after);
    }

    /// Count down the re-acquisition timer.
    pub fn tick(&mut self, dt: f32) {
        self.reacquire.tick(dt);
    }

    /// Whether a re-acquisition attempt is due.
    #[must_use]
    pub fn should_reacquire(&self) -> bool {
        self.target.is_none() && self.reacquire.is_ready()
    }

    /// Restart the re-acquisition timer after a failed attempt.
    pub fn defer_reacquire(&mut self, seconds: f32) {
        self.reacquire.start(seconds);
    }
}

/// Aim direction from `origin` toward `target`, or `facing` when there is
/// no usable target.
#[must_use]
pub fn aim_direction(origin: Vec2, facing: Vec2, target: Option<Vec2>) -> Vec2 {
    let fallback = facing.normalize_or_zero();
    match target {
        Some(point) => {
            let dir = (point - origin).normalize_or_zero();
            if dir == Vec2::ZERO {
                fallback
            } else {
                dir
            }
        }
        None => fallback,
    }
}

/// Whether `target` is within `range` of `origin`.
#[must_use]
pub fn in_range(origin: Vec2, target: Vec2, range: f32) -> bool {
    origin.distance_squared(target) <= range * range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_requires_radius_and_cone() {
        let cone = VisionCone {
            radius: 5.0,
            half_angle_deg: 45.0,
        };
        let origin = Vec2::ZERO;

        assert!(cone.can_see(origin, Vec2::RIGHT, Vec2::new(3.0, 1.0)));
        assert!(!cone.can_see(origin, Vec2::RIGHT, Vec2::new(6.0, 0.0)));
        assert!(!cone.can_see(origin, Vec2::RIGHT, Vec2::new(-3.0, 0.0)));
        assert!(!cone.can_see(origin, Vec2::RIGHT, Vec2::new(1.0, 3.0)));
    }

    #[test]
    fn test_full_circle_vision() {
        let cone = VisionCone {
            radius: 5.0,
            half_angle_deg: 180.0,
        };
        assert!(cone.can_see(Vec2::ZERO, Vec2::RIGHT, Vec2::new(-3.0, 0.0)));
    }

    #[test]
    fn test_aim_defaults_to_facing() {
        assert_eq!(aim_direction(Vec2::ZERO, Vec2::RIGHT, None), Vec2::RIGHT);
        assert_eq!(
            aim_direction(Vec2::ZERO, Vec2::RIGHT, Some(Vec2::ZERO)),
            Vec2::RIGHT
        );
        let aim = aim_direction(Vec2::ZERO, Vec2::RIGHT, Some(Vec2::new(0.0, 2.0)));
        assert!((aim.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reacquire_timer() {
        let mut targeting = Targeting::with_target(3);
        assert!(!targeting.should_reacquire());

        targeting.clear(1.0);
        assert!(!targeting.should_reacquire());
        targeting.tick(1.1);
        assert!(targeting.should_reacquire());

        targeting.set_target(4);
        assert_eq!(targeting.target(), Some(4));
        assert!(!targeting.should_reacquire());
    }

    #[test]
    fn test_in_range() {
        assert!(in_range(Vec2::ZERO, Vec2::new(1.0, 1.0), 1.5));
        assert!(!in_range(Vec2::ZERO, Vec2::new(2.0, 0.0), 1.5));
    }
}
