//! Camera-side hit reactions: trauma shake, kickback and fisheye pulse.
//!
//! The rig runs on real time so feedback keeps moving during hit-stop. It
//! produces a [`CameraState`] offset for the host to add to its resting
//! camera transform; the rig never owns the camera itself.

use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::math::{move_towards, Vec2};

/// Below this, effects count as settled.
const REST_EPSILON: f32 = 1e-3;

/// Trauma-based screen shake. Offset grows with trauma squared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraShake {
    trauma: f32,
    elapsed: f32,
}

impl CameraShake {
    /// Add trauma, saturating at 1.
    pub fn add_trauma(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.trauma = (self.trauma + amount).min(1.0);
        }
    }

    /// Current trauma in `[0, 1]`.
    #[must_use]
    pub const fn trauma(&self) -> f32 {
        self.trauma
    }

    fn update(&mut self, dt: f32, config: &CameraConfig) -> Vec2 {
        if self.trauma <= 0.0 {
            return Vec2::ZERO;
        }
        self.elapsed += dt;
        self.trauma = (self.trauma - config.shake_decay * dt).max(0.0);

        let amount = self.trauma * self.trauma * config.max_shake_offset;
        let t = self.elapsed * config.shake_frequency;
        Vec2::new(
            (t.sin() * 1.3 + (t * 2.7).cos()) * 0.5 * amount,
            ((t * 1.1).cos() * 1.5 + (t * 3.1).sin()) * 0.4 * amount,
        )
    }
}

/// Impulse pushed onto the camera, pulled home by a damped spring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraKickback {
    offset: Vec2,
    velocity: Vec2,
}

impl CameraKickback {
    /// Push the camera along `direction`.
    pub fn kick(&mut self, direction: Vec2, strength: f32) {
        if strength.is_finite() {
            self.velocity += direction.normalize_or_zero() * strength * 10.0;
        }
    }

    /// Current offset.
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    fn update(&mut self, dt: f32, config: &CameraConfig) -> Vec2 {
        let accel = self.offset * -config.kickback_stiffness + self.velocity * -config.kickback_damping;
        self.velocity += accel * dt;
        self.offset += self.velocity * dt;
        if self.offset.length() < REST_EPSILON && self.velocity.length() < REST_EPSILON {
            self.offset = Vec2::ZERO;
            self.velocity = Vec2::ZERO;
        }
        self.offset
    }
}

/// Lens distortion pulse that recovers linearly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fisheye {
    strength: f32,
}

impl Fisheye {
    /// Start a pulse. A stronger pulse replaces a weaker one.
    pub fn pulse(&mut self, strength: f32) {
        if strength.is_finite() {
            self.strength = self.strength.max(strength.clamp(0.0, 1.0));
        }
    }

    fn update(&mut self, dt: f32, config: &CameraConfig) -> f32 {
        self.strength = move_towards(self.strength, 0.0, config.fisheye_recovery * dt);
        self.strength
    }
}

/// Output of the rig for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Offset from the resting transform.
    pub offset: Vec2,
    /// Fisheye strength.
    pub fisheye: f32,
}

impl CameraState {
    /// Whether the camera is back at rest.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.offset == Vec2::ZERO && self.fisheye <= 0.0
    }
}

/// All camera effects combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    config: CameraConfig,
    shake: CameraShake,
    kickback: CameraKickback,
    fisheye: Fisheye,
    state: CameraState,
}

impl CameraRig {
    /// Create a rig at rest.
    #[must_use]
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            config: config.clone(),
            shake: CameraShake::default(),
            kickback: CameraKickback::default(),
            fisheye: Fisheye::default(),
            state: CameraState::default(),
        }
    }

    /// Add shake trauma.
    pub fn add_shake(&mut self, trauma: f32) {
        self.shake.add_trauma(trauma);
    }

    /// Kick the camera.
    pub fn kick(&mut self, direction: Vec2, strength: f32) {
        self.kickback.kick(direction, strength);
    }

    /// Start a fisheye pulse.
    pub fn pulse_fisheye(&mut self, strength: f32) {
        self.fisheye.pulse(strength);
    }

    /// Shake state.
    #[must_use]
    pub const fn shake(&self) -> &CameraShake {
        &self.shake
    }

    /// Last computed state.
    #[must_use]
    pub const fn state(&self) -> CameraState {
        self.state
    }

    /// Advance all effects by `real_dt` seconds.
    pub fn update(&mut self, real_dt: f32) -> CameraState {
        let dt = if real_dt.is_finite() { real_dt.max(0.0) } else { 0.0 };
        let shake = self.shake.update(dt, &self.config);
        let kick = self.kickback.update(dt, &self.config);
        let fisheye = self.fisheye.update(dt, &self.config);

        let offset = shake + kick;
        self.state = CameraState {
            offset: if offset.is_finite() { offset } else { Vec2::ZERO },
            fisheye,
        };
        self.state
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(rig: &mut CameraRig, seconds: f32) -> CameraState {
        let mut state = rig.state();
        for _ in 0..(seconds * 60.0) as usize {
            state = rig.update(1.0 / 60.0);
        }
        state
    }

    #[test]
    fn test_shake_decays_to_rest() {
        let mut rig = CameraRig::default();
        rig.add_shake(0.8);
        let first = rig.update(1.0 / 60.0);
        assert!(!first.is_resting());
        assert!(settle(&mut rig, 1.0).is_resting());
        assert_eq!(rig.shake().trauma(), 0.0);
    }

    #[test]
    fn test_trauma_saturates() {
        let mut shake = CameraShake::default();
        shake.add_trauma(0.7);
        shake.add_trauma(0.7);
        shake.add_trauma(f32::NAN);
        assert_eq!(shake.trauma(), 1.0);
    }

    #[test]
    fn test_kickback_springs_home() {
        let mut rig = CameraRig::default();
        rig.kick(Vec2::new(-1.0, 0.0), 0.5);
        let pushed = rig.update(1.0 / 60.0);
        assert!(pushed.offset.x < 0.0);
        assert!(settle(&mut rig, 3.0).is_resting());
    }

    #[test]
    fn test_fisheye_recovers() {
        let mut rig = CameraRig::default();
        rig.pulse_fisheye(0.3);
        rig.pulse_fisheye(0.1);
        assert!((rig.update(0.0).fisheye - 0.3).abs() < 1e-6);
        assert_eq!(settle(&mut rig, 0.5).fisheye, 0.0);
    }
}
