//! Translation of a hit into global feedback requests.

use serde::{Deserialize, Serialize};

use crate::config::FeedbackConfig;
use crate::events::HitEvent;

/// Feedback strengths for one hit. Every value scales with the hit's speed
/// multiplier and again by the kill boost on a killing blow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitFeedback {
    /// Hit-stop seconds.
    pub hit_stop: f32,
    /// Slow-motion factor to request, if any.
    pub slow_motion: Option<f32>,
    /// Camera shake trauma.
    pub shake: f32,
    /// Camera kickback strength.
    pub kickback: f32,
    /// Fisheye pulse strength.
    pub fisheye: f32,
}

impl HitFeedback {
    /// Compute feedback for `hit`.
    #[must_use]
    pub fn from_hit(hit: &HitEvent, config: &FeedbackConfig) -> Self {
        let speed = if hit.speed_multiplier.is_finite() {
            hit.speed_multiplier.max(1.0)
        } else {
            1.0
        };
        let boost = if hit.killing_blow {
            config.kill_boost.max(1.0)
        } else {
            1.0
        };
        let scale = speed * boost;

        let slow_motion = (hit.killing_blow || !config.slow_motion_on_kill_only)
            .then(|| (config.slow_motion_factor / scale).clamp(f32::EPSILON, 1.0))
            .filter(|factor| *factor < 1.0);

        Self {
            hit_stop: (config.hit_stop_base * scale).min(config.hit_stop_max),
            slow_motion,
            shake: (config.shake_base * scale).min(1.0),
            kickback: if hit.ranged {
                0.0
            } else {
                config.kickback_strength * scale
            },
            fisheye: if hit.killing_blow {
                config.fisheye_on_kill * speed
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    fn hit(speed_multiplier: f32, killing_blow: bool) -> HitEvent {
        HitEvent {
            attacker: 1,
            target: 2,
            damage: 10,
            speed_multiplier,
            killing_blow,
            position: Vec2::ZERO,
            ranged: false,
            combo_count: 1,
        }
    }

    #[test]
    fn test_plain_hit() {
        let config = FeedbackConfig::default();
        let fb = HitFeedback::from_hit(&hit(1.0, false), &config);
        assert_eq!(fb.hit_stop, config.hit_stop_base);
        assert_eq!(fb.slow_motion, None);
        assert_eq!(fb.fisheye, 0.0);
    }

    #[test]
    fn test_scales_with_speed_and_kill() {
        let config = FeedbackConfig::default();
        let slow = HitFeedback::from_hit(&hit(1.0, false), &config);
        let fast = HitFeedback::from_hit(&hit(2.0, false), &config);
        let kill = HitFeedback::from_hit(&hit(2.0, true), &config);

        assert!(fast.shake > slow.shake);
        assert!(kill.shake > fast.shake);
        assert!(kill.hit_stop >= fast.hit_stop);
        assert!(kill.hit_stop <= config.hit_stop_max);
        assert!(kill.fisheye > 0.0);

        let factor = kill.slow_motion.unwrap();
        assert!(factor < config.slow_motion_factor);
    }

    #[test]
    fn test_nan_speed_is_neutral() {
        let config = FeedbackConfig::default();
        let fb = HitFeedback::from_hit(&hit(f32::NAN, false), &config);
        assert_eq!(fb, HitFeedback::from_hit(&hit(1.0, false), &config));
    }
}
