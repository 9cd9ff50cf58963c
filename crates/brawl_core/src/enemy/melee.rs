//! Melee archetype: wind up, lunge, swing.

use serde::{Deserialize, Serialize};

use super::{AttackCommand, AttackContext, Attacker};
use crate::math::Vec2;
use crate::targeting::aim_direction;
use crate::timer::TimerAction;

/// Timing of a melee swing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeProfile {
    /// Seconds between starting the attack and the hitbox arming.
    pub windup: f32,
    /// Seconds the hitbox stays armed.
    pub active_window: f32,
    /// Lunge speed while the hitbox is armed.
    pub lunge_speed: f32,
    /// Seconds the lunge lasts.
    pub lunge_duration: f32,
}

impl Default for MeleeProfile {
    fn default() -> Self {
        Self {
            windup: 0.35,
            active_window: 0.2,
            lunge_speed: 7.0,
            lunge_duration: 0.15,
        }
    }
}

/// Melee attack driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeAttack {
    profile: MeleeProfile,
    lunge_direction: Vec2,
    busy: bool,
}

impl MeleeAttack {
    /// Create an idle driver.
    #[must_use]
    pub fn new(profile: MeleeProfile) -> Self {
        Self {
            profile,
            lunge_direction: Vec2::RIGHT,
            busy: false,
        }
    }

    /// Swing timing.
    #[must_use]
    pub const fn profile(&self) -> &MeleeProfile {
        &self.profile
    }
}

impl Attacker for MeleeAttack {
    fn begin_attack(&mut self, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        self.busy = true;
        self.lunge_direction = aim_direction(ctx.position, ctx.facing, ctx.target);
        let windup = self.profile.windup;
        vec![
            AttackCommand::Schedule {
                delay: windup,
                action: TimerAction::ArmHitbox(ctx.me),
            },
            AttackCommand::Schedule {
                delay: windup + self.profile.active_window,
                action: TimerAction::DisarmHitbox(ctx.me),
            },
        ]
    }

    fn on_timer(&mut self, action: &TimerAction, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        match *action {
            TimerAction::ArmHitbox(_) if self.busy => vec![
                AttackCommand::Lunge {
                    velocity: self.lunge_direction * self.profile.lunge_speed,
                },
                AttackCommand::Schedule {
                    delay: self.profile.lunge_duration,
                    action: TimerAction::EndLunge(ctx.me),
                },
            ],
            TimerAction::DisarmHitbox(_) => {
                self.busy = false;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn cancel(&mut self) {
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_swing_sequence() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = AttackContext {
            me: 4,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            target: Some(Vec2::new(0.0, 2.0)),
            allies: &[],
            rng: &mut rng,
        };
        let mut melee = MeleeAttack::new(MeleeProfile::default());

        let commands = melee.begin_attack(&mut ctx);
        assert!(melee.is_busy());
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            AttackCommand::Schedule {
                action: TimerAction::ArmHitbox(4),
                ..
            }
        ));

        let strike = melee.on_timer(&TimerAction::ArmHitbox(4), &mut ctx);
        match strike[0] {
            AttackCommand::Lunge { velocity } => assert!(velocity.y > 0.0),
            ref other => panic!("expected lunge, got {other:?}"),
        }

        melee.on_timer(&TimerAction::DisarmHitbox(4), &mut ctx);
        assert!(!melee.is_busy());
    }
}
