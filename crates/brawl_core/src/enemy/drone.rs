//! Flying support archetype: heal the most injured ally, then back off.

use serde::{Deserialize, Serialize};

use super::{AllyStatus, AttackCommand, AttackContext, Attacker};
use crate::components::EntityId;
use crate::timer::TimerAction;

/// Support drone tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneProfile {
    /// Hit points restored per heal.
    pub heal_amount: u32,
    /// Maximum distance to a healed ally.
    pub heal_range: f32,
    /// Speed of the retreat after acting.
    pub retreat_speed: f32,
    /// Seconds the retreat lasts.
    pub retreat_duration: f32,
}

impl Default for DroneProfile {
    fn default() -> Self {
        Self {
            heal_amount: 8,
            heal_range: 6.0,
            retreat_speed: 5.0,
            retreat_duration: 0.6,
        }
    }
}

/// Heal-and-retreat driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneSupport {
    profile: DroneProfile,
    busy: bool,
}

impl DroneSupport {
    /// Create an idle driver.
    #[must_use]
    pub fn new(profile: DroneProfile) -> Self {
        Self {
            profile,
            busy: false,
        }
    }

    /// Pick the ally with the lowest health fraction in range. Ties go to
    /// the lower id.
    #[must_use]
    pub fn most_injured(&self, ctx: &AttackContext<'_>) -> Option<EntityId> {
        let range_sq = self.profile.heal_range * self.profile.heal_range;
        ctx.allies
            .iter()
            .filter(|a| a.id != ctx.me && a.health_fraction < 1.0)
            .filter(|a| a.position.distance_squared(ctx.position) <= range_sq)
            .min_by(|a, b| {
                a.health_fraction
                    .total_cmp(&b.health_fraction)
                    .then(a.id.cmp(&b.id))
            })
            .map(|a: &AllyStatus| a.id)
    }
}

impl Attacker for DroneSupport {
    fn begin_attack(&mut self, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        self.busy = true;
        let mut commands = Vec::new();

        if let Some(target) = self.most_injured(ctx) {
            commands.push(AttackCommand::Heal {
                target,
                amount: self.profile.heal_amount,
            });
        }

        let away = ctx
            .target
            .map(|threat| (ctx.position - threat).normalize_or_zero())
            .filter(|dir| *dir != crate::math::Vec2::ZERO)
            .unwrap_or(-ctx.facing.normalize_or_zero());
        commands.push(AttackCommand::Lunge {
            velocity: away * self.profile.retreat_speed,
        });
        commands.push(AttackCommand::Schedule {
            delay: self.profile.retreat_duration,
            action: TimerAction::EndLunge(ctx.me),
        });
        commands
    }

    fn on_timer(&mut self, action: &TimerAction, _ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        if matches!(action, TimerAction::EndLunge(_)) {
            self.busy = false;
        }
        Vec::new()
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
    use crate::math::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ally(id: EntityId, x: f32, health_fraction: f32) -> AllyStatus {
        AllyStatus {
            id,
            position: Vec2::new(x, 0.0),
            health_fraction,
        }
    }

    #[test]
    fn test_heals_most_injured_in_range() {
        let allies = [
            ally(2, 1.0, 0.8),
            ally(3, 2.0, 0.3),
            ally(4, 50.0, 0.1),
            ally(5, 1.0, 1.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = AttackContext {
            me: 1,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            target: Some(Vec2::new(3.0, 0.0)),
            allies: &allies,
            rng: &mut rng,
        };
        let mut drone = DroneSupport::new(DroneProfile::default());

        let commands = drone.begin_attack(&mut ctx);
        assert_eq!(
            commands[0],
            AttackCommand::Heal {
                target: 3,
                amount: 8
            }
        );
        match commands[1] {
            AttackCommand::Lunge { velocity } => assert!(velocity.x < 0.0),
            ref other => panic!("expected retreat, got {other:?}"),
        }

        drone.on_timer(&TimerAction::EndLunge(1), &mut ctx);
        assert!(!drone.is_busy());
    }

    #[test]
    fn test_retreats_without_injured_allies() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = AttackContext {
            me: 1,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            target: None,
            allies: &[],
            rng: &mut rng,
        };
        let commands = DroneSupport::new(DroneProfile::default()).begin_attack(&mut ctx);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, AttackCommand::Heal { .. })));
    }
}
