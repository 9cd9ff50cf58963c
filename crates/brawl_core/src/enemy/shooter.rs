//! Ranged archetype: burst fire with spread and recoil.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{AttackCommand, AttackContext, Attacker};
use crate::targeting::aim_direction;
use crate::timer::TimerAction;

/// Weapon configuration. Each shot carries its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponStats {
    /// Template spawned per shot.
    pub projectile: String,
    /// Projectile speed.
    pub projectile_speed: f32,
    /// Shots per second within a burst.
    pub rate_of_fire: f32,
    /// Base damage per projectile.
    pub damage: u32,
    /// Maximum deviation from the aim direction in degrees.
    pub spread_deg: f32,
    /// Impulse pushed back onto the shooter per shot.
    pub recoil: f32,
    /// Shots per attack.
    pub burst: u32,
    /// Seconds a projectile lives.
    pub projectile_lifetime: f32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            projectile: "bullet".to_string(),
            projectile_speed: 12.0,
            rate_of_fire: 6.0,
            damage: 4,
            spread_deg: 6.0,
            recoil: 1.5,
            burst: 3,
            projectile_lifetime: 2.0,
        }
    }
}

/// Burst-fire driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShooterAttack {
    weapon: WeaponStats,
    busy: bool,
    shots_fired: u64,
}

impl ShooterAttack {
    /// Create an idle driver.
    #[must_use]
    pub fn new(weapon: WeaponStats) -> Self {
        Self {
            weapon,
            busy: false,
            shots_fired: 0,
        }
    }

    /// The configured weapon.
    #[must_use]
    pub const fn weapon(&self) -> &WeaponStats {
        &self.weapon
    }

    /// Shots fired over the driver's lifetime.
    #[must_use]
    pub const fn shots_fired(&self) -> u64 {
        self.shots_fired
    }

    fn fire(&mut self, shot: u32, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        let aim = aim_direction(ctx.position, ctx.facing, ctx.target);
        let spread = self.weapon.spread_deg.abs();
        let deviation = if spread > 0.0 {
            ctx.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let direction = aim.rotated_deg(deviation);
        self.shots_fired += 1;

        let mut commands = vec![
            AttackCommand::Fire {
                direction,
                weapon: self.weapon.clone(),
            },
            AttackCommand::Recoil {
                impulse: -direction * self.weapon.recoil,
            },
        ];

        let next = shot + 1;
        if next < self.weapon.burst.max(1) && self.weapon.rate_of_fire > 0.0 {
            commands.push(AttackCommand::Schedule {
                delay: 1.0 / self.weapon.rate_of_fire,
                action: TimerAction::FireShot {
                    shooter: ctx.me,
                    shot: next,
                },
            });
        } else {
            self.busy = false;
        }
        commands
    }
}

impl Attacker for ShooterAttack {
    fn begin_attack(&mut self, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        self.busy = true;
        self.fire(0, ctx)
    }

    fn on_timer(&mut self, action: &TimerAction, ctx: &mut AttackContext<'_>) -> Vec<AttackCommand> {
        match *action {
            TimerAction::FireShot { shot, .. } if self.busy => self.fire(shot, ctx),
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
    use crate::math::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fired_direction(commands: &[AttackCommand]) -> Vec2 {
        commands
            .iter()
            .find_map(|c| match c {
                AttackCommand::Fire { direction, .. } => Some(*direction),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_burst_schedules_follow_ups() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ctx = AttackContext {
            me: 9,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            target: Some(Vec2::new(5.0, 0.0)),
            allies: &[],
            rng: &mut rng,
        };
        let mut shooter = ShooterAttack::new(WeaponStats::default());

        let first = shooter.begin_attack(&mut ctx);
        assert!(shooter.is_busy());
        assert!(first.iter().any(|c| matches!(
            c,
            AttackCommand::Schedule {
                action: TimerAction::FireShot { shot: 1, .. },
                ..
            }
        )));

        shooter.on_timer(&TimerAction::FireShot { shooter: 9, shot: 1 }, &mut ctx);
        let last = shooter.on_timer(&TimerAction::FireShot { shooter: 9, shot: 2 }, &mut ctx);
        assert!(!shooter.is_busy());
        assert!(!last.iter().any(|c| matches!(c, AttackCommand::Schedule { .. })));
        assert_eq!(shooter.shots_fired(), 3);
    }

    #[test]
    fn test_spread_is_bounded_and_seeded() {
        let weapon = WeaponStats {
            burst: 1,
            ..WeaponStats::default()
        };
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut ctx = AttackContext {
                me: 1,
                position: Vec2::ZERO,
                facing: Vec2::RIGHT,
                target: None,
                allies: &[],
                rng: &mut rng,
            };
            fired_direction(&ShooterAttack::new(weapon.clone()).begin_attack(&mut ctx))
        };

        let a = run(3);
        assert_eq!(a, run(3));
        assert!(Vec2::RIGHT.angle_between_deg(a) <= weapon.spread_deg + 1e-3);
    }

    #[test]
    fn test_recoil_opposes_shot() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ctx = AttackContext {
            me: 1,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            target: None,
            allies: &[],
            rng: &mut rng,
        };
        let mut shooter = ShooterAttack::new(WeaponStats {
            spread_deg: 0.0,
            ..WeaponStats::default()
        });
        let commands = shooter.begin_attack(&mut ctx);
        assert!(commands.iter().any(|c| matches!(
            c,
            AttackCommand::Recoil { impulse } if impulse.x < 0.0
        )));
    }
}
