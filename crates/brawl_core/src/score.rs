//! Kill rewards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// Running score total. Each actor is rewarded at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    total: u64,
    kills: u32,
    best_combo: u32,
    rewarded: BTreeSet<EntityId>,
}

impl ScoreBoard {
    /// Empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Award `base` points for killing `entity`, multiplied by the combo
    /// count. Returns the points awarded, or `None` if this actor was
    /// already rewarded.
    pub fn award_kill(&mut self, entity: EntityId, base: u32, combo_count: u32) -> Option<u32> {
        if !self.rewarded.insert(entity) {
            return None;
        }
        let points = base.saturating_mul(combo_count.max(1));
        self.total = self.total.saturating_add(u64::from(points));
        self.kills += 1;
        self.best_combo = self.best_combo.max(combo_count);
        Some(points)
    }

    /// Score total.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Rewarded kills.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Highest combo seen at a kill.
    #[must_use]
    pub const fn best_combo(&self) -> u32 {
        self.best_combo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_once_per_actor() {
        let mut board = ScoreBoard::new();
        assert_eq!(board.award_kill(5, 100, 3), Some(300));
        assert_eq!(board.award_kill(5, 100, 3), None);
        assert_eq!(board.award_kill(6, 100, 0), Some(100));
        assert_eq!(board.total(), 400);
        assert_eq!(board.kills(), 2);
        assert_eq!(board.best_combo(), 3);
    }
}
