//! Hurt gating, immunity windows and armor bookkeeping.
//!
//! Damage application itself lives on the entity; this state tracks
//! whether an entity can currently be hurt and what fraction of
//! incoming damage it takes.

use serde::{Deserialize, Serialize};

use ashfall_common::Millis;

/// Per-entity defense state.
///
/// `armor_ratio` multiplies incoming damage before it is subtracted
/// from health; 1.0 means full damage. A stun saves the current ratio
/// and divides it by 3 until the stun resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseState {
    /// Immunity window after a hit, in milliseconds
    pub immunity_ms: Millis,
    armor_ratio: f32,
    armor_before: f32,
    just_hurt: bool,
    just_hurt_time: Millis,
}

impl DefenseState {
    /// Creates defense state with full damage intake.
    #[must_use]
    pub fn new(immunity_ms: Millis) -> Self {
        Self {
            immunity_ms,
            armor_ratio: 1.0,
            armor_before: 1.0,
            just_hurt: false,
            just_hurt_time: 0,
        }
    }

    /// Whether the entity is outside its immunity window.
    ///
    /// Callers must check this before applying damage; the hurt path
    /// itself does not re-check.
    #[must_use]
    pub const fn can_be_hurt(&self) -> bool {
        !self.just_hurt
    }

    /// Whether the entity was hurt within the immunity window.
    #[must_use]
    pub const fn just_hurt(&self) -> bool {
        self.just_hurt
    }

    /// Opens the immunity window at the moment of a hit.
    pub fn mark_hurt(&mut self, now: Millis) {
        self.just_hurt = true;
        self.just_hurt_time = now;
    }

    /// Per-frame poll that closes the immunity window strictly after
    /// `immunity_ms` has elapsed.
    pub fn tick(&mut self, now: Millis) {
        if self.just_hurt && now.saturating_sub(self.just_hurt_time) > self.immunity_ms {
            self.just_hurt = false;
        }
    }

    /// Current damage multiplier.
    #[must_use]
    pub const fn armor_ratio(&self) -> f32 {
        self.armor_ratio
    }

    /// Saves the current armor ratio and reduces it for the duration
    /// of a stun.
    pub fn stun_armor(&mut self) {
        self.armor_before = self.armor_ratio;
        self.armor_ratio /= 3.0;
    }

    /// Restores the armor ratio saved when the stun began.
    pub fn restore_armor(&mut self) {
        self.armor_ratio = self.armor_before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_immunity_window_strictly_elapses() {
        let mut defense = DefenseState::new(300);
        assert!(defense.can_be_hurt());

        defense.mark_hurt(1000);
        assert!(!defense.can_be_hurt());

        defense.tick(1300);
        assert!(!defense.can_be_hurt());

        defense.tick(1301);
        assert!(defense.can_be_hurt());
    }

    #[test]
    fn test_stun_divides_and_restores_armor() {
        let mut defense = DefenseState::new(300);
        assert_eq!(defense.armor_ratio(), 1.0);

        defense.stun_armor();
        assert!((defense.armor_ratio() - 1.0 / 3.0).abs() < 1e-6);

        defense.restore_armor();
        assert_eq!(defense.armor_ratio(), 1.0);
    }

    #[test]
    fn test_tick_without_hit_is_noop() {
        let mut defense = DefenseState::new(300);
        defense.tick(5000);
        assert!(defense.can_be_hurt());
    }

    proptest! {
        #[test]
        fn prop_immunity_never_clears_early(
            window in 1u64..2000,
            hurt_at in 0u64..100_000,
            offset in 0u64..4000,
        ) {
            let mut defense = DefenseState::new(window);
            defense.mark_hurt(hurt_at);
            defense.tick(hurt_at + offset);

            if offset <= window {
                prop_assert!(defense.just_hurt());
            } else {
                prop_assert!(defense.can_be_hurt());
            }
        }
    }
}
