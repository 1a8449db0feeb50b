//! Enemy spawning with level scaling.
//!
//! Every spawned enemy rolls a level around the requested base and a
//! gaussian stat multiplier from it. Health, damage and experience
//! reward grow with the multiplier and are truncated to whole
//! numbers; armor is never scaled, every enemy spawns at ratio 1.0.

use glam::Vec2;
use tracing::debug;

use ashfall_common::{Millis, Rect};

use crate::ai::AiState;
use crate::attack::{EnemyAttackState, UltimateState};
use crate::config::CombatConfig;
use crate::entity::{CombatEntity, EnemyCombat, EnemyKind};

/// Rolls levels and stat multipliers for spawned enemies.
#[derive(Debug)]
pub struct EnemySpawner {
    rng: fastrand::Rng,
}

impl Default for EnemySpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl EnemySpawner {
    /// Creates a spawner with an entropy-seeded generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Creates a spawner with a fixed seed, for reproducible rolls.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Spawns an enemy of the given archetype at a top-left position.
    ///
    /// The enemy's level is `base_level` plus up to two; the stat
    /// multiplier is a half-gaussian scaled by the rolled level.
    /// Facing is random.
    pub fn spawn(
        &mut self,
        kind: EnemyKind,
        base_level: u32,
        config: &CombatConfig,
        position: Vec2,
        now: Millis,
    ) -> CombatEntity {
        let stats = config.enemy.stats(kind);
        let level = base_level + self.rng.u32(0..=2);
        let multiplier = self.gauss(0.0, 3.0).abs() * level as f32;
        let bonus = config.enemy.bonus_base;

        let health = (stats.health + 10.0 * bonus * multiplier).trunc();
        let damage = (stats.damage + bonus * multiplier).trunc();
        let experience = (stats.experience as f32 + bonus * multiplier).trunc() as u32;
        debug!(
            kind = kind.name(),
            level, multiplier, health, damage, "rolled enemy stats"
        );

        let combat = EnemyCombat {
            kind,
            attack: EnemyAttackState::from_stats(stats, damage),
            ai: AiState::from_stats(stats, &config.enemy),
            experience_reward: experience,
            ultimate: stats
                .ultimate_cooldown_ms
                .map(|cooldown| UltimateState::new(cooldown, now)),
            level,
            multiplier,
        };
        let rect = Rect::from_topleft(
            position.x,
            position.y,
            stats.body_size.x,
            stats.body_size.y,
        );
        CombatEntity::enemy(
            combat,
            rect,
            health,
            config.enemy.immunity_ms,
            self.rng.bool(),
        )
    }

    /// Draws from a normal distribution via the Box-Muller transform.
    fn gauss(&mut self, mean: f32, std_dev: f32) -> f32 {
        // Keep u1 away from zero for the logarithm
        let u1 = self.rng.f32().max(f32::MIN_POSITIVE);
        let u2 = self.rng.f32();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
        mean + std_dev * z
    }
}
