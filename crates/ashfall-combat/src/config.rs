//! Combat tuning loaded from TOML.
//!
//! Every timing window, damage value and range in the combat system
//! comes from [`CombatConfig`]. Missing keys fall back to their
//! defaults, so a config file only needs to list overrides.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use ashfall_common::Millis;

use crate::entity::EnemyKind;

/// Error types for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level combat tuning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Player-side tuning
    pub player: PlayerConfig,
    /// Enemy-side tuning
    pub enemy: EnemyConfig,
    /// Transient attack volume tuning
    pub volumes: VolumeConfig,
    /// World-level tuning
    pub world: WorldConfig,
}

/// Player combat tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Maximum health
    pub max_health: f32,
    /// Sword attack tuning
    pub sword: SwordConfig,
    /// Bow attack tuning
    pub arch: ArchConfig,
    /// Cooldown after a shield raise, in milliseconds
    pub shield_cooldown_ms: Millis,
    /// Post-hit immunity window, in milliseconds
    pub immunity_ms: Millis,
    /// Delay between player death and game over, in milliseconds
    pub death_latency_ms: Millis,
    /// Experience required for the first level-up
    pub experience_max: u32,
    /// Growth factor applied to the threshold on each level-up
    pub experience_growth: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 2000.0,
            sword: SwordConfig::default(),
            arch: ArchConfig::default(),
            shield_cooldown_ms: 1000,
            immunity_ms: 300,
            death_latency_ms: 2000,
            experience_max: 300,
            experience_growth: 1.5,
        }
    }
}

/// Sword swing tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwordConfig {
    /// Base damage before equipment bonuses
    pub damage: f32,
    /// Total swing duration, in milliseconds
    pub swing_ms: Millis,
    /// Cooldown measured from the end of the previous swing
    pub cooldown_ms: Millis,
    /// Fraction of the swing at which the blade lands (0..1)
    pub hit_fraction: f32,
    /// Size of the spawned hit volume
    pub size: Vec2,
    /// Horizontal gap between the attacker and the hit volume
    pub space: f32,
}

impl Default for SwordConfig {
    fn default() -> Self {
        Self {
            damage: 60.0,
            swing_ms: 200,
            cooldown_ms: 1000,
            hit_fraction: 0.65,
            size: Vec2::new(60.0, 85.5),
            space: 37.5,
        }
    }
}

/// Bow draw tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchConfig {
    /// Arrow damage before equipment bonuses
    pub damage: f32,
    /// Draw duration before the arrow releases, in milliseconds
    pub draw_ms: Millis,
    /// Cooldown measured from the end of the previous draw
    pub cooldown_ms: Millis,
    /// Nominal arrow range (display and AI hinting)
    pub range: f32,
}

impl Default for ArchConfig {
    fn default() -> Self {
        Self {
            damage: 60.0,
            draw_ms: 500,
            cooldown_ms: 1000,
            range: 300.0,
        }
    }
}

/// Enemy-side tuning shared across archetypes, plus per-archetype
/// stat tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Post-hit immunity window, in milliseconds
    pub immunity_ms: Millis,
    /// Delay between enemy death and despawn, in milliseconds
    pub death_latency_ms: Millis,
    /// Windup between engaging and the first attack, in milliseconds
    pub preparing_ms: Millis,
    /// How long a stun lasts, in milliseconds
    pub stun_duration_ms: Millis,
    /// Base factor for level scaling of spawned enemies
    pub bonus_base: f32,
    /// Skeleton warrior stats
    pub sceleton: ArchetypeStats,
    /// Ninja archer stats
    pub ninja: ArchetypeStats,
    /// Wizard stats
    pub wizard: ArchetypeStats,
    /// Dark knight stats
    pub dark_knight: ArchetypeStats,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            immunity_ms: 300,
            death_latency_ms: 700,
            preparing_ms: 400,
            stun_duration_ms: 1300,
            bonus_base: 10.0,
            sceleton: ArchetypeStats {
                health: 225.0,
                damage: 60.0,
                experience: 20,
                trigger_range: 450.0,
                attack_range: 90.0,
                attack_size: Some(Vec2::new(90.0, 120.0)),
                attack_space: 30.0,
                attack_speed: 0.25,
                attack_frames: 8.0,
                walk_speed: 1.5,
                body_size: Vec2::new(45.0, 93.0),
                ultimate_cooldown_ms: None,
            },
            ninja: ArchetypeStats {
                health: 120.0,
                damage: 60.0,
                experience: 20,
                trigger_range: 525.0,
                attack_range: 450.0,
                attack_size: None,
                attack_space: 7.5,
                attack_speed: 0.15,
                attack_frames: 8.0,
                walk_speed: 1.5,
                body_size: Vec2::new(45.0, 85.5),
                ultimate_cooldown_ms: None,
            },
            wizard: ArchetypeStats {
                health: 60.0,
                damage: 200.0,
                experience: 50,
                trigger_range: 675.0,
                attack_range: 600.0,
                attack_size: None,
                attack_space: 7.5,
                attack_speed: 0.25,
                attack_frames: 8.0,
                walk_speed: 1.5,
                body_size: Vec2::new(45.0, 85.5),
                ultimate_cooldown_ms: Some(3000),
            },
            dark_knight: ArchetypeStats {
                health: 420.0,
                damage: 420.0,
                experience: 420,
                trigger_range: 375.0,
                attack_range: 97.5,
                attack_size: Some(Vec2::new(67.5, 150.0)),
                attack_space: 15.0,
                attack_speed: 0.3,
                attack_frames: 10.0,
                walk_speed: 1.5,
                body_size: Vec2::new(120.0, 225.0),
                ultimate_cooldown_ms: None,
            },
        }
    }
}

impl EnemyConfig {
    /// Returns the stat table for an archetype.
    #[must_use]
    pub fn stats(&self, kind: EnemyKind) -> &ArchetypeStats {
        match kind {
            EnemyKind::Sceleton => &self.sceleton,
            EnemyKind::Ninja => &self.ninja,
            EnemyKind::Wizard => &self.wizard,
            EnemyKind::DarkKnight => &self.dark_knight,
        }
    }
}

/// Base stats for one enemy archetype, before level scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeStats {
    /// Base health
    pub health: f32,
    /// Base damage per hit
    pub damage: f32,
    /// Base experience granted on defeat
    pub experience: u32,
    /// Distance at which the enemy notices the player
    pub trigger_range: f32,
    /// Distance at which the enemy engages and attacks
    pub attack_range: f32,
    /// Hit volume size for melee archetypes, absent for shooters
    pub attack_size: Option<Vec2>,
    /// Horizontal gap between the enemy and its hit volume
    pub attack_space: f32,
    /// Attack animation progress per tick
    pub attack_speed: f32,
    /// Length of the attack animation in frames
    pub attack_frames: f32,
    /// Walk speed while chasing, in pixels per tick
    pub walk_speed: f32,
    /// Collision body size
    pub body_size: Vec2,
    /// Cooldown for the archetype's ultimate, if it has one
    pub ultimate_cooldown_ms: Option<Millis>,
}

impl Default for ArchetypeStats {
    fn default() -> Self {
        Self {
            health: 100.0,
            damage: 10.0,
            experience: 10,
            trigger_range: 450.0,
            attack_range: 90.0,
            attack_size: None,
            attack_space: 15.0,
            attack_speed: 0.25,
            attack_frames: 8.0,
            walk_speed: 1.5,
            body_size: Vec2::new(45.0, 90.0),
            ultimate_cooldown_ms: None,
        }
    }
}

/// Tuning for transient attack volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Melee hit volume lifetime, in milliseconds
    pub hit_lifetime_ms: Millis,
    /// Projectile lifetime, in milliseconds
    pub projectile_lifetime_ms: Millis,
    /// Side length of a projectile's square collision box
    pub projectile_extent: f32,
    /// Arrow speed, in pixels per tick
    pub arrow_speed: f32,
    /// Death bullet speed, in pixels per tick
    pub death_bullet_speed: f32,
    /// Thunder column tuning
    pub thunder: ThunderConfig,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            hit_lifetime_ms: 100,
            projectile_lifetime_ms: 1500,
            projectile_extent: 5.0,
            arrow_speed: 15.0,
            death_bullet_speed: 7.5,
            thunder: ThunderConfig::default(),
        }
    }
}

/// Thunder column tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThunderConfig {
    /// Width of the column when summoned
    pub initial_width: f32,
    /// Width at which the column stops shrinking and strikes
    pub min_width: f32,
    /// Width lost per tick while charging
    pub shrink_per_tick: f32,
    /// Height of the column
    pub height: f32,
    /// How long the strike stays damaging, in milliseconds
    pub active_ms: Millis,
    /// Damage multiplier over the caster's base damage
    pub damage_multiplier: f32,
}

impl Default for ThunderConfig {
    fn default() -> Self {
        Self {
            initial_width: 60.0,
            min_width: 10.0,
            shrink_per_tick: 1.5,
            height: 1500.0,
            active_ms: 600,
            damage_multiplier: 1.5,
        }
    }
}

/// World-level tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal distance beyond which enemies are not simulated
    pub sim_distance: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            sim_distance: 1600.0,
        }
    }
}

impl CombatConfig {
    /// Loads config from a file, falling back to defaults if the file
    /// is missing or malformed.
    ///
    /// Out-of-range values are clamped and logged rather than
    /// rejected.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        let mut config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded combat config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            },
        };

        for message in config.validate() {
            warn!("Combat config: {message}");
        }
        config
    }

    /// Parses config from a TOML string.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves config to a file as pretty-printed TOML.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Clamps out-of-range values in place and returns a description
    /// of each adjustment.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.0..=1.0).contains(&self.player.sword.hit_fraction) {
            let clamped = self.player.sword.hit_fraction.clamp(0.0, 1.0);
            warnings.push(format!(
                "sword hit_fraction {} out of range, clamped to {clamped}",
                self.player.sword.hit_fraction
            ));
            self.player.sword.hit_fraction = clamped;
        }

        if self.player.max_health <= 0.0 {
            warnings.push(format!(
                "player max_health {} must be positive, reset to default",
                self.player.max_health
            ));
            self.player.max_health = PlayerConfig::default().max_health;
        }

        if self.player.experience_growth < 1.0 {
            warnings.push(format!(
                "experience_growth {} below 1.0, reset to default",
                self.player.experience_growth
            ));
            self.player.experience_growth = PlayerConfig::default().experience_growth;
        }

        let tables = [
            (EnemyKind::Sceleton, &mut self.enemy.sceleton),
            (EnemyKind::Ninja, &mut self.enemy.ninja),
            (EnemyKind::Wizard, &mut self.enemy.wizard),
            (EnemyKind::DarkKnight, &mut self.enemy.dark_knight),
        ];
        for (kind, stats) in tables {
            if stats.attack_speed <= 0.0 {
                warnings.push(format!(
                    "{} attack_speed {} must be positive, reset to default",
                    kind.name(),
                    stats.attack_speed
                ));
                stats.attack_speed = ArchetypeStats::default().attack_speed;
            }
            if stats.attack_frames < 1.0 {
                warnings.push(format!(
                    "{} attack_frames {} below 1, clamped",
                    kind.name(),
                    stats.attack_frames
                ));
                stats.attack_frames = 1.0;
            }
            if stats.health <= 0.0 {
                warnings.push(format!(
                    "{} health {} must be positive, reset to default",
                    kind.name(),
                    stats.health
                ));
                stats.health = ArchetypeStats::default().health;
            }
        }

        if self.volumes.thunder.shrink_per_tick <= 0.0 {
            warnings.push(format!(
                "thunder shrink_per_tick {} must be positive, reset to default",
                self.volumes.thunder.shrink_per_tick
            ));
            self.volumes.thunder.shrink_per_tick = ThunderConfig::default().shrink_per_tick;
        }

        if self.volumes.thunder.min_width > self.volumes.thunder.initial_width {
            warnings.push(format!(
                "thunder min_width {} exceeds initial_width {}, clamped",
                self.volumes.thunder.min_width, self.volumes.thunder.initial_width
            ));
            self.volumes.thunder.min_width = self.volumes.thunder.initial_width;
        }

        if self.world.sim_distance < 0.0 {
            warnings.push(format!(
                "sim_distance {} must be non-negative, clamped to 0",
                self.world.sim_distance
            ));
            self.world.sim_distance = 0.0;
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = CombatConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed = CombatConfig::from_toml(&toml_str).expect("parse");
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = CombatConfig::load_from(Path::new("/nonexistent/combat.toml"));
        assert_eq!(config, CombatConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = CombatConfig::from_toml(
            r#"
            [player.sword]
            damage = 90.0
            "#,
        )
        .expect("parse");

        assert_eq!(config.player.sword.damage, 90.0);
        assert_eq!(config.player.sword.swing_ms, 200);
        assert_eq!(config.enemy.sceleton.health, 225.0);
    }

    #[test]
    fn test_validate_clamps_hit_fraction() {
        let mut config = CombatConfig::default();
        config.player.sword.hit_fraction = 1.7;

        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.player.sword.hit_fraction, 1.0);
    }

    #[test]
    fn test_validate_resets_bad_attack_speed() {
        let mut config = CombatConfig::default();
        config.enemy.ninja.attack_speed = 0.0;

        let warnings = config.validate();
        assert!(!warnings.is_empty());
        assert!(config.enemy.ninja.attack_speed > 0.0);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let mut config = CombatConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("combat.toml");

        let mut config = CombatConfig::default();
        config.player.sword.damage = 75.0;
        config.enemy.wizard.trigger_range = 700.0;
        config.save_to(&path).expect("save");

        let loaded = CombatConfig::load_from(&path);
        assert_eq!(loaded.player.sword.damage, 75.0);
        assert_eq!(loaded.enemy.wizard.trigger_range, 700.0);
    }

    #[test]
    fn test_stats_lookup_by_kind() {
        let config = CombatConfig::default();
        assert_eq!(config.enemy.stats(EnemyKind::Sceleton).health, 225.0);
        assert_eq!(config.enemy.stats(EnemyKind::DarkKnight).damage, 420.0);
        assert!(config
            .enemy
            .stats(EnemyKind::Wizard)
            .ultimate_cooldown_ms
            .is_some());
    }
}
