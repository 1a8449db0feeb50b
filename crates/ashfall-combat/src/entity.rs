//! Combat entities and their lifecycle transitions.
//!
//! A [`CombatEntity`] composes the state blocks every combatant
//! carries (health, defense, death state) with a role block holding
//! what only one side has: the player's three weapon machines, or an
//! enemy's attack machine and AI state.

use serde::{Deserialize, Serialize};

use ashfall_common::{EntityId, Millis, Rect};

use crate::ai::AiState;
use crate::attack::{
    EnemyAttackState, MeleeAttackState, RangedAttackState, ShieldState, UltimateState,
};
use crate::config::CombatConfig;
use crate::defense::DefenseState;

/// Enemy archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Melee skeleton warrior
    Sceleton,
    /// Arrow-shooting ninja
    Ninja,
    /// Wizard with death bullets and a thunder ultimate
    Wizard,
    /// Heavy melee dark knight
    DarkKnight,
}

impl EnemyKind {
    /// All archetypes, in stat-table order.
    pub const ALL: [Self; 4] = [Self::Sceleton, Self::Ninja, Self::Wizard, Self::DarkKnight];

    /// Stable lowercase name, as used in config keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sceleton => "sceleton",
            Self::Ninja => "ninja",
            Self::Wizard => "wizard",
            Self::DarkKnight => "dark_knight",
        }
    }
}

/// Which side of the fight an entity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    /// The player
    Player,
    /// An enemy of the given archetype
    Enemy(EnemyKind),
}

impl EntityClass {
    /// Whether this is the player.
    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Player)
    }

    /// Whether this is an enemy.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::Enemy(_))
    }
}

/// Animation-facing status of an entity.
///
/// The animation layer polls this to select sprite sheets; the core
/// owns the combat-driven transitions (attack, stun, dead) while the
/// movement layer sets the locomotion ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Standing still
    Idle,
    /// Walking or chasing
    Run,
    /// Airborne, moving up
    Jump,
    /// Airborne, moving down
    Fall,
    /// Mid melee swing
    Attack,
    /// Drawing the bow
    Arch,
    /// Shield raised
    Shield,
    /// Flinching from a hit
    Hit,
    /// Stunned by a shield block
    Stun,
    /// Dead, awaiting despawn or game over
    Dead,
}

impl EntityStatus {
    /// Stable lowercase name for animation lookup.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Attack => "attack",
            Self::Arch => "arch",
            Self::Shield => "shield",
            Self::Hit => "hit",
            Self::Stun => "stun",
            Self::Dead => "dead",
        }
    }
}

/// Health pool.
///
/// Damage is applied raw; the pool may go negative on a lethal hit
/// and stays wherever the killing blow left it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub const fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Subtracts damage.
    pub fn damage(&mut self, amount: f32) {
        self.current -= amount;
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Remaining fraction, clamped to 0..1.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

/// Terminal state marker with time of death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeadState {
    dead: bool,
    time: Millis,
}

impl DeadState {
    /// Marks the entity dead. A second call is a no-op; the recorded
    /// time of death never changes.
    pub fn mark(&mut self, now: Millis) {
        if !self.dead {
            self.dead = true;
            self.time = now;
        }
    }

    /// Whether the entity is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Time of death, meaningless while alive.
    #[must_use]
    pub const fn time(&self) -> Millis {
        self.time
    }
}

/// Player experience pool with level-up rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    /// Experience accumulated toward the next level
    pub current: u32,
    /// Threshold for the next level-up
    pub max: u32,
}

impl Experience {
    /// Creates an empty pool with the given first threshold.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: 0, max }
    }

    /// Adds experience, rolling surplus over into level-ups.
    ///
    /// On each rollover the threshold grows by `growth`. Returns the
    /// number of levels gained.
    pub fn add(&mut self, amount: u32, growth: f32) -> u32 {
        self.current += amount;
        let mut levels = 0;
        while self.max > 0 && self.current >= self.max {
            self.current -= self.max;
            self.max = (self.max as f32 * growth) as u32;
            levels += 1;
        }
        levels
    }
}

/// The player's side of a [`CombatEntity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCombat {
    /// Sword swing machine
    pub sword: MeleeAttackState,
    /// Bow draw machine
    pub arch: RangedAttackState,
    /// Shield machine
    pub shield: ShieldState,
    /// Experience pool
    pub experience: Experience,
    /// Current level
    pub level: u32,
}

impl PlayerCombat {
    /// Builds the player block from config.
    #[must_use]
    pub fn new(config: &CombatConfig) -> Self {
        Self {
            sword: MeleeAttackState::from_config(&config.player.sword),
            arch: RangedAttackState::from_config(&config.player.arch),
            shield: ShieldState::new(config.player.shield_cooldown_ms),
            experience: Experience::new(config.player.experience_max),
            level: 1,
        }
    }

    /// Awards experience and applies any level-ups. Returns the
    /// number of levels gained.
    pub fn add_experience(&mut self, amount: u32, growth: f32) -> u32 {
        let levels = self.experience.add(amount, growth);
        self.level += levels;
        levels
    }
}

/// An enemy's side of a [`CombatEntity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyCombat {
    /// Archetype
    pub kind: EnemyKind,
    /// Attack machine
    pub attack: EnemyAttackState,
    /// AI state
    pub ai: AiState,
    /// Experience granted to the player on defeat, scaling applied
    pub experience_reward: u32,
    /// Ultimate cooldown, for archetypes that have one
    pub ultimate: Option<UltimateState>,
    /// Level rolled at spawn
    pub level: u32,
    /// Stat multiplier rolled at spawn
    pub multiplier: f32,
}

impl EnemyCombat {
    /// Returns the enemy to its non-combat state: engagement and
    /// attack flags cleared, attack re-armed.
    pub fn reset_combat(&mut self) {
        self.ai.on = false;
        self.ai.trigger = false;
        self.attack.reset();
    }
}

/// Role block: what only one side of the fight carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Role {
    /// Player weapons and progression
    Player(PlayerCombat),
    /// Enemy attack machine and AI
    Enemy(EnemyCombat),
}

/// One combatant: the player or a single enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEntity {
    id: EntityId,
    /// Collision rectangle, written by the movement layer each frame
    pub rect: Rect,
    /// Whether the entity faces right
    pub facing_right: bool,
    /// Horizontal movement intent, consumed by the movement layer
    pub direction_x: f32,
    /// Animation frame index; the core only ever zeroes it on
    /// transitions, and advances it for enemy attack swings
    pub anim_frame: f32,
    /// Animation-facing status
    pub status: EntityStatus,
    /// Health pool
    pub health: Health,
    /// Death marker
    pub dead: DeadState,
    /// Hurt gating and armor
    pub defense: DefenseState,
    /// Side-specific state
    pub role: Role,
}

impl CombatEntity {
    /// Creates the player at the given rectangle.
    #[must_use]
    pub fn player(config: &CombatConfig, rect: Rect) -> Self {
        Self {
            id: EntityId::new(),
            rect,
            facing_right: true,
            direction_x: 0.0,
            anim_frame: 0.0,
            status: EntityStatus::Idle,
            health: Health::new(config.player.max_health),
            dead: DeadState::default(),
            defense: DefenseState::new(config.player.immunity_ms),
            role: Role::Player(PlayerCombat::new(config)),
        }
    }

    /// Creates an enemy from an assembled role block.
    #[must_use]
    pub fn enemy(
        combat: EnemyCombat,
        rect: Rect,
        health: f32,
        immunity_ms: Millis,
        facing_right: bool,
    ) -> Self {
        Self {
            id: EntityId::new(),
            rect,
            facing_right,
            direction_x: 0.0,
            anim_frame: 0.0,
            status: EntityStatus::Run,
            health: Health::new(health),
            dead: DeadState::default(),
            defense: DefenseState::new(immunity_ms),
            role: Role::Enemy(combat),
        }
    }

    /// Unique id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Which side this entity fights on.
    #[must_use]
    pub fn class(&self) -> EntityClass {
        match &self.role {
            Role::Player(_) => EntityClass::Player,
            Role::Enemy(enemy) => EntityClass::Enemy(enemy.kind),
        }
    }

    /// Archetype, if this is an enemy.
    #[must_use]
    pub fn kind(&self) -> Option<EnemyKind> {
        match &self.role {
            Role::Player(_) => None,
            Role::Enemy(enemy) => Some(enemy.kind),
        }
    }

    /// Player block, if this is the player.
    #[must_use]
    pub fn player_state(&self) -> Option<&PlayerCombat> {
        match &self.role {
            Role::Player(player) => Some(player),
            Role::Enemy(_) => None,
        }
    }

    /// Mutable player block.
    pub fn player_state_mut(&mut self) -> Option<&mut PlayerCombat> {
        match &mut self.role {
            Role::Player(player) => Some(player),
            Role::Enemy(_) => None,
        }
    }

    /// Enemy block, if this is an enemy.
    #[must_use]
    pub fn enemy_state(&self) -> Option<&EnemyCombat> {
        match &self.role {
            Role::Player(_) => None,
            Role::Enemy(enemy) => Some(enemy),
        }
    }

    /// Mutable enemy block.
    pub fn enemy_state_mut(&mut self) -> Option<&mut EnemyCombat> {
        match &mut self.role {
            Role::Player(_) => None,
            Role::Enemy(enemy) => Some(enemy),
        }
    }

    /// Whether the entity is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead.is_dead()
    }

    /// Whether the entity is stunned.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        match &self.role {
            Role::Player(_) => false,
            Role::Enemy(enemy) => enemy.ai.stunned,
        }
    }

    /// Applies a hit that already passed the immunity gate.
    ///
    /// Opens the immunity window, subtracts `damage * armor_ratio`
    /// from health and kills the entity if the pool empties. Returns
    /// whether the hit was lethal.
    pub fn take_hit(&mut self, damage: f32, now: Millis) -> bool {
        self.defense.mark_hurt(now);
        self.health.damage(damage * self.defense.armor_ratio());
        if self.health.is_depleted() {
            self.kill(now);
            return true;
        }
        false
    }

    /// Kills the entity. Idempotent; a second call changes nothing.
    pub fn kill(&mut self, now: Millis) {
        if self.dead.is_dead() {
            return;
        }
        self.dead.mark(now);
        self.status = EntityStatus::Dead;
        self.anim_frame = 0.0;
        self.direction_x = 0.0;
    }

    /// Forces an enemy into the stunned state.
    ///
    /// No-op for the player or an already-stunned enemy.
    pub fn apply_stun(&mut self, now: Millis) {
        if let Role::Enemy(enemy) = &mut self.role {
            if !enemy.ai.stunned {
                enemy.ai.stunned = true;
                enemy.ai.stun_since = now;
                self.anim_frame = 0.0;
                self.direction_x = 0.0;
                self.status = EntityStatus::Stun;
                self.defense.stun_armor();
            }
        }
    }

    /// Ends a stun: restores armor, clears combat state and returns
    /// the enemy to `Run`.
    pub fn reset_stun(&mut self) {
        if let Role::Enemy(enemy) = &mut self.role {
            if enemy.ai.stunned {
                enemy.ai.stunned = false;
                enemy.reset_combat();
                self.status = EntityStatus::Run;
                self.defense.restore_armor();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sceleton_combat() -> EnemyCombat {
        let config = CombatConfig::default();
        let stats = config.enemy.stats(EnemyKind::Sceleton);
        EnemyCombat {
            kind: EnemyKind::Sceleton,
            attack: EnemyAttackState::from_stats(stats, stats.damage),
            ai: AiState::from_stats(stats, &config.enemy),
            experience_reward: stats.experience,
            ultimate: None,
            level: 1,
            multiplier: 0.0,
        }
    }

    fn sceleton() -> CombatEntity {
        CombatEntity::enemy(
            sceleton_combat(),
            Rect::from_topleft(100.0, 0.0, 45.0, 93.0),
            225.0,
            300,
            false,
        )
    }

    #[test]
    fn test_take_hit_subtracts_scaled_damage() {
        let mut enemy = sceleton();
        let lethal = enemy.take_hit(60.0, 1000);

        assert!(!lethal);
        assert_eq!(enemy.health.current(), 165.0);
        assert!(enemy.defense.just_hurt());
    }

    #[test]
    fn test_lethal_hit_kills() {
        let mut enemy = sceleton();
        let lethal = enemy.take_hit(300.0, 1000);

        assert!(lethal);
        assert!(enemy.is_dead());
        assert_eq!(enemy.status, EntityStatus::Dead);
        assert_eq!(enemy.dead.time(), 1000);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut enemy = sceleton();
        enemy.kill(500);
        let health_after = enemy.health.current();

        enemy.kill(900);
        assert_eq!(enemy.dead.time(), 500);
        assert_eq!(enemy.health.current(), health_after);
    }

    #[test]
    fn test_stun_and_reset() {
        let mut enemy = sceleton();
        enemy.direction_x = 1.5;

        enemy.apply_stun(1000);
        assert!(enemy.is_stunned());
        assert_eq!(enemy.status, EntityStatus::Stun);
        assert_eq!(enemy.direction_x, 0.0);
        assert!((enemy.defense.armor_ratio() - 1.0 / 3.0).abs() < 1e-6);

        enemy.reset_stun();
        assert!(!enemy.is_stunned());
        assert_eq!(enemy.status, EntityStatus::Run);
        assert_eq!(enemy.defense.armor_ratio(), 1.0);
        let attack = &enemy.enemy_state().expect("enemy").attack;
        assert!(attack.able());
        assert!(!attack.attacking());
    }

    #[test]
    fn test_stun_twice_does_not_stack_armor() {
        let mut enemy = sceleton();
        enemy.apply_stun(1000);
        enemy.apply_stun(1100);
        enemy.reset_stun();
        assert_eq!(enemy.defense.armor_ratio(), 1.0);
    }

    #[test]
    fn test_experience_rollover() {
        let mut experience = Experience::new(300);
        assert_eq!(experience.add(100, 1.5), 0);
        assert_eq!(experience.current, 100);

        // 100 + 250 = 350 crosses 300, surplus 50 carries over
        assert_eq!(experience.add(250, 1.5), 1);
        assert_eq!(experience.current, 50);
        assert_eq!(experience.max, 450);
    }

    #[test]
    fn test_experience_multi_level() {
        let mut experience = Experience::new(100);
        // 100 -> level (threshold 150), remaining 200 -> level again
        let levels = experience.add(300, 1.5);
        assert_eq!(levels, 2);
        assert_eq!(experience.current, 50);
        assert_eq!(experience.max, 225);
    }

    #[test]
    fn test_class_and_kind() {
        let config = CombatConfig::default();
        let player = CombatEntity::player(&config, Rect::default());
        assert!(player.class().is_player());
        assert_eq!(player.kind(), None);

        let enemy = sceleton();
        assert_eq!(enemy.class(), EntityClass::Enemy(EnemyKind::Sceleton));
        assert!(enemy.class().is_enemy());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(EntityStatus::Attack.as_str(), "attack");
        assert_eq!(EntityStatus::Stun.as_str(), "stun");
        assert_eq!(EntityStatus::Dead.as_str(), "dead");
    }
}
