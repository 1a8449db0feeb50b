//! The combat world: one player, the enemy roster and the per-frame
//! tick.
//!
//! [`CombatWorld`] owns every combat entity and drives one frame per
//! [`tick`](CombatWorld::tick) call: volumes advance, collisions
//! resolve, player weapon machines and enemy AI run, queued attacks
//! spawn, and corpses past their latency despawn. Movement and
//! animation live outside; they write entity rects in and poll
//! statuses out.

use ahash::AHashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ashfall_common::{Clock, EntityId, Millis, Rect};

use crate::ai;
use crate::attack::AttackOutcome;
use crate::config::CombatConfig;
use crate::entity::{CombatEntity, EnemyKind, EntityClass, EntityStatus};
use crate::events::{CombatEvent, EventBus};
use crate::fight::{AttackCommand, FightManager};
use crate::spawn::EnemySpawner;
use crate::volumes::ProjectileKind;

/// Source of the player's effective weapon damage.
///
/// Read once per tick, before any attack resolves. Equipment is
/// managed outside the combat core; this trait is the seam.
pub trait EquipmentSource {
    /// Effective sword damage, or `None` to keep the configured base.
    fn sword_damage(&self) -> Option<f32>;

    /// Effective bow damage, or `None` to keep the configured base.
    fn arch_damage(&self) -> Option<f32>;
}

/// Equipment source with nothing equipped; configured damage applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unequipped;

impl EquipmentSource for Unequipped {
    fn sword_damage(&self) -> Option<f32> {
        None
    }

    fn arch_damage(&self) -> Option<f32> {
        None
    }
}

/// A player input relevant to combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Start a sword swing
    SwingSword,
    /// Start drawing the bow
    DrawBow,
    /// Raise the shield
    RaiseShield,
}

/// Owns and ticks the whole combat simulation.
#[derive(Debug)]
pub struct CombatWorld {
    config: CombatConfig,
    player: CombatEntity,
    enemies: Vec<CombatEntity>,
    index: AHashMap<EntityId, usize>,
    fight: FightManager,
    events: EventBus,
    spawner: EnemySpawner,
    game_over: bool,
}

impl CombatWorld {
    /// Creates a world with the player at the given rectangle and no
    /// enemies.
    #[must_use]
    pub fn new(config: CombatConfig, player_rect: Rect) -> Self {
        let events = EventBus::default();
        let fight = FightManager::new(config.clone(), events.sender());
        let player = CombatEntity::player(&config, player_rect);
        Self {
            config,
            player,
            enemies: Vec::new(),
            index: AHashMap::new(),
            fight,
            events,
            spawner: EnemySpawner::new(),
            game_over: false,
        }
    }

    /// Replaces the spawner, for reproducible spawn rolls.
    #[must_use]
    pub fn with_spawner(mut self, spawner: EnemySpawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Spawns a level-scaled enemy and returns its id.
    pub fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        base_level: u32,
        position: Vec2,
        now: Millis,
    ) -> EntityId {
        let enemy = self
            .spawner
            .spawn(kind, base_level, &self.config, position, now);
        let id = enemy.id();
        let level = enemy.enemy_state().map_or(base_level, |state| state.level);
        info!(kind = kind.name(), level, "enemy spawned");

        self.index.insert(id, self.enemies.len());
        self.enemies.push(enemy);
        self.events
            .publish(CombatEvent::EnemySpawned { id, kind, level });
        id
    }

    /// Feeds one player input through the weapon gates.
    ///
    /// Weapons are mutually exclusive: a sword swing cannot start
    /// while drawing or shielding, and so on. A dead player and a
    /// finished game accept nothing.
    pub fn handle_command<C: Clock>(&mut self, command: PlayerCommand, clock: &C) -> AttackOutcome {
        if self.game_over || self.player.is_dead() {
            return AttackOutcome::Unavailable;
        }
        let now = clock.now_ms();

        let (outcome, status) = {
            let Some(state) = self.player.player_state_mut() else {
                return AttackOutcome::Unavailable;
            };
            match command {
                PlayerCommand::SwingSword => {
                    if state.arch.attacking() || state.shield.shielding() {
                        (AttackOutcome::Unavailable, None)
                    } else {
                        let outcome = state.sword.try_start(now);
                        (outcome, outcome.is_started().then_some(EntityStatus::Attack))
                    }
                },
                PlayerCommand::DrawBow => {
                    if state.sword.attacking() || state.shield.shielding() {
                        (AttackOutcome::Unavailable, None)
                    } else {
                        let outcome = state.arch.try_start(now);
                        (outcome, outcome.is_started().then_some(EntityStatus::Arch))
                    }
                },
                PlayerCommand::RaiseShield => {
                    if state.sword.attacking() || state.arch.attacking() {
                        (AttackOutcome::Unavailable, None)
                    } else {
                        let outcome = state.shield.raise(now);
                        (outcome, outcome.is_started().then_some(EntityStatus::Shield))
                    }
                },
            }
        };

        if let Some(status) = status {
            self.player.status = status;
            self.player.anim_frame = 0.0;
        }
        if outcome.is_started() && command == PlayerCommand::SwingSword {
            self.events.publish(CombatEvent::SwordSwung {
                attacker: self.player.id(),
            });
        }
        outcome
    }

    /// Advances the simulation one frame.
    pub fn tick<C: Clock, E: EquipmentSource>(&mut self, clock: &C, equipment: &E) {
        if self.game_over {
            return;
        }
        self.apply_equipment(equipment);

        self.fight.attack_update(clock.now_ms());
        self.fight
            .check_damage(&mut self.player, &mut self.enemies, clock);

        self.update_player(clock);
        self.update_enemies(clock);

        self.fight.process_attacks(clock.now_ms());

        self.despawn_expired(clock.now_ms());
        self.check_game_over(clock.now_ms());
    }

    /// The player entity.
    #[must_use]
    pub fn player(&self) -> &CombatEntity {
        &self.player
    }

    /// The player entity, mutable.
    pub fn player_mut(&mut self) -> &mut CombatEntity {
        &mut self.player
    }

    /// All enemies, dead ones included until they despawn.
    #[must_use]
    pub fn enemies(&self) -> &[CombatEntity] {
        &self.enemies
    }

    /// Looks an enemy up by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&CombatEntity> {
        self.index.get(&id).and_then(|&i| self.enemies.get(i))
    }

    /// Looks an enemy up by id, mutable.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut CombatEntity> {
        self.index.get(&id).and_then(|&i| self.enemies.get_mut(i))
    }

    /// Writes the player's rectangle in from the movement layer.
    pub fn sync_player_rect(&mut self, rect: Rect) {
        self.player.rect = rect;
    }

    /// Writes an enemy's rectangle in from the movement layer.
    /// Returns whether the id was known.
    pub fn sync_enemy_rect(&mut self, id: EntityId, rect: Rect) -> bool {
        match self.enemy_mut(id) {
            Some(enemy) => {
                enemy.rect = rect;
                true
            },
            None => false,
        }
    }

    /// The active tuning.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// The event bus; drain it once per frame.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The fight manager, for inspecting live volumes.
    #[must_use]
    pub fn fight(&self) -> &FightManager {
        &self.fight
    }

    /// Whether the player's death latency has elapsed.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    fn apply_equipment<E: EquipmentSource>(&mut self, equipment: &E) {
        if let Some(state) = self.player.player_state_mut() {
            state.sword.damage = equipment
                .sword_damage()
                .unwrap_or(self.config.player.sword.damage);
            state.arch.damage = equipment
                .arch_damage()
                .unwrap_or(self.config.player.arch.damage);
        }
    }

    fn update_player<C: Clock>(&mut self, clock: &C) {
        let now = clock.now_ms();
        self.player.defense.tick(now);
        if self.player.is_dead() {
            return;
        }

        let id = self.player.id();
        let attacker_rect = self.player.rect;
        let facing_right = self.player.facing_right;

        let mut sword_strike = None;
        let mut arrow_release = None;
        if let Some(state) = self.player.player_state_mut() {
            if state.sword.tick(now) {
                sword_strike = Some((state.sword.damage, state.sword.size, state.sword.space));
            }
            if state.arch.tick(now) {
                arrow_release = Some(state.arch.damage);
            }
            state.shield.tick(now);
        }

        if let Some((damage, size, space)) = sword_strike {
            self.fight.queue_attack(AttackCommand::Sword {
                source: EntityClass::Player,
                source_id: id,
                attacker_rect,
                facing_right,
                damage,
                size,
                space,
            });
        }
        if let Some(damage) = arrow_release {
            self.fight.queue_attack(AttackCommand::Bolt {
                kind: ProjectileKind::Arrow,
                source: EntityClass::Player,
                source_id: id,
                attacker_rect,
                facing_right,
                damage,
            });
        }

        self.refresh_player_status();
    }

    /// Keeps the combat-owned statuses in step with the weapon
    /// machines. Locomotion statuses are the movement layer's and are
    /// left alone.
    fn refresh_player_status(&mut self) {
        let current = self.player.status;
        let desired = match self.player.player_state() {
            Some(state) => {
                if state.sword.attacking() {
                    EntityStatus::Attack
                } else if state.arch.attacking() {
                    EntityStatus::Arch
                } else if state.shield.shielding() {
                    EntityStatus::Shield
                } else if matches!(
                    current,
                    EntityStatus::Attack | EntityStatus::Arch | EntityStatus::Shield
                ) {
                    EntityStatus::Idle
                } else {
                    current
                }
            },
            None => current,
        };
        self.player.status = desired;
    }

    fn update_enemies<C: Clock>(&mut self, clock: &C) {
        let now = clock.now_ms();
        let sim_distance = self.config.world.sim_distance;
        let player_x = self.player.rect.center_x();

        for enemy in &mut self.enemies {
            enemy.defense.tick(now);
            if (enemy.rect.center_x() - player_x).abs() > sim_distance {
                continue;
            }
            ai::drive(enemy, &self.player, &mut self.fight, clock);
        }
    }

    /// Removes corpses whose death latency has elapsed.
    fn despawn_expired(&mut self, now: Millis) {
        let latency = self.config.enemy.death_latency_ms;
        let mut i = 0;
        while i < self.enemies.len() {
            let enemy = &self.enemies[i];
            if !enemy.is_dead() || now.saturating_sub(enemy.dead.time()) <= latency {
                i += 1;
                continue;
            }
            let removed = self.enemies.swap_remove(i);
            self.index.remove(&removed.id());
            if let Some(moved) = self.enemies.get(i) {
                self.index.insert(moved.id(), i);
            }
            if let Some(kind) = removed.kind() {
                debug!(kind = kind.name(), "enemy despawned");
                self.events.publish(CombatEvent::EnemyDespawned {
                    id: removed.id(),
                    kind,
                    x: removed.rect.left(),
                    y: removed.rect.top(),
                });
            }
        }
    }

    fn check_game_over(&mut self, now: Millis) {
        if self.game_over || !self.player.is_dead() {
            return;
        }
        if now.saturating_sub(self.player.dead.time()) > self.config.player.death_latency_ms {
            self.game_over = true;
            info!("player death latency elapsed, game over");
            self.events.publish(CombatEvent::GameOver);
        }
    }
}
