//! Fight manager: attack spawning, collision search and damage
//! resolution.
//!
//! Entities never apply damage directly. Their attack machines emit
//! [`AttackCommand`]s into the manager's queue; the manager turns
//! commands into transient volumes, advances them, and once per frame
//! runs the collision and resolution protocol in fixed category
//! order: all sword hits, then all bullets, then thunder.

use std::collections::VecDeque;

use crossbeam_channel::Sender;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ashfall_common::{Clock, EntityId, Millis, Rect};

use crate::config::CombatConfig;
use crate::entity::{CombatEntity, EntityClass};
use crate::events::CombatEvent;
use crate::volumes::{AreaEffect, HitVolume, Projectile, ProjectileKind, VolumeRegistry};

/// A request to spawn an attack volume, emitted at an attack
/// machine's edge and consumed by the fight manager.
///
/// Commands carry a snapshot of the attacker's rectangle and facing
/// at the instant the edge fired, so the volume lands where the
/// attacker was when the blow connected, not where the attack began.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttackCommand {
    /// Spawn a melee hit volume beside the attacker
    Sword {
        /// Which side swung
        source: EntityClass,
        /// Attacker id
        source_id: EntityId,
        /// Attacker rectangle at the hit instant
        attacker_rect: Rect,
        /// Attacker facing at the hit instant
        facing_right: bool,
        /// Damage per struck target
        damage: f32,
        /// Hit volume size
        size: Vec2,
        /// Horizontal gap between attacker and volume
        space: f32,
    },
    /// Spawn a projectile at the attacker's firing point
    Bolt {
        /// Arrow or death bullet
        kind: ProjectileKind,
        /// Which side fired
        source: EntityClass,
        /// Attacker id
        source_id: EntityId,
        /// Attacker rectangle at release
        attacker_rect: Rect,
        /// Attacker facing at release
        facing_right: bool,
        /// Damage on hit
        damage: f32,
    },
    /// Summon a thunder column over a target
    Thunder {
        /// Which side cast
        source: EntityClass,
        /// Caster id
        source_id: EntityId,
        /// Target rectangle the column centers on
        target: Rect,
        /// Caster's base damage; the thunder multiplier applies at
        /// spawn
        damage: f32,
    },
}

/// Which entity a pending collision damages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Player,
    Enemy(usize),
}

/// One collision recorded during search, resolved in the apply phase.
#[derive(Debug, Clone, Copy)]
struct PendingHit {
    target: Target,
    damage: f32,
    source: EntityClass,
}

/// Orchestrates attack volumes and damage resolution.
#[derive(Debug)]
pub struct FightManager {
    config: CombatConfig,
    volumes: VolumeRegistry,
    queue: VecDeque<AttackCommand>,
    events: Sender<CombatEvent>,
}

impl FightManager {
    /// Creates a manager publishing events through the given sender.
    #[must_use]
    pub fn new(config: CombatConfig, events: Sender<CombatEvent>) -> Self {
        Self {
            config,
            volumes: VolumeRegistry::new(),
            queue: VecDeque::new(),
            events,
        }
    }

    /// Queues an attack for spawning on the next
    /// [`process_attacks`](Self::process_attacks) call.
    pub fn queue_attack(&mut self, command: AttackCommand) {
        self.queue.push_back(command);
    }

    /// Number of queued, not yet spawned attacks.
    #[must_use]
    pub fn queued_attacks(&self) -> usize {
        self.queue.len()
    }

    /// Live attack volumes.
    #[must_use]
    pub fn volumes(&self) -> &VolumeRegistry {
        &self.volumes
    }

    /// Drains the queue, spawning a volume per command.
    pub fn process_attacks(&mut self, now: Millis) {
        while let Some(command) = self.queue.pop_front() {
            match command {
                AttackCommand::Sword {
                    source,
                    source_id,
                    attacker_rect,
                    facing_right,
                    damage,
                    size,
                    space,
                } => {
                    let rect = Self::sword_rect(attacker_rect, facing_right, size, space);
                    debug!(?source, "sword hit volume at {:?}", rect.center());
                    self.volumes.push_hit(HitVolume::new(
                        source,
                        source_id,
                        damage,
                        rect,
                        now,
                        self.config.volumes.hit_lifetime_ms,
                    ));
                },
                AttackCommand::Bolt {
                    kind,
                    source,
                    source_id,
                    attacker_rect,
                    facing_right,
                    damage,
                } => {
                    let rect = self.bolt_rect(attacker_rect, facing_right);
                    let speed = match kind {
                        ProjectileKind::Arrow => self.config.volumes.arrow_speed,
                        ProjectileKind::DeathBullet => self.config.volumes.death_bullet_speed,
                    };
                    self.volumes.push_projectile(Projectile::new(
                        kind,
                        source,
                        source_id,
                        damage,
                        facing_right,
                        speed,
                        rect,
                        now,
                        self.config.volumes.projectile_lifetime_ms,
                    ));
                    self.emit(CombatEvent::ArrowFired {
                        attacker: source_id,
                        kind,
                    });
                },
                AttackCommand::Thunder {
                    source,
                    source_id,
                    target,
                    damage,
                } => {
                    let thunder = &self.config.volumes.thunder;
                    self.volumes.push_area(AreaEffect::new(
                        source,
                        source_id,
                        damage * thunder.damage_multiplier,
                        target,
                        thunder.initial_width,
                        thunder.min_width,
                        thunder.shrink_per_tick,
                        thunder.height,
                        thunder.active_ms,
                        now,
                    ));
                    self.emit(CombatEvent::ThunderSummoned { caster: source_id });
                },
            }
        }
    }

    /// Advances all live volumes and sweeps out expired ones.
    pub fn attack_update(&mut self, now: Millis) {
        self.volumes.tick(now);
    }

    /// Runs the full collision and resolution protocol for one frame.
    ///
    /// Categories resolve in fixed order: sword, then bullet, then
    /// thunder. Later categories can hit entities already hurt this
    /// frame only if the shared immunity window has not opened.
    pub fn check_damage<C: Clock>(
        &mut self,
        player: &mut CombatEntity,
        enemies: &mut [CombatEntity],
        clock: &C,
    ) {
        let pending = self.search_swords(player, enemies, clock);
        self.apply(pending, player, enemies, clock);

        let pending = self.search_bullets(player, enemies);
        self.apply(pending, player, enemies, clock);
        self.volumes.sweep_spent();

        let pending = self.search_thunder(player, enemies);
        self.apply(pending, player, enemies, clock);
    }

    // ========================================================================
    // Spawn geometry
    // ========================================================================

    /// Places a sword volume beside the attacker, foot-aligned.
    fn sword_rect(attacker: Rect, facing_right: bool, size: Vec2, space: f32) -> Rect {
        let y = attacker.bottom() - size.y;
        let x = if facing_right {
            attacker.center_x() + space
        } else {
            attacker.center_x() - size.x - space
        };
        Rect::from_topleft(x, y, size.x, size.y)
    }

    /// Places a projectile at the attacker's firing point, a third of
    /// the way down the body.
    fn bolt_rect(&self, attacker: Rect, facing_right: bool) -> Rect {
        let extent = self.config.volumes.projectile_extent;
        let y = attacker.top() + attacker.height() / 3.0;
        let x = if facing_right {
            attacker.right()
        } else {
            attacker.left() + 20.0
        };
        Rect::from_topleft(x, y, extent, extent)
    }

    // ========================================================================
    // Collision search, one pass per category
    // ========================================================================

    fn search_swords<C: Clock>(
        &mut self,
        player: &mut CombatEntity,
        enemies: &mut [CombatEntity],
        clock: &C,
    ) -> Vec<PendingHit> {
        let mut pending = Vec::new();
        let shielding = player_shielding(player);

        for hit in self.volumes.hits_mut() {
            if hit.source.is_player() {
                for (index, enemy) in enemies.iter().enumerate() {
                    if !enemy.is_dead() && hit.rect.overlaps(&enemy.rect) {
                        pending.push(PendingHit {
                            target: Target::Enemy(index),
                            damage: hit.damage,
                            source: hit.source,
                        });
                    }
                }
            } else if !player.is_dead() && !hit.shielded && hit.rect.overlaps(&player.rect) {
                let deflected = match enemies.iter().position(|e| e.id() == hit.source_id) {
                    Some(index) => {
                        if shielding && facing_covers(player, &enemies[index]) {
                            hit.shielded = true;
                            let stuns = !enemies[index].is_stunned();
                            if stuns {
                                enemies[index].apply_stun(clock.now_ms());
                            }
                            let _ = self.events.try_send(CombatEvent::ShieldBlocked {
                                attacker: enemies[index].id(),
                                stunned: stuns,
                            });
                            true
                        } else {
                            false
                        }
                    },
                    // Attacker already despawned: no deflection, the
                    // hit lands unblocked
                    None => false,
                };
                if !deflected {
                    pending.push(PendingHit {
                        target: Target::Player,
                        damage: hit.damage,
                        source: hit.source,
                    });
                }
            }
        }
        pending
    }

    fn search_bullets(
        &mut self,
        player: &mut CombatEntity,
        enemies: &mut [CombatEntity],
    ) -> Vec<PendingHit> {
        let mut pending = Vec::new();
        let shielding = player_shielding(player);

        for projectile in self.volumes.projectiles_mut() {
            let mut struck = false;

            if projectile.source.is_player() {
                for (index, enemy) in enemies.iter().enumerate() {
                    if !enemy.is_dead()
                        && !projectile.has_hit(enemy.id())
                        && projectile.rect.overlaps(&enemy.rect)
                    {
                        pending.push(PendingHit {
                            target: Target::Enemy(index),
                            damage: projectile.damage,
                            source: projectile.source,
                        });
                        projectile.record_hit(enemy.id());
                        struck = true;
                    }
                }
            } else if !player.is_dead()
                && !projectile.shielded
                && projectile.rect.overlaps(&player.rect)
            {
                let deflected = match enemies.iter().position(|e| e.id() == projectile.source_id) {
                    Some(index) => {
                        if shielding && facing_covers(player, &enemies[index]) {
                            projectile.shielded = true;
                            let _ = self.events.try_send(CombatEvent::ShieldBlocked {
                                attacker: enemies[index].id(),
                                stunned: false,
                            });
                            true
                        } else {
                            false
                        }
                    },
                    None => false,
                };
                if !deflected && !projectile.has_hit(player.id()) {
                    pending.push(PendingHit {
                        target: Target::Player,
                        damage: projectile.damage,
                        source: projectile.source,
                    });
                    projectile.record_hit(player.id());
                }
                // A bullet that reached the player is gone either
                // way, deflected or not
                struck = true;
            }

            if struck {
                projectile.mark_spent();
            }
        }
        pending
    }

    fn search_thunder(
        &mut self,
        player: &mut CombatEntity,
        enemies: &mut [CombatEntity],
    ) -> Vec<PendingHit> {
        let mut pending = Vec::new();

        for area in self.volumes.areas_mut() {
            // A charging column deals no damage
            if !area.is_active() {
                continue;
            }
            let rect = area.rect();

            if area.source.is_player() {
                for (index, enemy) in enemies.iter().enumerate() {
                    if !enemy.is_dead() && !area.has_hit(enemy.id()) && rect.overlaps(&enemy.rect) {
                        pending.push(PendingHit {
                            target: Target::Enemy(index),
                            damage: area.damage,
                            source: area.source,
                        });
                        area.record_hit(enemy.id());
                    }
                }
            } else if !player.is_dead()
                && !area.has_hit(player.id())
                && rect.overlaps(&player.rect)
            {
                // Thunder strikes from above; the shield does not
                // apply
                pending.push(PendingHit {
                    target: Target::Player,
                    damage: area.damage,
                    source: area.source,
                });
                area.record_hit(player.id());
            }
        }
        pending
    }

    // ========================================================================
    // Damage application
    // ========================================================================

    fn apply<C: Clock>(
        &mut self,
        pending: Vec<PendingHit>,
        player: &mut CombatEntity,
        enemies: &mut [CombatEntity],
        clock: &C,
    ) {
        for hit in pending {
            match hit.target {
                Target::Enemy(index) => {
                    let enemy = &mut enemies[index];
                    if !enemy.defense.can_be_hurt() || !hit.source.is_player() {
                        continue;
                    }
                    let applied = hit.damage * enemy.defense.armor_ratio();
                    let lethal = enemy.take_hit(hit.damage, clock.now_ms());
                    self.emit(CombatEvent::DamageDealt {
                        target: enemy.id(),
                        amount: applied,
                        lethal,
                    });
                    if lethal {
                        self.award_kill(player, enemy);
                    }
                },
                Target::Player => {
                    if !player.defense.can_be_hurt() || hit.source.is_player() {
                        continue;
                    }
                    let applied = hit.damage * player.defense.armor_ratio();
                    let now = clock.now_ms();
                    let lethal = player.take_hit(hit.damage, now);
                    self.emit(CombatEvent::DamageDealt {
                        target: player.id(),
                        amount: applied,
                        lethal,
                    });
                    if lethal {
                        self.emit(CombatEvent::PlayerDied { at: now });
                    }
                },
            }
        }
    }

    /// Grants the victim's experience to the player, exactly once per
    /// kill.
    fn award_kill(&mut self, player: &mut CombatEntity, victim: &CombatEntity) {
        let Some(enemy) = victim.enemy_state() else {
            return;
        };
        self.emit(CombatEvent::EnemyKilled {
            id: victim.id(),
            kind: enemy.kind,
        });
        if let Some(progress) = player.player_state_mut() {
            let levels = progress.add_experience(
                enemy.experience_reward,
                self.config.player.experience_growth,
            );
            self.emit(CombatEvent::ExperienceGained {
                amount: enemy.experience_reward,
                levels_gained: levels,
            });
        }
    }

    fn emit(&self, event: CombatEvent) {
        let _ = self.events.try_send(event);
    }
}

/// Whether the player's shield is currently raised.
fn player_shielding(player: &CombatEntity) -> bool {
    player
        .player_state()
        .is_some_and(|p| p.shield.shielding())
}

/// Whether the attacker stands on the side the player faces.
fn facing_covers(player: &CombatEntity, attacker: &CombatEntity) -> bool {
    (player.facing_right && attacker.rect.left() > player.rect.left())
        || (!player.facing_right && attacker.rect.left() < player.rect.left())
}
