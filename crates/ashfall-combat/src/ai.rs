//! Enemy combat AI.
//!
//! Each enemy runs the same per-frame decision function against the
//! single player: notice the player inside `trigger_range`, chase,
//! engage inside `attack_range`, wind up, attack, and disengage when
//! the player escapes. Archetypes differ only in their stat tables
//! and in what [`advance_attack`] dispatches on the finish edge.
//!
//! A stunned enemy is frozen: [`drive`] runs only the stun timer
//! until it elapses, then normal evaluation resumes.

use serde::{Deserialize, Serialize};

use ashfall_common::{Clock, Millis};

use crate::attack::AttackProgress;
use crate::config::{ArchetypeStats, EnemyConfig};
use crate::entity::{CombatEntity, EnemyKind, EntityStatus, Role};
use crate::fight::{AttackCommand, FightManager};
use crate::volumes::ProjectileKind;

/// Per-enemy AI state.
///
/// Fields are deliberately public; the driver functions in this
/// module and the stun interrupt in `entity` both write them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    /// Distance at which the enemy notices the player
    pub trigger_range: f32,
    /// Engaged: stationary, windup timer running
    pub on: bool,
    /// Triggered: chasing the player
    pub trigger: bool,
    /// When the engagement began, for the windup delay
    pub start: Millis,
    /// Windup between engaging and the first attack
    pub preparing_ms: Millis,
    /// Whether the enemy is stunned
    pub stunned: bool,
    /// When the stun began
    pub stun_since: Millis,
    /// How long a stun lasts
    pub stun_duration_ms: Millis,
    /// Chase speed, in pixels per tick
    pub walk_speed: f32,
}

impl AiState {
    /// Builds AI state from an archetype's stats and the shared enemy
    /// tuning.
    #[must_use]
    pub fn from_stats(stats: &ArchetypeStats, shared: &EnemyConfig) -> Self {
        Self {
            trigger_range: stats.trigger_range,
            on: false,
            trigger: false,
            start: 0,
            preparing_ms: shared.preparing_ms,
            stunned: false,
            stun_since: 0,
            stun_duration_ms: shared.stun_duration_ms,
            walk_speed: stats.walk_speed,
        }
    }
}

/// Runs one frame of AI for one enemy.
///
/// Dead enemies are skipped. Stunned enemies only run their stun
/// timer; once it elapses the enemy resumes evaluation on the same
/// frame.
pub fn drive<C: Clock>(
    enemy: &mut CombatEntity,
    player: &CombatEntity,
    fight: &mut FightManager,
    clock: &C,
) {
    if enemy.is_dead() {
        return;
    }
    check_stun(enemy, clock);
    if enemy.is_stunned() {
        return;
    }
    advance_attack(enemy, fight);
    check_for_combat(enemy, player, fight, clock);
}

/// Ends a stun once its timer elapses.
pub fn check_stun<C: Clock>(enemy: &mut CombatEntity, clock: &C) {
    let (stunned, since, duration) = match enemy.enemy_state() {
        Some(state) => (
            state.ai.stunned,
            state.ai.stun_since,
            state.ai.stun_duration_ms,
        ),
        None => return,
    };
    if stunned && clock.now_ms().saturating_sub(since) > duration {
        enemy.reset_stun();
    }
}

/// The per-frame combat decision function.
///
/// Engagement and chase compare the horizontal distance between
/// centers against `attack_range` and `trigger_range`; both also
/// require the vertical distance under the enemy's own height, so a
/// player on another floor is ignored. Disengage is horizontal only,
/// and `attack_range` is strictly smaller than `trigger_range`.
pub fn check_for_combat<C: Clock>(
    enemy: &mut CombatEntity,
    player: &CombatEntity,
    fight: &mut FightManager,
    clock: &C,
) {
    if enemy.is_dead() {
        return;
    }
    let dx = (player.rect.center_x() - enemy.rect.center_x()).abs();
    let dy = (player.rect.center_y() - enemy.rect.center_y()).abs();
    let same_floor = dy < enemy.rect.height();
    let player_dead = player.is_dead();
    let faces_right = enemy.rect.center_x() < player.rect.center_x();

    let (on, start, preparing_ms, trigger_range, attack_range, attacking, walk_speed) = {
        let Role::Enemy(state) = &enemy.role else {
            return;
        };
        (
            state.ai.on,
            state.ai.start,
            state.ai.preparing_ms,
            state.ai.trigger_range,
            state.attack.range,
            state.attack.attacking(),
            state.ai.walk_speed,
        )
    };
    let close = dx < trigger_range && same_floor;
    let close_to_attack = dx < attack_range && same_floor;

    if close_to_attack && !on && !player_dead {
        // Engage: stop and start the windup timer
        if let Role::Enemy(state) = &mut enemy.role {
            state.ai.on = true;
            state.ai.start = clock.now_ms();
            state.ai.trigger = false;
        }
        enemy.facing_right = faces_right;
        enemy.direction_x = 0.0;
        enemy.status = EntityStatus::Idle;
    } else if close && !close_to_attack && !attacking && !player_dead {
        // Chase: walk toward the player
        if let Role::Enemy(state) = &mut enemy.role {
            state.ai.trigger = true;
        }
        enemy.facing_right = faces_right;
        enemy.direction_x = if faces_right { walk_speed } else { -walk_speed };
        enemy.status = EntityStatus::Run;
    } else if let Role::Enemy(state) = &mut enemy.role {
        state.ai.trigger = false;
    }

    if dx > trigger_range && on && !attacking {
        combat_reset(enemy);
    }

    if on && !attacking && close_to_attack && clock.now_ms().saturating_sub(start) > preparing_ms {
        if let Role::Enemy(state) = &mut enemy.role {
            state.attack.arm();
        }
        do_attack(enemy, player, fight, clock);
    }
}

/// Starts an attack swing, and for archetypes with a ready ultimate,
/// also queues it.
///
/// The ultimate fires in addition to the normal attack, never instead
/// of it.
pub fn do_attack<C: Clock>(
    enemy: &mut CombatEntity,
    player: &CombatEntity,
    fight: &mut FightManager,
    clock: &C,
) {
    enemy.status = EntityStatus::Attack;
    enemy.anim_frame = 0.0;
    enemy.direction_x = 0.0;

    let class = enemy.class();
    let id = enemy.id();
    let mut ultimate_damage = None;
    if let Role::Enemy(state) = &mut enemy.role {
        state.attack.begin();
        if let Some(ultimate) = state.ultimate.as_mut() {
            let now = clock.now_ms();
            if ultimate.ready(now) {
                ultimate.cast(now);
                ultimate_damage = Some(state.attack.damage);
            }
        }
    }
    if let Some(damage) = ultimate_damage {
        fight.queue_attack(AttackCommand::Thunder {
            source: class,
            source_id: id,
            target: player.rect,
            damage,
        });
    }
}

/// Advances a running attack animation and dispatches the hit on its
/// finish edge.
///
/// Melee archetypes spawn a sword volume, the ninja an arrow, the
/// wizard a death bullet. When the animation runs past its last frame
/// the enemy returns to `Run` via [`reset_attack`]. The machine is
/// frame-driven, so no clock is involved.
pub fn advance_attack(enemy: &mut CombatEntity, fight: &mut FightManager) {
    if enemy.is_dead() || enemy.is_stunned() || enemy.status != EntityStatus::Attack {
        return;
    }
    let class = enemy.class();
    let id = enemy.id();
    let attacker_rect = enemy.rect;
    let facing_right = enemy.facing_right;
    let Some(kind) = enemy.kind() else {
        return;
    };

    let (progress, finished, damage, size, space) = {
        let Role::Enemy(state) = &mut enemy.role else {
            return;
        };
        if !state.attack.attacking() {
            return;
        }
        let progress = state.attack.advance(&mut enemy.anim_frame);
        let finished = state.attack.take_finish();
        (
            progress,
            finished,
            state.attack.damage,
            state.attack.size,
            state.attack.space,
        )
    };

    if finished {
        match kind {
            EnemyKind::Sceleton | EnemyKind::DarkKnight => {
                if let Some(size) = size {
                    fight.queue_attack(AttackCommand::Sword {
                        source: class,
                        source_id: id,
                        attacker_rect,
                        facing_right,
                        damage,
                        size,
                        space,
                    });
                }
            },
            EnemyKind::Ninja => {
                fight.queue_attack(AttackCommand::Bolt {
                    kind: ProjectileKind::Arrow,
                    source: class,
                    source_id: id,
                    attacker_rect,
                    facing_right,
                    damage,
                });
            },
            EnemyKind::Wizard => {
                fight.queue_attack(AttackCommand::Bolt {
                    kind: ProjectileKind::DeathBullet,
                    source: class,
                    source_id: id,
                    attacker_rect,
                    facing_right,
                    damage,
                });
            },
        }
    }

    if progress == AttackProgress::Completed {
        reset_attack(enemy);
    }
}

/// Clears engagement and attack state, returning the enemy to `Run`.
pub fn combat_reset(enemy: &mut CombatEntity) {
    if let Role::Enemy(state) = &mut enemy.role {
        state.reset_combat();
    }
    enemy.status = EntityStatus::Run;
}

/// [`combat_reset`] plus an animation frame reset, called when the
/// attack animation completes.
pub fn reset_attack(enemy: &mut CombatEntity) {
    combat_reset(enemy);
    enemy.anim_frame = 0.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::{EnemyAttackState, UltimateState};
    use crate::config::CombatConfig;
    use crate::entity::EnemyCombat;
    use crate::events::EventBus;
    use ashfall_common::{ManualClock, Rect};

    fn fixture(kind: EnemyKind, x: f32) -> (CombatEntity, CombatEntity, FightManager, EventBus) {
        let config = CombatConfig::default();
        let player = CombatEntity::player(&config, Rect::from_topleft(100.0, 0.0, 45.0, 93.0));
        let stats = config.enemy.stats(kind);
        let combat = EnemyCombat {
            kind,
            attack: EnemyAttackState::from_stats(stats, stats.damage),
            ai: AiState::from_stats(stats, &config.enemy),
            experience_reward: stats.experience,
            ultimate: None,
            level: 1,
            multiplier: 0.0,
        };
        let enemy = CombatEntity::enemy(
            combat,
            Rect::from_topleft(x, 0.0, stats.body_size.x, stats.body_size.y),
            stats.health,
            config.enemy.immunity_ms,
            false,
        );
        let bus = EventBus::default();
        let manager = FightManager::new(config, bus.sender());
        (player, enemy, manager, bus)
    }

    fn ai(enemy: &CombatEntity) -> &AiState {
        &enemy.enemy_state().expect("enemy").ai
    }

    #[test]
    fn test_from_stats() {
        let config = CombatConfig::default();
        let state = AiState::from_stats(&config.enemy.sceleton, &config.enemy);

        assert_eq!(state.trigger_range, 450.0);
        assert_eq!(state.preparing_ms, 400);
        assert_eq!(state.stun_duration_ms, 1300);
        assert!(!state.on);
        assert!(!state.trigger);
    }

    #[test]
    fn test_engage_within_attack_range() {
        // Player center 122.5, sceleton center 172.5: dx = 50 < 90
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);
        enemy.direction_x = 1.5;

        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(ai(&enemy).on);
        assert_eq!(ai(&enemy).start, 1000);
        assert!(!ai(&enemy).trigger);
        assert_eq!(enemy.status, EntityStatus::Idle);
        assert_eq!(enemy.direction_x, 0.0);
        // Enemy is to the player's right, so it faces left
        assert!(!enemy.facing_right);
    }

    #[test]
    fn test_chase_within_trigger_range() {
        // dx = 250: outside attack range 90, inside trigger range 450
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 350.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(ai(&enemy).trigger);
        assert!(!ai(&enemy).on);
        assert_eq!(enemy.status, EntityStatus::Run);
        assert_eq!(enemy.direction_x, -1.5);
        assert!(!enemy.facing_right);
    }

    #[test]
    fn test_no_engage_across_floors() {
        // dx = 50 < 90, but the player stands a floor below:
        // dy = 600 > height 93
        let (mut player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        player.rect = Rect::from_topleft(100.0, 600.0, 45.0, 93.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(!ai(&enemy).on);
        assert!(!ai(&enemy).trigger);
        assert_eq!(enemy.status, EntityStatus::Run);
        assert_eq!(enemy.direction_x, 0.0);
    }

    #[test]
    fn test_no_chase_across_floors() {
        // dx = 250 is inside the trigger range, dy = 600 is not
        let (mut player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 350.0);
        player.rect = Rect::from_topleft(100.0, 600.0, 45.0, 93.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(!ai(&enemy).trigger);
        assert_eq!(enemy.status, EntityStatus::Run);
        assert_eq!(enemy.direction_x, 0.0);
    }

    #[test]
    fn test_out_of_range_clears_trigger() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 350.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(ai(&enemy).trigger);

        // Move the enemy outside the trigger range
        enemy.rect = Rect::from_topleft(700.0, 0.0, 45.0, 93.0);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(!ai(&enemy).trigger);
    }

    #[test]
    fn test_disengage_past_trigger_range() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(ai(&enemy).on);

        enemy.rect = Rect::from_topleft(700.0, 0.0, 45.0, 93.0);
        clock.advance(100);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(!ai(&enemy).on);
        assert_eq!(enemy.status, EntityStatus::Run);
        assert!(enemy.enemy_state().expect("enemy").attack.able());
    }

    #[test]
    fn test_windup_gates_first_attack() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(ai(&enemy).on);

        // Exactly the windup delay is not enough
        clock.set(1400);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert_ne!(enemy.status, EntityStatus::Attack);

        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert_eq!(enemy.status, EntityStatus::Attack);
        assert!(enemy.enemy_state().expect("enemy").attack.attacking());
        assert_eq!(enemy.anim_frame, 0.0);
    }

    #[test]
    fn test_attack_requires_staying_in_range() {
        let (mut player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(ai(&enemy).on);

        // Player steps out of attack range before the windup elapses
        player.rect = Rect::from_topleft(300.0, 0.0, 45.0, 93.0);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert_ne!(enemy.status, EntityStatus::Attack);
        assert!(!enemy.enemy_state().expect("enemy").attack.attacking());
        // The enemy falls back to chasing
        assert!(ai(&enemy).trigger);
        assert_eq!(enemy.direction_x, 1.5);
    }

    #[test]
    fn test_attack_requires_same_floor() {
        let (mut player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert!(ai(&enemy).on);

        // Player drops a floor before the windup elapses; dx is still 50
        player.rect = Rect::from_topleft(100.0, 600.0, 45.0, 93.0);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert_ne!(enemy.status, EntityStatus::Attack);
        assert!(!enemy.enemy_state().expect("enemy").attack.attacking());
        // Still engaged, the player never left the trigger range
        assert!(ai(&enemy).on);
    }

    #[test]
    fn test_dead_player_is_not_engaged() {
        let (mut player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);
        player.kill(900);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert!(!ai(&enemy).on);
        assert!(!ai(&enemy).trigger);
    }

    fn attack_until_finish(enemy: &mut CombatEntity, fight: &mut FightManager, ticks: usize) {
        for _ in 0..ticks {
            advance_attack(enemy, fight);
        }
    }

    #[test]
    fn test_finish_edge_dispatches_sword() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert_eq!(enemy.status, EntityStatus::Attack);

        // Speed 0.25 over 8 frames: the finish edge trips on tick 29
        attack_until_finish(&mut enemy, &mut fight, 28);
        assert_eq!(fight.queued_attacks(), 0);

        advance_attack(&mut enemy, &mut fight);
        assert_eq!(fight.queued_attacks(), 1);

        fight.process_attacks(clock.now_ms());
        assert_eq!(fight.volumes().hits().len(), 1);
        // The sceleton faces left, so the volume lands to its left
        assert!(fight.volumes().hits()[0].rect.right() < enemy.rect.center_x());
    }

    #[test]
    fn test_completion_resets_to_run() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        // Frame reaches 8.0 on tick 32 and the machine resets
        attack_until_finish(&mut enemy, &mut fight, 32);

        assert_eq!(enemy.status, EntityStatus::Run);
        assert_eq!(enemy.anim_frame, 0.0);
        assert!(!ai(&enemy).on);
        let attack = &enemy.enemy_state().expect("enemy").attack;
        assert!(attack.able());
        assert!(!attack.attacking());
    }

    #[test]
    fn test_ninja_fires_arrow() {
        // dx = 200: inside the ninja's 450 attack range
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Ninja, 300.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        assert_eq!(enemy.status, EntityStatus::Attack);

        // Speed 0.15 over 8 frames: finish edge on tick 47
        attack_until_finish(&mut enemy, &mut fight, 47);
        assert_eq!(fight.queued_attacks(), 1);

        fight.process_attacks(clock.now_ms());
        let projectiles = fight.volumes().projectiles();
        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].kind, ProjectileKind::Arrow);
        assert!(projectiles[0].velocity.x < 0.0);
    }

    #[test]
    fn test_wizard_fires_death_bullet() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Wizard, 300.0);
        let clock = ManualClock::at(1000);

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        attack_until_finish(&mut enemy, &mut fight, 29);
        fight.process_attacks(clock.now_ms());
        let projectiles = fight.volumes().projectiles();
        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].kind, ProjectileKind::DeathBullet);
    }

    #[test]
    fn test_wizard_thunder_waits_for_its_own_cooldown() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Wizard, 300.0);
        let clock = ManualClock::at(1000);
        if let Some(state) = enemy.enemy_state_mut() {
            state.ultimate = Some(UltimateState::new(3000, 1000));
        }

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(1401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        // Normal attack started, but the ultimate is still cooling
        assert_eq!(enemy.status, EntityStatus::Attack);
        assert_eq!(fight.queued_attacks(), 0);
    }

    #[test]
    fn test_wizard_thunder_fires_alongside_attack() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Wizard, 300.0);
        let clock = ManualClock::at(5000);
        if let Some(state) = enemy.enemy_state_mut() {
            state.ultimate = Some(UltimateState::new(3000, 0));
        }

        check_for_combat(&mut enemy, &player, &mut fight, &clock);
        clock.set(5401);
        check_for_combat(&mut enemy, &player, &mut fight, &clock);

        assert_eq!(enemy.status, EntityStatus::Attack);
        assert_eq!(fight.queued_attacks(), 1);

        fight.process_attacks(clock.now_ms());
        let areas = fight.volumes().areas();
        assert_eq!(areas.len(), 1);
        // Wizard base damage 200 scaled by the thunder multiplier
        assert_eq!(areas[0].damage, 300.0);
        // Centered over where the player stood at cast time
        assert_eq!(areas[0].rect().center_x(), player.rect.center_x());
    }

    #[test]
    fn test_drive_frozen_while_stunned() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(2000);
        enemy.apply_stun(1000);

        // Stun lasts 1300 ms; at 2000 the enemy is still frozen
        drive(&mut enemy, &player, &mut fight, &clock);
        assert!(enemy.is_stunned());
        assert!(!ai(&enemy).on);

        // Once the timer elapses the same frame resumes evaluation
        clock.set(2301);
        drive(&mut enemy, &player, &mut fight, &clock);
        assert!(!enemy.is_stunned());
        assert!(ai(&enemy).on);
        assert_eq!(enemy.status, EntityStatus::Idle);
    }

    #[test]
    fn test_drive_skips_dead() {
        let (player, mut enemy, mut fight, _bus) = fixture(EnemyKind::Sceleton, 150.0);
        let clock = ManualClock::at(1000);
        enemy.kill(900);

        drive(&mut enemy, &player, &mut fight, &clock);

        assert!(!ai(&enemy).on);
        assert_eq!(enemy.status, EntityStatus::Dead);
    }
}
