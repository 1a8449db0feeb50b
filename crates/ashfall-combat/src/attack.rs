//! Attack state machines.
//!
//! This module provides:
//! - The player's sword swing with its mid-swing hit point
//! - The player's bow draw with release on completion
//! - The shield raise/recover cycle
//! - The frame-driven enemy attack with its finish edge
//!
//! All machines are polled with the current time in milliseconds and
//! report their edges as return values; spawning the resulting hit
//! volumes is the fight manager's job.

use serde::{Deserialize, Serialize};

use ashfall_common::Millis;
use glam::Vec2;

use crate::config::{ArchConfig, ArchetypeStats, SwordConfig};

/// Result of trying to start an attack or raise a shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// The attack started
    Started,
    /// A previous attack is still in progress
    InProgress,
    /// The cooldown window has not elapsed yet
    OnCooldown,
    /// The actor cannot use this weapon right now, because it is dead
    /// or another weapon is active
    Unavailable,
}

impl AttackOutcome {
    /// Whether the attempt started an attack.
    #[must_use]
    pub fn is_started(self) -> bool {
        self == Self::Started
    }
}

/// The player's sword swing.
///
/// A swing runs for `swing_ms`; the blade lands once at
/// `hit_fraction` of the way through. A fresh swing cannot start
/// until `cooldown_ms` has elapsed since the previous swing ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeAttackState {
    /// Damage per hit, with equipment bonuses folded in
    pub damage: f32,
    /// Total swing duration, in milliseconds
    pub swing_ms: Millis,
    /// Cooldown measured from the end of the previous swing
    pub cooldown_ms: Millis,
    /// Fraction of the swing at which the blade lands
    pub hit_fraction: f32,
    /// Size of the spawned hit volume
    pub size: Vec2,
    /// Horizontal gap between the attacker and the hit volume
    pub space: f32,
    attacking: bool,
    able: bool,
    hit: bool,
    started_at: Millis,
    last_end: Option<Millis>,
}

impl MeleeAttackState {
    /// Builds the machine from sword config.
    #[must_use]
    pub fn from_config(config: &SwordConfig) -> Self {
        Self {
            damage: config.damage,
            swing_ms: config.swing_ms,
            cooldown_ms: config.cooldown_ms,
            hit_fraction: config.hit_fraction,
            size: config.size,
            space: config.space,
            attacking: false,
            able: true,
            hit: false,
            started_at: 0,
            last_end: None,
        }
    }

    /// Whether a swing could start right now.
    #[must_use]
    pub fn can_start(&self, now: Millis) -> bool {
        self.able && self.off_cooldown(now)
    }

    /// Tries to start a swing.
    pub fn try_start(&mut self, now: Millis) -> AttackOutcome {
        if !self.able {
            return AttackOutcome::InProgress;
        }
        if !self.off_cooldown(now) {
            return AttackOutcome::OnCooldown;
        }
        self.started_at = now;
        self.attacking = true;
        self.able = false;
        AttackOutcome::Started
    }

    /// Polls the swing. Returns `true` exactly once per swing, at the
    /// moment the blade lands.
    pub fn tick(&mut self, now: Millis) -> bool {
        if !self.attacking {
            return false;
        }
        let elapsed = now.saturating_sub(self.started_at);
        let mut strike = false;
        if elapsed as f32 > self.hit_fraction * self.swing_ms as f32 {
            if !self.hit {
                self.hit = true;
                strike = true;
            }
            if elapsed > self.swing_ms {
                self.able = true;
                self.attacking = false;
                self.hit = false;
                self.last_end = Some(now);
            }
        }
        strike
    }

    /// Whether a swing is in progress.
    #[must_use]
    pub const fn attacking(&self) -> bool {
        self.attacking
    }

    /// Whether the machine is idle (no swing in progress).
    #[must_use]
    pub const fn able(&self) -> bool {
        self.able
    }

    fn off_cooldown(&self, now: Millis) -> bool {
        match self.last_end {
            None => true,
            Some(end) => now.saturating_sub(end) > self.cooldown_ms,
        }
    }
}

/// The player's bow draw.
///
/// The arrow releases when the draw completes; there is no mid-draw
/// edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedAttackState {
    /// Damage per arrow, with equipment bonuses folded in
    pub damage: f32,
    /// Draw duration, in milliseconds
    pub draw_ms: Millis,
    /// Cooldown measured from the end of the previous draw
    pub cooldown_ms: Millis,
    /// Nominal range of the shot
    pub range: f32,
    attacking: bool,
    able: bool,
    started_at: Millis,
    last_end: Option<Millis>,
}

impl RangedAttackState {
    /// Builds the machine from bow config.
    #[must_use]
    pub fn from_config(config: &ArchConfig) -> Self {
        Self {
            damage: config.damage,
            draw_ms: config.draw_ms,
            cooldown_ms: config.cooldown_ms,
            range: config.range,
            attacking: false,
            able: true,
            started_at: 0,
            last_end: None,
        }
    }

    /// Tries to start a draw.
    pub fn try_start(&mut self, now: Millis) -> AttackOutcome {
        if !self.able {
            return AttackOutcome::InProgress;
        }
        if !self.off_cooldown(now) {
            return AttackOutcome::OnCooldown;
        }
        self.started_at = now;
        self.attacking = true;
        self.able = false;
        AttackOutcome::Started
    }

    /// Polls the draw. Returns `true` once when the arrow releases.
    pub fn tick(&mut self, now: Millis) -> bool {
        if self.attacking && now.saturating_sub(self.started_at) > self.draw_ms {
            self.able = true;
            self.attacking = false;
            self.last_end = Some(now);
            return true;
        }
        false
    }

    /// Whether a draw is in progress.
    #[must_use]
    pub const fn attacking(&self) -> bool {
        self.attacking
    }

    /// Whether the machine is idle.
    #[must_use]
    pub const fn able(&self) -> bool {
        self.able
    }

    fn off_cooldown(&self, now: Millis) -> bool {
        match self.last_end {
            None => true,
            Some(end) => now.saturating_sub(end) > self.cooldown_ms,
        }
    }
}

/// The player's shield.
///
/// Raising the shield blocks until the cooldown elapses, then both
/// the shield drops and the machine becomes available again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldState {
    /// Cooldown measured from the raise, in milliseconds
    pub cooldown_ms: Millis,
    shielding: bool,
    able: bool,
    raised_at: Millis,
}

impl ShieldState {
    /// Creates a lowered, available shield.
    #[must_use]
    pub fn new(cooldown_ms: Millis) -> Self {
        Self {
            cooldown_ms,
            shielding: false,
            able: true,
            raised_at: 0,
        }
    }

    /// Tries to raise the shield.
    pub fn raise(&mut self, now: Millis) -> AttackOutcome {
        if !self.able {
            return AttackOutcome::OnCooldown;
        }
        self.shielding = true;
        self.able = false;
        self.raised_at = now;
        AttackOutcome::Started
    }

    /// Polls the shield, dropping it once the cooldown elapses.
    pub fn tick(&mut self, now: Millis) {
        if !self.able && now.saturating_sub(self.raised_at) > self.cooldown_ms {
            self.able = true;
            self.shielding = false;
        }
    }

    /// Whether the shield is currently raised.
    #[must_use]
    pub const fn shielding(&self) -> bool {
        self.shielding
    }

    /// Whether the shield can be raised.
    #[must_use]
    pub const fn able(&self) -> bool {
        self.able
    }
}

/// Result of advancing the enemy attack animation one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackProgress {
    /// The animation is still running
    Running,
    /// The animation ran past its last frame this tick
    Completed,
}

/// An enemy's attack, driven by animation frame progress rather than
/// wall time.
///
/// The machine raises its `finish` flag once the animation passes its
/// last frame while the attack is armed; the AI driver consumes the
/// flag with [`take_finish`](Self::take_finish) and spawns the actual
/// hit. Completion resets the machine but deliberately leaves
/// `finish` alone so a finish raised on the final tick still fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyAttackState {
    /// Damage per hit, level scaling folded in at spawn
    pub damage: f32,
    /// Engagement distance
    pub range: f32,
    /// Hit volume size for melee archetypes
    pub size: Option<Vec2>,
    /// Horizontal gap between the enemy and its hit volume
    pub space: f32,
    /// Animation progress per tick
    pub speed: f32,
    /// Animation length in frames
    pub frames: f32,
    able: bool,
    attacking: bool,
    finish: bool,
}

impl EnemyAttackState {
    /// Builds the machine from archetype stats with scaled damage.
    #[must_use]
    pub fn from_stats(stats: &ArchetypeStats, damage: f32) -> Self {
        Self {
            damage,
            range: stats.attack_range,
            size: stats.attack_size,
            space: stats.attack_space,
            speed: stats.attack_speed,
            frames: stats.attack_frames,
            able: true,
            attacking: false,
            finish: false,
        }
    }

    /// Arms the attack so the next animation pass can finish it.
    pub fn arm(&mut self) {
        self.able = true;
    }

    /// Marks the attack as swinging.
    pub fn begin(&mut self) {
        self.attacking = true;
    }

    /// Advances the animation by one tick's worth of progress.
    ///
    /// `frame` is the entity's animation frame index, owned by the
    /// caller so the animation layer can render from the same value.
    pub fn advance(&mut self, frame: &mut f32) -> AttackProgress {
        *frame += self.speed;
        if *frame > self.frames - 1.0 && self.able {
            self.finish = true;
        }
        if *frame >= self.frames {
            AttackProgress::Completed
        } else {
            AttackProgress::Running
        }
    }

    /// Consumes the finish edge, disarming the attack.
    ///
    /// Returns `true` at most once per armed swing.
    pub fn take_finish(&mut self) -> bool {
        if self.finish {
            self.finish = false;
            self.able = false;
            true
        } else {
            false
        }
    }

    /// Ends the swing and re-arms for the next one. `finish` is not
    /// cleared here.
    pub fn reset(&mut self) {
        self.able = true;
        self.attacking = false;
    }

    /// Whether a swing is in progress.
    #[must_use]
    pub const fn attacking(&self) -> bool {
        self.attacking
    }

    /// Whether the attack is armed.
    #[must_use]
    pub const fn able(&self) -> bool {
        self.able
    }

    /// Whether the finish edge is pending.
    #[must_use]
    pub const fn finish_pending(&self) -> bool {
        self.finish
    }
}

/// Cooldown tracker for an archetype's ultimate ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltimateState {
    /// Cooldown between casts, in milliseconds
    pub cooldown_ms: Millis,
    last_cast: Millis,
}

impl UltimateState {
    /// Creates the tracker as if a cast just happened, so the first
    /// real cast waits a full cooldown.
    #[must_use]
    pub fn new(cooldown_ms: Millis, now: Millis) -> Self {
        Self {
            cooldown_ms,
            last_cast: now,
        }
    }

    /// Whether the ultimate is off cooldown.
    #[must_use]
    pub fn ready(&self, now: Millis) -> bool {
        now.saturating_sub(self.last_cast) > self.cooldown_ms
    }

    /// Records a cast.
    pub fn cast(&mut self, now: Millis) {
        self.last_cast = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sword() -> MeleeAttackState {
        MeleeAttackState::from_config(&SwordConfig {
            damage: 60.0,
            swing_ms: 200,
            cooldown_ms: 300,
            hit_fraction: 0.65,
            size: Vec2::new(60.0, 85.5),
            space: 37.5,
        })
    }

    fn bow() -> RangedAttackState {
        RangedAttackState::from_config(&ArchConfig {
            damage: 60.0,
            draw_ms: 500,
            cooldown_ms: 1000,
            range: 300.0,
        })
    }

    #[test]
    fn test_first_swing_available_immediately() {
        let mut sword = sword();
        assert!(sword.can_start(0));
        assert!(sword.try_start(0).is_started());
    }

    #[test]
    fn test_swing_hits_once_at_hit_point() {
        let mut sword = sword();
        assert!(sword.try_start(1000).is_started());

        // Hit point is at 0.65 * 200 = 130 ms
        assert!(!sword.tick(1100));
        assert!(sword.tick(1131));
        assert!(!sword.tick(1150));
        assert!(sword.attacking());
    }

    #[test]
    fn test_swing_completes_and_cooldown_gates() {
        let mut sword = sword();
        sword.try_start(1000);
        sword.tick(1131);
        sword.tick(1201);
        assert!(!sword.attacking());
        assert!(sword.able());

        // Cooldown runs from the swing end, strictly greater-than
        assert_eq!(sword.try_start(1501), AttackOutcome::OnCooldown);
        assert!(sword.try_start(1502).is_started());
    }

    #[test]
    fn test_start_rejected_mid_swing() {
        let mut sword = sword();
        sword.try_start(0);
        assert_eq!(sword.try_start(50), AttackOutcome::InProgress);
    }

    #[test]
    fn test_long_tick_spanning_whole_swing_still_hits_once() {
        let mut sword = sword();
        sword.try_start(0);

        // One tick far past both the hit point and the swing end
        assert!(sword.tick(500));
        assert!(!sword.attacking());
        assert!(!sword.tick(501));
    }

    #[test]
    fn test_bow_releases_on_draw_end() {
        let mut bow = bow();
        assert!(bow.try_start(0).is_started());
        assert!(!bow.tick(400));
        assert!(bow.tick(501));
        assert!(bow.able());
        assert!(!bow.tick(502));
    }

    #[test]
    fn test_bow_cooldown() {
        let mut bow = bow();
        bow.try_start(0);
        bow.tick(501);
        assert_eq!(bow.try_start(1000), AttackOutcome::OnCooldown);
        assert!(bow.try_start(1502).is_started());
    }

    #[test]
    fn test_shield_cycle() {
        let mut shield = ShieldState::new(1000);
        assert!(shield.raise(0).is_started());
        assert!(shield.shielding());

        assert_eq!(shield.raise(500), AttackOutcome::OnCooldown);

        shield.tick(1000);
        assert!(shield.shielding());
        shield.tick(1001);
        assert!(!shield.shielding());
        assert!(shield.raise(1001).is_started());
    }

    fn enemy_attack(speed: f32, frames: f32) -> EnemyAttackState {
        let stats = ArchetypeStats {
            attack_speed: speed,
            attack_frames: frames,
            ..ArchetypeStats::default()
        };
        EnemyAttackState::from_stats(&stats, 60.0)
    }

    #[test]
    fn test_enemy_attack_finish_edge() {
        let mut attack = enemy_attack(0.25, 8.0);
        attack.begin();
        let mut frame = 0.0;

        // 28 ticks bring the frame to 7.0, not yet past the last frame
        for _ in 0..28 {
            assert_eq!(attack.advance(&mut frame), AttackProgress::Running);
        }
        assert!(!attack.finish_pending());

        // Tick 29 crosses frames - 1
        attack.advance(&mut frame);
        assert!(attack.finish_pending());
        assert!(attack.take_finish());
        assert!(!attack.able());
        assert!(!attack.take_finish());
    }

    #[test]
    fn test_enemy_attack_completion() {
        let mut attack = enemy_attack(0.25, 8.0);
        attack.begin();
        let mut frame = 7.9;

        assert_eq!(attack.advance(&mut frame), AttackProgress::Completed);
        attack.reset();
        assert!(attack.able());
        assert!(!attack.attacking());
    }

    #[test]
    fn test_finish_survives_same_tick_completion() {
        // A fast attack can raise finish and run off the end of the
        // animation in the same tick; the hit must still fire.
        let mut attack = enemy_attack(9.0, 8.0);
        attack.begin();
        let mut frame = 0.0;

        assert_eq!(attack.advance(&mut frame), AttackProgress::Completed);
        attack.reset();
        assert!(attack.take_finish());
    }

    #[test]
    fn test_ultimate_waits_full_cooldown_after_spawn() {
        let mut ultimate = UltimateState::new(3000, 500);
        assert!(!ultimate.ready(3000));
        assert!(ultimate.ready(3501));

        ultimate.cast(3501);
        assert!(!ultimate.ready(6000));
        assert!(ultimate.ready(6502));
    }

    proptest! {
        #[test]
        fn prop_one_strike_per_swing_at_any_tick_rate(step in 1u64..=50) {
            let mut sword = sword();
            sword.try_start(0);

            let mut strikes = 0;
            let mut now = 0;
            while now < 600 {
                now += step;
                if sword.tick(now) {
                    strikes += 1;
                }
            }

            prop_assert_eq!(strikes, 1);
            prop_assert!(sword.able());
        }
    }
}
