//! Transient attack volumes: melee hits, projectiles and the thunder
//! column.
//!
//! The [`VolumeRegistry`] owns every live volume, advances them each
//! frame and sweeps out the expired ones. Collision testing against
//! entities happens in the fight manager; the registry only knows
//! geometry and lifetimes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use ashfall_common::{EntityId, Millis, Rect};

use crate::entity::EntityClass;

/// Short-lived melee hit volume.
///
/// Never destroyed by collision; a single swing's volume may strike
/// several targets, and the target-side immunity window is the only
/// re-hit guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitVolume {
    /// Who swung
    pub source: EntityClass,
    /// Id of the attacker
    pub source_id: EntityId,
    /// Damage per struck target
    pub damage: f32,
    /// Damage volume
    pub rect: Rect,
    /// Set once a shield deflects this hit; it then never damages
    /// the player, though it may still damage others
    pub shielded: bool,
    spawned_at: Millis,
    lifetime_ms: Millis,
}

impl HitVolume {
    /// Creates a hit volume at its final rectangle.
    #[must_use]
    pub fn new(
        source: EntityClass,
        source_id: EntityId,
        damage: f32,
        rect: Rect,
        now: Millis,
        lifetime_ms: Millis,
    ) -> Self {
        Self {
            source,
            source_id,
            damage,
            rect,
            shielded: false,
            spawned_at: now,
            lifetime_ms,
        }
    }

    /// Whether the lifetime has elapsed.
    #[must_use]
    pub fn expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.spawned_at) > self.lifetime_ms
    }
}

/// What a projectile is, for speed lookup and animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Player or ninja arrow
    Arrow,
    /// Wizard death bullet
    DeathBullet,
}

impl ProjectileKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::DeathBullet => "death_bullet",
        }
    }
}

/// A moving ranged attack volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Arrow or death bullet
    pub kind: ProjectileKind,
    /// Who fired
    pub source: EntityClass,
    /// Id of the attacker
    pub source_id: EntityId,
    /// Damage on hit
    pub damage: f32,
    /// Whether the projectile flies rightward
    pub facing_right: bool,
    /// Displacement per tick
    pub velocity: Vec2,
    /// Collision box, a small square around the tip
    pub rect: Rect,
    /// Set if a shield deflected this projectile
    pub shielded: bool,
    collided: Vec<EntityId>,
    spent: bool,
    spawned_at: Millis,
    lifetime_ms: Millis,
}

impl Projectile {
    /// Creates a projectile at its spawn point.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        kind: ProjectileKind,
        source: EntityClass,
        source_id: EntityId,
        damage: f32,
        facing_right: bool,
        speed: f32,
        rect: Rect,
        now: Millis,
        lifetime_ms: Millis,
    ) -> Self {
        let direction = if facing_right { 1.0 } else { -1.0 };
        Self {
            kind,
            source,
            source_id,
            damage,
            facing_right,
            velocity: Vec2::new(direction * speed, 0.0),
            rect,
            shielded: false,
            collided: Vec::new(),
            spent: false,
            spawned_at: now,
            lifetime_ms,
        }
    }

    /// Moves the projectile one tick along its velocity.
    pub fn step(&mut self) {
        self.rect = self.rect.translated(self.velocity);
    }

    /// Whether the lifetime has elapsed.
    #[must_use]
    pub fn expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.spawned_at) > self.lifetime_ms
    }

    /// Whether this projectile already hit the given entity.
    #[must_use]
    pub fn has_hit(&self, id: EntityId) -> bool {
        self.collided.contains(&id)
    }

    /// Records a hit so the same entity is never damaged twice.
    pub fn record_hit(&mut self, id: EntityId) {
        if !self.collided.contains(&id) {
            self.collided.push(id);
        }
    }

    /// Marks the projectile for removal at the end of the resolution
    /// pass.
    pub fn mark_spent(&mut self) {
        self.spent = true;
    }

    /// Whether the projectile is marked for removal.
    #[must_use]
    pub const fn is_spent(&self) -> bool {
        self.spent
    }
}

/// The thunder column: a stationary two-phase area effect.
///
/// While charging it shrinks toward its strike width and deals no
/// damage; once it reaches `min_width` it turns active and damages
/// everything inside for `active_ms`, then expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEffect {
    /// Who summoned the column
    pub source: EntityClass,
    /// Id of the summoner
    pub source_id: EntityId,
    /// Damage while active
    pub damage: f32,
    /// Left edge, drifting right as the column shrinks
    pub x: f32,
    /// Top edge
    pub top: f32,
    /// Current width
    pub width: f32,
    /// Height of the column
    pub height: f32,
    min_width: f32,
    shrink_per_tick: f32,
    active: bool,
    active_ms: Millis,
    timer: Millis,
    collided: Vec<EntityId>,
}

impl AreaEffect {
    /// Summons a column centered over the target rectangle, its foot
    /// at the target's bottom edge.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        source: EntityClass,
        source_id: EntityId,
        damage: f32,
        target: Rect,
        width: f32,
        min_width: f32,
        shrink_per_tick: f32,
        height: f32,
        active_ms: Millis,
        now: Millis,
    ) -> Self {
        Self {
            source,
            source_id,
            damage,
            x: target.center_x() - width / 2.0,
            top: target.bottom() - height,
            width,
            height,
            min_width,
            shrink_per_tick,
            active: false,
            active_ms,
            timer: now,
            collided: Vec::new(),
        }
    }

    /// Advances the column one tick: shrink while charging, then flip
    /// active exactly once.
    pub fn tick(&mut self, now: Millis) {
        if self.width > self.min_width {
            // Shrink symmetrically so the column stays centered
            self.width -= self.shrink_per_tick;
            self.x += self.shrink_per_tick / 2.0;
        } else if !self.active {
            self.active = true;
            self.timer = now;
        }
    }

    /// Whether the strike deals damage right now.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the active phase has run out.
    #[must_use]
    pub fn expired(&self, now: Millis) -> bool {
        self.active && now.saturating_sub(self.timer) > self.active_ms
    }

    /// Current collision rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_topleft(self.x, self.top, self.width, self.height)
    }

    /// Whether the strike already hit the given entity.
    #[must_use]
    pub fn has_hit(&self, id: EntityId) -> bool {
        self.collided.contains(&id)
    }

    /// Records a hit for dedup within the active phase.
    pub fn record_hit(&mut self, id: EntityId) {
        if !self.collided.contains(&id) {
            self.collided.push(id);
        }
    }
}

/// Owns all live attack volumes.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    hits: Vec<HitVolume>,
    projectiles: Vec<Projectile>,
    areas: Vec<AreaEffect>,
}

impl VolumeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a melee hit volume.
    pub fn push_hit(&mut self, hit: HitVolume) {
        self.hits.push(hit);
    }

    /// Adds a projectile.
    pub fn push_projectile(&mut self, projectile: Projectile) {
        self.projectiles.push(projectile);
    }

    /// Adds an area effect.
    pub fn push_area(&mut self, area: AreaEffect) {
        self.areas.push(area);
    }

    /// Advances every volume one tick, then sweeps out expired ones.
    ///
    /// Removal is deferred to after the advance pass so volumes are
    /// never dropped mid-iteration.
    pub fn tick(&mut self, now: Millis) {
        for projectile in &mut self.projectiles {
            projectile.step();
        }
        for area in &mut self.areas {
            area.tick(now);
        }

        self.hits.retain(|hit| !hit.expired(now));
        self.projectiles.retain(|projectile| !projectile.expired(now));
        self.areas.retain(|area| !area.expired(now));
    }

    /// Removes projectiles marked spent during collision resolution.
    pub fn sweep_spent(&mut self) {
        self.projectiles.retain(|projectile| !projectile.is_spent());
    }

    /// Live melee hits.
    #[must_use]
    pub fn hits(&self) -> &[HitVolume] {
        &self.hits
    }

    /// Live melee hits, mutable.
    pub fn hits_mut(&mut self) -> &mut [HitVolume] {
        &mut self.hits
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Live projectiles, mutable.
    pub fn projectiles_mut(&mut self) -> &mut [Projectile] {
        &mut self.projectiles
    }

    /// Live area effects.
    #[must_use]
    pub fn areas(&self) -> &[AreaEffect] {
        &self.areas
    }

    /// Live area effects, mutable.
    pub fn areas_mut(&mut self) -> &mut [AreaEffect] {
        &mut self.areas
    }

    /// Total number of live volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len() + self.projectiles.len() + self.areas.len()
    }

    /// Whether no volumes are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
