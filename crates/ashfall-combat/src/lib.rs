//! # Ashfall Combat
//!
//! Combat resolution and enemy AI for Ashfall.
//!
//! This crate is the headless combat core of the game:
//! - Attack state machines (sword swing, bow draw, shield, enemy
//!   attacks, ultimates)
//! - Defense state with hurt immunity windows and armor scaling
//! - Transient attack volumes (melee hits, projectiles, thunder)
//! - The fight manager: attack spawning, collision search and damage
//!   resolution
//! - Per-enemy combat AI (trigger, chase, engage, attack, stun)
//! - Level-scaled enemy spawning
//! - The combat world that ticks everything once per frame
//! - Event bus for sounds, UI and other subscribers
//! - TOML-backed combat tuning
//!
//! Movement, animation and rendering live outside; they write entity
//! rects in and poll entity statuses out.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ai;
pub mod attack;
pub mod config;
pub mod defense;
pub mod entity;
pub mod events;
pub mod fight;
pub mod spawn;
pub mod volumes;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ai::*;
    pub use crate::attack::*;
    pub use crate::config::*;
    pub use crate::defense::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::fight::*;
    pub use crate::spawn::*;
    pub use crate::volumes::*;
    pub use crate::world::*;
}

pub use prelude::*;
