//! # Ashfall Common
//!
//! Shared foundation types for the Ashfall combat crates:
//! - Entity identifiers
//! - The millisecond clock abstraction combat timers run on
//! - Screen-space rectangle geometry
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod geom;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::geom::*;
    pub use crate::ids::*;
}

pub use prelude::*;
