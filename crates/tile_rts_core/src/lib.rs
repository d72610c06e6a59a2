//! # Tile RTS Core
//!
//! Deterministic simulation engine for a tile-grid real-time-strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering or input
//! - No asset parsing (hosts hand over unit types and maps)
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! Two worlds that receive the same orders and the same sequence of
//! [`World::step`](world::World::step) calls stay bit-identical, which
//! [`World::state_hash`](world::World::state_hash) makes cheap to check.
//!
//! ## Crate Structure
//!
//! - [`map`] - Terrain, occupancy and the resource ledger
//! - [`pathfinding`] - Grid A*
//! - [`unit`], [`building`], [`economy`] - Entity data
//! - [`world`] - State owner, lookups, snapshots
//! - [`orders`], [`gathering`] - Player orders and the unit job planner
//! - [`construction`], [`production`] - Building sites and training queues
//! - [`scheduler`] - The per-tick update
//! - [`timestep`] - Wall-clock to tick conversion
//! - [`persistence`] - Text save files

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod building;
pub mod config;
pub mod construction;
pub mod economy;
pub mod error;
pub mod gathering;
pub mod map;
pub mod math;
pub mod orders;
pub mod pathfinding;
pub mod persistence;
pub mod production;
pub mod scheduler;
pub mod timestep;
pub mod unit;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::building::{BuildState, Building, BuildingId, BuildingKind, BuildingType};
    pub use crate::config::SimConfig;
    pub use crate::economy::Economy;
    pub use crate::error::{GameError, Result};
    pub use crate::map::{Map, ResourceKind, Terrain};
    pub use crate::math::{Fx, Tile};
    pub use crate::pathfinding::Connectivity;
    pub use crate::scheduler::{Delivery, TickEvents};
    pub use crate::timestep::FixedTimestep;
    pub use crate::unit::{Unit, UnitId, UnitJob, UnitType, UnitTypeIndex};
    pub use crate::world::World;
}
