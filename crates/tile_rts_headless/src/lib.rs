//! Headless host for the tile RTS simulation.
//!
//! Loads assets from disk, drives a [`World`](tile_rts_core::world::World)
//! through a fixed-timestep accumulator and exposes it over a JSON-lines
//! protocol. This enables:
//!
//! - **Scripted play**: a controller process issues orders and reads state
//! - **CI verification**: long runs and determinism checks without a window
//! - **Save testing**: save and load through the same entry points a game uses
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (advance, tick, gather, build, etc.)
//! - **stdout**: Responses and state (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p tile_rts_headless -- run
//!
//! # Simulate 1000 ticks and print the state hash
//! cargo run -p tile_rts_headless -- simulate --ticks 1000
//!
//! # Verify determinism
//! cargo run -p tile_rts_headless -- verify --runs 8 --ticks 2000
//! ```

pub mod assets;
pub mod config;
pub mod protocol;
pub mod runner;

pub use assets::{AssetError, GameAssets};
pub use config::{ConfigError, HeadlessConfig};
pub use protocol::{Command, Response, WorldState};
pub use runner::{build_world, CommandError, HeadlessRunner};
