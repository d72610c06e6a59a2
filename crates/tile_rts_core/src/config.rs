//! Simulation tuning knobs.

use serde::{Deserialize, Serialize};

use crate::economy::Economy;
use crate::pathfinding::DEFAULT_MAX_NODES;

/// Parameters fixed for the lifetime of a world.
///
/// Every field falls back to its default when missing from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Gold at the start of a game.
    pub starting_gold: i32,
    /// Wood at the start of a game.
    pub starting_wood: i32,
    /// Food cap at the start of a game.
    pub starting_food_cap: i32,
    /// Wood seeded on each forest tile.
    pub wood_per_tile: i32,
    /// Gold seeded on each gold tile.
    pub gold_per_tile: i32,
    /// Node expansion budget for one path search.
    pub max_path_nodes: usize,
}

impl SimConfig {
    /// Duration of one tick in milliseconds.
    #[must_use]
    pub fn tick_ms(&self) -> u32 {
        1000 / self.tick_rate.max(1)
    }

    /// The economy a fresh world starts with.
    #[must_use]
    pub const fn starting_economy(&self) -> Economy {
        Economy::new(self.starting_gold, self.starting_wood, self.starting_food_cap)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            starting_gold: 500,
            starting_wood: 0,
            starting_food_cap: 10,
            wood_per_tile: 300,
            gold_per_tile: 500,
            max_path_nodes: DEFAULT_MAX_NODES,
        }
    }
}
