//! The game world: owner of all simulation state.
//!
//! Behaviour is split across modules that each add an `impl World` block:
//! orders in [`crate::orders`], construction in [`crate::construction`],
//! training in [`crate::production`], the tick in [`crate::scheduler`] and
//! saving in [`crate::persistence`]. This module holds storage, lookups and
//! the determinism helpers.
//!
//! # Determinism
//!
//! - Units are stored append-only and updated in id order.
//! - Buildings live in a `BTreeMap`, so iteration is in id order.
//! - No floating point and no randomness.
//!
//! # Example
//!
//! ```
//! use tile_rts_core::map::Map;
//! use tile_rts_core::math::Tile;
//! use tile_rts_core::unit::UnitType;
//! use tile_rts_core::world::World;
//!
//! let worker = UnitType { id: "worker".into(), hp: 30, ..Default::default() };
//! let map = Map::from_rows(&["D....", "....."]).unwrap();
//!
//! let mut world = World::default();
//! world.load_data(vec![worker], map);
//! assert_eq!(world.units().len(), 1);
//! assert_eq!(world.units()[0].tile, Tile::new(1, 0));
//!
//! world.step(50);
//! assert_eq!(world.tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::building::{building_type, Building, BuildingId, BuildingKind, BuildingType};
use crate::config::SimConfig;
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::gathering;
use crate::map::{Map, Terrain};
use crate::math::Tile;
use crate::pathfinding::{find_path, Connectivity};
use crate::unit::{Unit, UnitId, UnitType, UnitTypeIndex, UnitTypeTable};

/// Complete simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) tick: u64,
    pub(crate) map: Map,
    pub(crate) unit_types: UnitTypeTable,
    pub(crate) units: Vec<Unit>,
    pub(crate) unit_slots: HashMap<UnitId, usize>,
    pub(crate) next_unit_id: u32,
    pub(crate) buildings: BTreeMap<BuildingId, Building>,
    pub(crate) next_building_id: u32,
    pub(crate) economy: Economy,
    pub(crate) dropoffs: Vec<Tile>,
}

impl World {
    /// Create an empty world with no map and no unit types.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let economy = config.starting_economy();
        Self {
            config,
            tick: 0,
            map: Map::default(),
            unit_types: UnitTypeTable::default(),
            units: Vec::new(),
            unit_slots: HashMap::new(),
            next_unit_id: 1,
            buildings: BTreeMap::new(),
            next_building_id: 1,
            economy,
            dropoffs: Vec::new(),
        }
    }

    /// Empty world sharing this world's configuration, tick counter and
    /// unit-type table. Used as the scratch target when loading.
    pub(crate) fn scratch(&self) -> Self {
        Self {
            tick: self.tick,
            unit_types: self.unit_types.clone(),
            ..Self::new(self.config.clone())
        }
    }

    /// Install the unit-type table and map and set up a new game.
    ///
    /// Units, buildings and the economy are reset. Dropoff-marker tiles seed
    /// the dropoff registry, and a `worker` and a `footman` are spawned one
    /// and three tiles east of the first dropoff (or of `(1, 1)` without
    /// one). Starting units whose type is missing are skipped. The resource
    /// ledger is left untouched; see
    /// [`init_resources_from_tiles`](Self::init_resources_from_tiles).
    ///
    /// Returns the ids of the starting units.
    pub fn load_data(&mut self, unit_types: Vec<UnitType>, map: Map) -> Vec<UnitId> {
        *self = Self {
            tick: self.tick,
            unit_types: UnitTypeTable::new(unit_types),
            map,
            ..Self::new(self.config.clone())
        };
        self.dropoffs = self.map.tiles_with_terrain(Terrain::Dropoff);

        let base = self.dropoffs.first().copied().unwrap_or(Tile::new(1, 1));
        let mut spawned = Vec::new();
        for (type_id, dx) in [("worker", 1), ("footman", 3)] {
            match self.spawn_unit(type_id, base.offset(dx, 0)) {
                Ok(id) => spawned.push(id),
                Err(e) => tracing::warn!(type_id, error = %e, "Skipping starting unit"),
            }
        }

        tracing::info!(
            width = self.map.width(),
            height = self.map.height(),
            unit_types = self.unit_types.len(),
            dropoffs = self.dropoffs.len(),
            "World data loaded"
        );
        spawned
    }

    /// Seed the resource ledger from terrain.
    pub fn init_resources_from_tiles(&mut self, wood_amount: i32, gold_amount: i32) {
        self.map.init_resources_from_tiles(wood_amount, gold_amount);
    }

    /// Withdraw up to `amount` from a resource tile. See
    /// [`Map::resource_take_at`].
    pub fn resource_take_at(&mut self, tile: Tile, amount: i32) -> Option<i32> {
        self.map.resource_take_at(tile, amount)
    }

    /// Create a unit of the given type on `tile`.
    pub fn spawn_unit(&mut self, type_id: &str, tile: Tile) -> Result<UnitId> {
        let index = self
            .unit_types
            .lookup(type_id)
            .ok_or_else(|| GameError::UnknownUnitType(type_id.to_string()))?;
        self.spawn_unit_of(index, tile)
            .ok_or_else(|| GameError::UnknownUnitType(type_id.to_string()))
    }

    pub(crate) fn spawn_unit_of(&mut self, type_index: UnitTypeIndex, tile: Tile) -> Option<UnitId> {
        let hp = self.unit_types.get(type_index)?.hp;
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.insert_unit(Unit::new(id, type_index, tile, hp));
        Some(id)
    }

    pub(crate) fn insert_unit(&mut self, unit: Unit) {
        self.unit_slots.insert(unit.id, self.units.len());
        self.units.push(unit);
    }

    /// Current tick number.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Configuration this world was created with.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The map.
    #[must_use]
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Loaded unit types.
    #[must_use]
    pub fn unit_types(&self) -> &UnitTypeTable {
        &self.unit_types
    }

    /// Stockpiles and food.
    #[must_use]
    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Mutable stockpiles, for scenario setup and cheats.
    pub fn economy_mut(&mut self) -> &mut Economy {
        &mut self.economy
    }

    /// All units in creation order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.unit_slots.get(&id).and_then(|&slot| self.units.get(slot))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.unit_slots
            .get(&id)
            .and_then(|&slot| self.units.get_mut(slot))
            .ok_or(GameError::UnknownUnit(id))
    }

    /// All buildings in id order.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// Look up a building.
    #[must_use]
    pub fn find_building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub(crate) fn building_mut(&mut self, id: BuildingId) -> Result<&mut Building> {
        self.buildings
            .get_mut(&id)
            .ok_or(GameError::UnknownBuilding(id))
    }

    /// Catalog entry for a building kind.
    #[must_use]
    pub const fn building_type(&self, kind: BuildingKind) -> BuildingType {
        building_type(kind)
    }

    /// Registered dropoff tiles.
    #[must_use]
    pub fn dropoffs(&self) -> &[Tile] {
        &self.dropoffs
    }

    /// Dropoff closest to `from` by Manhattan distance, first registered on
    /// ties.
    #[must_use]
    pub fn nearest_dropoff(&self, from: Tile) -> Option<Tile> {
        gathering::nearest_dropoff(&self.dropoffs, from)
    }

    /// 8-connected path with the configured node budget. Failure yields an
    /// empty path.
    pub(crate) fn path_between(&self, from: Tile, to: Tile) -> Vec<Tile> {
        find_path(
            &self.map,
            from,
            to,
            Connectivity::Eight,
            self.config.max_path_nodes,
        )
        .unwrap_or_else(|| {
            tracing::debug!(%from, %to, "No path");
            Vec::new()
        })
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two worlds with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.economy.hash(&mut hasher);
        self.next_unit_id.hash(&mut hasher);
        self.next_building_id.hash(&mut hasher);
        self.map.hash(&mut hasher);
        self.dropoffs.hash(&mut hasher);

        self.buildings.len().hash(&mut hasher);
        for building in self.buildings.values() {
            building.hash(&mut hasher);
        }

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the whole world to a binary snapshot.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize world: {e}")))
    }

    /// Rebuild a world from a binary snapshot.
    pub fn restore(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize world: {e}")))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}
