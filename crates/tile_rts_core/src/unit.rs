//! Unit types, unit instances and the job enum they cycle through.
//!
//! Unit types are immutable after load and live in a [`UnitTypeTable`];
//! units refer to them by [`UnitTypeIndex`].

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::building::BuildingId;
use crate::map::ResourceKind;
use crate::math::Tile;

/// Unique identifier for a unit. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a unit type in the [`UnitTypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeIndex(pub u16);

/// Attack damage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackType {
    /// Default melee/ranged damage.
    #[default]
    Normal,
    /// Arrows and bolts.
    Pierce,
    /// Siege engines.
    Siege,
    /// Spells.
    Magic,
}

impl AttackType {
    /// Parse a data-table name. Unknown names fall back to `Normal`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Pierce" => Self::Pierce,
            "Siege" => Self::Siege,
            "Magic" => Self::Magic,
            _ => Self::Normal,
        }
    }
}

/// Armor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArmorType {
    /// Light armor.
    Light,
    /// Medium armor.
    #[default]
    Medium,
    /// Heavy armor.
    Heavy,
    /// Structures.
    Building,
}

impl ArmorType {
    /// Parse a data-table name. Unknown names fall back to `Medium`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Light" => Self::Light,
            "Heavy" => Self::Heavy,
            "Building" => Self::Building,
            _ => Self::Medium,
        }
    }
}

/// Attack profile. Carried for data completeness; combat is not simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attack {
    /// Damage category.
    pub kind: AttackType,
    /// Damage per hit.
    pub damage: i16,
    /// Time between hits.
    pub cooldown_ms: u16,
    /// Reach in tiles.
    pub range_tiles: u16,
}

/// Armor profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Armor {
    /// Armor category.
    pub kind: ArmorType,
    /// Flat damage reduction.
    pub value: i16,
}

/// Static definition of a unit type, loaded once from data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitType {
    /// String id used by data files and saves (e.g. `"worker"`).
    pub id: String,
    /// Starting hit points.
    pub hp: i32,
    /// Movement speed in pixels per second (presentation only).
    pub move_speed_px_s: i32,
    /// Attack profile.
    pub attack: Attack,
    /// Armor profile.
    pub armor: Armor,
    /// Sight radius in tiles.
    pub sight_tiles: i32,
    /// Gold cost to train.
    pub cost_gold: i32,
    /// Wood cost to train.
    pub cost_wood: i32,
    /// Food (supply) consumed while alive or queued.
    pub food: i32,
    /// Training time.
    pub build_time_ms: i32,
}

/// Immutable unit-type table with its id lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeTable {
    types: Vec<UnitType>,
    index: HashMap<String, UnitTypeIndex>,
}

impl UnitTypeTable {
    /// Build the table. A later entry with a duplicate id shadows the
    /// earlier one in the lookup.
    #[must_use]
    pub fn new(types: Vec<UnitType>) -> Self {
        let index = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), UnitTypeIndex(i as u16)))
            .collect();
        Self { types, index }
    }

    /// Resolve a string id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<UnitTypeIndex> {
        self.index.get(id).copied()
    }

    /// Get a unit type by index.
    #[must_use]
    pub fn get(&self, index: UnitTypeIndex) -> Option<&UnitType> {
        self.types.get(usize::from(index.0))
    }

    /// All unit types in load order.
    #[must_use]
    pub fn types(&self) -> &[UnitType] {
        &self.types
    }

    /// Number of unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// What a unit is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitJob {
    /// Standing around.
    #[default]
    Idle,
    /// Walking to a player-chosen goal.
    Moving,
    /// Harvesting gold.
    GatheringGold,
    /// Harvesting wood.
    GatheringWood,
    /// Carrying cargo to a dropoff.
    Delivering,
    /// Assigned to a construction site.
    Building,
}

impl UnitJob {
    /// Save-format discriminant.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Moving => 1,
            Self::GatheringGold => 2,
            Self::GatheringWood => 3,
            Self::Delivering => 4,
            Self::Building => 5,
        }
    }

    /// Parse a save-format discriminant.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Moving),
            2 => Some(Self::GatheringGold),
            3 => Some(Self::GatheringWood),
            4 => Some(Self::Delivering),
            5 => Some(Self::Building),
            _ => None,
        }
    }

    /// The gathering job for a resource kind.
    #[must_use]
    pub const fn gathering(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Gold => Some(Self::GatheringGold),
            ResourceKind::Wood => Some(Self::GatheringWood),
            ResourceKind::None => None,
        }
    }

    /// The resource a gathering job harvests.
    #[must_use]
    pub const fn gathered_kind(self) -> Option<ResourceKind> {
        match self {
            Self::GatheringGold => Some(ResourceKind::Gold),
            Self::GatheringWood => Some(ResourceKind::Wood),
            _ => None,
        }
    }
}

/// A unit instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id.
    pub id: UnitId,
    /// Index into the unit-type table.
    pub type_index: UnitTypeIndex,
    /// Current tile.
    pub tile: Tile,
    /// Last ordered destination.
    pub goal: Tile,
    /// Waypoints still to traverse; the front is the next step.
    pub path: VecDeque<Tile>,
    /// Hit points.
    pub hp: i32,
    /// Attack cooldown. Not advanced while combat is not simulated.
    pub cooldown: u16,
    /// Current job.
    pub job: UnitJob,
    /// Amount of cargo carried.
    pub carried: i32,
    /// Kind of cargo carried or being gathered.
    pub carried_kind: Option<ResourceKind>,
    /// Construction site this unit works on.
    pub building_target: Option<BuildingId>,
}

impl Unit {
    /// Create an idle unit standing on `tile`.
    #[must_use]
    pub fn new(id: UnitId, type_index: UnitTypeIndex, tile: Tile, hp: i32) -> Self {
        Self {
            id,
            type_index,
            tile,
            goal: tile,
            path: VecDeque::new(),
            hp,
            cooldown: 0,
            job: UnitJob::Idle,
            carried: 0,
            carried_kind: None,
            building_target: None,
        }
    }

    /// Whether the unit still has waypoints to walk.
    #[must_use]
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Replace the current path.
    pub fn set_path(&mut self, path: Vec<Tile>) {
        self.path = path.into();
    }
}
