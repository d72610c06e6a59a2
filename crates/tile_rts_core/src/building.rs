//! Buildings: the static type catalog, construction state and footprints.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::math::Tile;
use crate::unit::UnitTypeIndex;

/// Unique identifier for a building. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

impl std::fmt::Display for BuildingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of building a player can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Resource return point.
    Dropoff,
    /// Raises the food cap.
    Farm,
    /// Trains units.
    Barracks,
}

impl BuildingKind {
    /// Save-format discriminant.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Dropoff => 0,
            Self::Farm => 1,
            Self::Barracks => 2,
        }
    }

    /// Parse a save-format discriminant.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Dropoff),
            1 => Some(Self::Farm),
            2 => Some(Self::Barracks),
            _ => None,
        }
    }

    /// Parse the catalog id (`"dropoff"`, `"farm"`, `"barracks"`).
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "dropoff" => Some(Self::Dropoff),
            "farm" => Some(Self::Farm),
            "barracks" => Some(Self::Barracks),
            _ => None,
        }
    }
}

/// Construction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildState {
    /// Placed, nobody working yet.
    #[default]
    Planned,
    /// At least one builder has contributed.
    Constructing,
    /// Finished and functional.
    Complete,
    /// Abandoned.
    Canceled,
}

impl BuildState {
    /// Save-format discriminant.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Planned => 0,
            Self::Constructing => 1,
            Self::Complete => 2,
            Self::Canceled => 3,
        }
    }

    /// Parse a save-format discriminant.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Planned),
            1 => Some(Self::Constructing),
            2 => Some(Self::Complete),
            3 => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Static properties of a building kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingType {
    /// Which kind this describes.
    pub kind: BuildingKind,
    /// Catalog id.
    pub id: &'static str,
    /// Footprint width.
    pub w: i32,
    /// Footprint height.
    pub h: i32,
    /// Gold cost.
    pub cost_gold: i32,
    /// Wood cost.
    pub cost_wood: i32,
    /// Construction time at one builder.
    pub build_ms: i32,
    /// Food cap added on completion.
    pub food_cap_bonus: i32,
}

/// Look up the catalog entry for a building kind.
#[must_use]
pub const fn building_type(kind: BuildingKind) -> BuildingType {
    match kind {
        BuildingKind::Dropoff => BuildingType {
            kind,
            id: "dropoff",
            w: 1,
            h: 1,
            cost_gold: 120,
            cost_wood: 0,
            build_ms: 1500,
            food_cap_bonus: 0,
        },
        BuildingKind::Farm => BuildingType {
            kind,
            id: "farm",
            w: 1,
            h: 1,
            cost_gold: 60,
            cost_wood: 40,
            build_ms: 1200,
            food_cap_bonus: 4,
        },
        BuildingKind::Barracks => BuildingType {
            kind,
            id: "barracks",
            w: 2,
            h: 2,
            cost_gold: 150,
            cost_wood: 80,
            build_ms: 5000,
            food_cap_bonus: 0,
        },
    }
}

/// A unit waiting in a production queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainItem {
    /// What will come out.
    pub unit_type: UnitTypeIndex,
    /// Time left; only the head of the queue counts down.
    pub remaining_ms: i32,
}

/// A placed building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    /// Unique id.
    pub id: BuildingId,
    /// Building kind.
    pub kind: BuildingKind,
    /// Top-left tile of the footprint.
    pub tile: Tile,
    /// Footprint width.
    pub w: i32,
    /// Footprint height.
    pub h: i32,
    /// Lifecycle state.
    pub state: BuildState,
    /// Construction time accumulated so far.
    pub build_progress_ms: i32,
    /// Construction time required.
    pub build_total_ms: i32,
    /// Gold refunded on cancel before completion.
    pub cost_gold: i32,
    /// Wood refunded on cancel before completion.
    pub cost_wood: i32,
    /// Production queue (barracks only).
    pub queue: VecDeque<TrainItem>,
    /// Where freshly trained units walk to.
    pub rally: Option<Tile>,
}

impl Building {
    /// Create a planned building from its catalog entry.
    #[must_use]
    pub fn planned(id: BuildingId, ty: &BuildingType, tile: Tile) -> Self {
        Self {
            id,
            kind: ty.kind,
            tile,
            w: ty.w,
            h: ty.h,
            state: BuildState::Planned,
            build_progress_ms: 0,
            build_total_ms: ty.build_ms,
            cost_gold: ty.cost_gold,
            cost_wood: ty.cost_wood,
            queue: VecDeque::new(),
            rally: None,
        }
    }

    /// Whether construction has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == BuildState::Complete
    }

    /// Whether `tile` lies inside the footprint.
    #[must_use]
    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.tile.x
            && tile.y >= self.tile.y
            && tile.x < self.tile.x + self.w
            && tile.y < self.tile.y + self.h
    }

    /// Chebyshev distance from `tile` to the nearest footprint tile.
    ///
    /// Zero inside the footprint, one on the ring around it.
    #[must_use]
    pub fn distance_to(&self, tile: Tile) -> i32 {
        let right = self.tile.x + self.w - 1;
        let bottom = self.tile.y + self.h - 1;
        let dx = (self.tile.x - tile.x).max(tile.x - right).max(0);
        let dy = (self.tile.y - tile.y).max(tile.y - bottom).max(0);
        dx.max(dy)
    }

    /// Tiles on ring `r` around the footprint, row-major.
    ///
    /// Ring `r` spans rows `y-1-r ..= y+h+r` and columns `x-1-r ..= x+w+r`.
    /// Interior tiles of the span are included; callers filter by
    /// walkability.
    pub fn ring_scan(&self, r: i32) -> impl Iterator<Item = Tile> {
        let (x0, y0) = (self.tile.x - 1 - r, self.tile.y - 1 - r);
        let (x1, y1) = (self.tile.x + self.w + r, self.tile.y + self.h + r);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Tile::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barracks_at(x: i32, y: i32) -> Building {
        Building::planned(
            BuildingId(1),
            &building_type(BuildingKind::Barracks),
            Tile::new(x, y),
        )
    }

    #[test]
    fn test_catalog() {
        let farm = building_type(BuildingKind::Farm);
        assert_eq!((farm.w, farm.h), (1, 1));
        assert_eq!((farm.cost_gold, farm.cost_wood), (60, 40));
        assert_eq!(farm.food_cap_bonus, 4);

        let barracks = building_type(BuildingKind::Barracks);
        assert_eq!((barracks.w, barracks.h), (2, 2));
        assert_eq!(barracks.build_ms, 5000);

        assert_eq!(building_type(BuildingKind::Dropoff).cost_gold, 120);
        assert_eq!(BuildingKind::from_id("farm"), Some(BuildingKind::Farm));
    }

    #[test]
    fn test_planned_building_copies_costs() {
        let b = barracks_at(4, 4);
        assert_eq!(b.state, BuildState::Planned);
        assert_eq!(b.build_total_ms, 5000);
        assert_eq!(b.cost_wood, 80);
        assert!(b.queue.is_empty());
        assert_eq!(b.rally, None);
    }

    #[test]
    fn test_footprint_distance() {
        let b = barracks_at(4, 4);
        assert_eq!(b.distance_to(Tile::new(5, 5)), 0);
        assert_eq!(b.distance_to(Tile::new(3, 3)), 1);
        assert_eq!(b.distance_to(Tile::new(6, 5)), 1);
        assert_eq!(b.distance_to(Tile::new(7, 5)), 2);
        assert!(b.contains(Tile::new(5, 4)));
        assert!(!b.contains(Tile::new(6, 4)));
    }

    #[test]
    fn test_ring_scan_order() {
        let b = barracks_at(4, 4);
        let ring0: Vec<Tile> = b.ring_scan(0).collect();
        assert_eq!(ring0.len(), 16);
        assert_eq!(ring0[0], Tile::new(3, 3));
        assert_eq!(ring0[1], Tile::new(4, 3));
        assert_eq!(ring0[15], Tile::new(6, 6));
        assert_eq!(b.ring_scan(1).count(), 36);
    }

    #[test]
    fn test_codes() {
        for code in 0..=2 {
            assert_eq!(BuildingKind::from_code(code).map(BuildingKind::code), Some(code));
        }
        for code in 0..=3 {
            assert_eq!(BuildState::from_code(code).map(BuildState::code), Some(code));
        }
        assert_eq!(BuildingKind::from_code(3), None);
    }
}
