//! Tile grid: static terrain, dynamic blocking, and the per-tile resource ledger.
//!
//! Indices are row-major (`y * width + x`). The `blocked` overlay is
//! independent of terrain; buildings set it. A resource tile that is drained
//! reverts to plain, unblocked grass in the same call that drained it.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Tile;

/// Terrain code of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Bare, buildable ground.
    #[default]
    Grass,
    /// Impassable.
    Wall,
    /// Gold deposit terrain.
    Gold,
    /// Forest terrain.
    Forest,
    /// Marks a dropoff point.
    Dropoff,
}

impl Terrain {
    /// Integer code used by the save format.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Grass => 0,
            Self::Wall => 1,
            Self::Gold => 2,
            Self::Forest => 3,
            Self::Dropoff => 4,
        }
    }

    /// Parse an integer code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Grass),
            1 => Some(Self::Wall),
            2 => Some(Self::Gold),
            3 => Some(Self::Forest),
            4 => Some(Self::Dropoff),
            _ => None,
        }
    }

    /// Map legend character: `#` wall, `G` gold, `T` forest, `D` dropoff,
    /// anything else grass.
    #[must_use]
    pub const fn from_legend(c: char) -> Self {
        match c {
            '#' => Self::Wall,
            'G' => Self::Gold,
            'T' => Self::Forest,
            'D' => Self::Dropoff,
            _ => Self::Grass,
        }
    }

    /// The resource this terrain yields when the ledger has not been set up.
    #[must_use]
    pub const fn resource(self) -> ResourceKind {
        match self {
            Self::Gold => ResourceKind::Gold,
            Self::Forest => ResourceKind::Wood,
            _ => ResourceKind::None,
        }
    }
}

/// Kind of harvestable resource on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Nothing to harvest.
    #[default]
    None,
    /// Gold.
    Gold,
    /// Wood.
    Wood,
}

impl ResourceKind {
    /// Integer code used by the save format (mirrors the source terrain code).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Gold => 2,
            Self::Wood => 3,
        }
    }

    /// Parse an integer code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            2 => Some(Self::Gold),
            3 => Some(Self::Wood),
            _ => None,
        }
    }
}

/// The game map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Map {
    width: i32,
    height: i32,
    tiles: Vec<Terrain>,
    blocked: Vec<bool>,
    res_kind: Vec<ResourceKind>,
    res_amount: Vec<i32>,
    res_max: Vec<i32>,
}

impl Map {
    /// Create an all-grass map with an empty resource ledger.
    ///
    /// Negative dimensions are treated as zero.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let cells = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Terrain::Grass; cells],
            blocked: vec![false; cells],
            res_kind: vec![ResourceKind::None; cells],
            res_amount: vec![0; cells],
            res_max: vec![0; cells],
        }
    }

    /// Build a map from rows of legend characters.
    ///
    /// Width is taken from the first row; shorter rows are padded with grass
    /// and longer rows are cut.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(GameError::InvalidMap("map has no rows".into()));
        };
        let width = first.as_ref().chars().count() as i32;
        let mut map = Self::new(width, rows.len() as i32);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.as_ref().chars().take(width as usize).enumerate() {
                map.set_terrain(Tile::new(x as i32, y as i32), Terrain::from_legend(c));
            }
        }
        Ok(map)
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Check if coordinates are within map bounds.
    #[must_use]
    pub fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    /// Row-major index, or `None` if out of bounds.
    #[must_use]
    pub fn index(&self, tile: Tile) -> Option<usize> {
        self.in_bounds(tile)
            .then(|| (tile.y as usize) * (self.width as usize) + (tile.x as usize))
    }

    /// Tile for a row-major index.
    #[must_use]
    pub fn tile_at_index(&self, index: usize) -> Tile {
        let width = self.width.max(1) as usize;
        Tile::new((index % width) as i32, (index / width) as i32)
    }

    /// Terrain at a tile.
    #[must_use]
    pub fn terrain(&self, tile: Tile) -> Option<Terrain> {
        self.index(tile).map(|i| self.tiles[i])
    }

    /// Overwrite the terrain at a tile. Out-of-bounds writes are ignored.
    pub fn set_terrain(&mut self, tile: Tile, terrain: Terrain) {
        if let Some(i) = self.index(tile) {
            self.tiles[i] = terrain;
        }
    }

    /// Whether the occupancy overlay marks this tile.
    #[must_use]
    pub fn is_blocked(&self, tile: Tile) -> bool {
        self.index(tile).is_some_and(|i| self.blocked[i])
    }

    /// Set the occupancy overlay for one tile. Out-of-bounds writes are ignored.
    pub fn set_blocked(&mut self, tile: Tile, blocked: bool) {
        if let Some(i) = self.index(tile) {
            self.blocked[i] = blocked;
        }
    }

    /// Set the occupancy overlay over a rectangle, clipped to the map.
    pub fn set_blocked_rect(&mut self, top_left: Tile, w: i32, h: i32, blocked: bool) {
        for dy in 0..h {
            for dx in 0..w {
                self.set_blocked(top_left.offset(dx, dy), blocked);
            }
        }
    }

    /// A tile is walkable iff it is in bounds, not blocked, and not a wall.
    #[must_use]
    pub fn is_walkable(&self, tile: Tile) -> bool {
        self.index(tile)
            .is_some_and(|i| !self.blocked[i] && self.tiles[i] != Terrain::Wall)
    }

    /// Resource kind on a tile.
    #[must_use]
    pub fn resource_kind(&self, tile: Tile) -> ResourceKind {
        self.index(tile)
            .map_or(ResourceKind::None, |i| self.res_kind[i])
    }

    /// Remaining resource amount on a tile.
    #[must_use]
    pub fn resource_amount(&self, tile: Tile) -> i32 {
        self.index(tile).map_or(0, |i| self.res_amount[i])
    }

    /// Initial resource amount on a tile (display only).
    #[must_use]
    pub fn resource_max(&self, tile: Tile) -> i32 {
        self.index(tile).map_or(0, |i| self.res_max[i])
    }

    /// Whether the tile currently holds a positive amount of `kind`.
    #[must_use]
    pub fn has_resource(&self, tile: Tile, kind: ResourceKind) -> bool {
        kind != ResourceKind::None
            && self
                .index(tile)
                .is_some_and(|i| self.res_kind[i] == kind && self.res_amount[i] > 0)
    }

    /// Write one ledger entry directly. Used by map loaders and save restore.
    pub fn set_resource(&mut self, tile: Tile, kind: ResourceKind, amount: i32, max: i32) {
        if let Some(i) = self.index(tile) {
            self.res_kind[i] = kind;
            self.res_amount[i] = amount;
            self.res_max[i] = max;
        }
    }

    /// Seed the resource ledger from terrain: forests get `wood_amount`, gold
    /// tiles get `gold_amount`, everything else is cleared.
    pub fn init_resources_from_tiles(&mut self, wood_amount: i32, gold_amount: i32) {
        for i in 0..self.tiles.len() {
            let (kind, amount) = match self.tiles[i] {
                Terrain::Forest => (ResourceKind::Wood, wood_amount),
                Terrain::Gold => (ResourceKind::Gold, gold_amount),
                _ => (ResourceKind::None, 0),
            };
            self.res_kind[i] = kind;
            self.res_amount[i] = amount;
            self.res_max[i] = amount;
        }
    }

    /// Withdraw up to `amount` from a resource tile.
    ///
    /// Returns the amount actually taken, or `None` if the tile is out of
    /// bounds or holds nothing. Draining the tile turns it into unblocked grass.
    pub fn resource_take_at(&mut self, tile: Tile, amount: i32) -> Option<i32> {
        let i = self.index(tile)?;
        if self.res_kind[i] == ResourceKind::None || self.res_amount[i] <= 0 {
            return None;
        }

        let taken = amount.clamp(0, self.res_amount[i]);
        self.res_amount[i] -= taken;

        if self.res_amount[i] <= 0 {
            self.tiles[i] = Terrain::Grass;
            self.blocked[i] = false;
            self.res_kind[i] = ResourceKind::None;
            self.res_amount[i] = 0;
        }
        Some(taken)
    }

    /// Iterate all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Tile::new(x, y)))
    }

    /// All tiles with the given terrain, row-major.
    #[must_use]
    pub fn tiles_with_terrain(&self, terrain: Terrain) -> Vec<Tile> {
        self.tiles()
            .filter(|&t| self.terrain(t) == Some(terrain))
            .collect()
    }

    /// Check the exhaustion invariant over the whole map: no tile keeps a
    /// resource kind once its amount has reached zero.
    #[must_use]
    pub fn ledger_is_consistent(&self) -> bool {
        self.res_kind
            .iter()
            .zip(&self.res_amount)
            .all(|(&kind, &amount)| amount > 0 || kind == ResourceKind::None)
    }

    pub(crate) fn raw_tiles(&self) -> &[Terrain] {
        &self.tiles
    }

    pub(crate) fn raw_blocked(&self) -> &[bool] {
        &self.blocked
    }

    pub(crate) fn raw_res_kind(&self) -> &[ResourceKind] {
        &self.res_kind
    }

    pub(crate) fn raw_res_amount(&self) -> &[i32] {
        &self.res_amount
    }

    pub(crate) fn raw_res_max(&self) -> &[i32] {
        &self.res_max
    }

    pub(crate) fn raw_mut(
        &mut self,
    ) -> (
        &mut [Terrain],
        &mut [bool],
        &mut [ResourceKind],
        &mut [i32],
        &mut [i32],
    ) {
        (
            &mut self.tiles,
            &mut self.blocked,
            &mut self.res_kind,
            &mut self.res_amount,
            &mut self.res_max,
        )
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
