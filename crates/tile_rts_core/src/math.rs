//! Fixed-point math and tile coordinates for deterministic simulation.
//!
//! Any fractional quantity in the simulation goes through [`Fx`] so results
//! never depend on floating-point rounding across platforms. Positions are
//! whole tiles.

use fixed::types::I16F16;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for sub-tile simulation math.
///
/// 16 integer bits and 16 fractional bits, signed. Addition and subtraction
/// are exact; multiplication and division use a 64-bit intermediate and
/// truncate.
pub type Fx = I16F16;

/// Build an [`Fx`] from an integer.
#[must_use]
pub fn fx_from_int(value: i32) -> Fx {
    Fx::saturating_from_num(value)
}

/// Floor an [`Fx`] to an integer.
#[must_use]
pub fn fx_floor_to_int(value: Fx) -> i32 {
    value.floor().to_num::<i32>()
}

/// Multiply a non-negative integer by an [`Fx`] factor and truncate.
///
/// Uses a 64-bit intermediate so large millisecond deltas cannot overflow
/// the 16-bit integer part of `Fx`.
#[must_use]
pub fn fx_scale_int(value: u32, factor: Fx) -> i64 {
    (i64::from(value) * i64::from(factor.to_bits())) >> Fx::FRAC_NBITS
}

/// Integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Tile {
    /// Create a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Sentinel used by the save format for "no tile".
    pub const UNSET: Self = Self { x: -1, y: -1 };

    /// Manhattan distance.
    #[must_use]
    pub fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev (chessboard) distance.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Offset by a delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight neighbours of a tile in scan order (row by row, left to right).
pub const NEIGHBOURS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
