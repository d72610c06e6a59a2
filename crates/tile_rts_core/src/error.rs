//! Error types for the game simulation.

use thiserror::Error;

use crate::building::BuildingId;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
///
/// Every variant is recoverable: a call that returns one of these has not
/// changed the world.
#[derive(Debug, Error)]
pub enum GameError {
    /// No unit type is registered under this string id.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Invalid unit identifier.
    #[error("Invalid unit ID: {0}")]
    UnknownUnit(UnitId),

    /// Invalid building identifier.
    #[error("Invalid building ID: {0}")]
    UnknownBuilding(BuildingId),

    /// Insufficient resources.
    #[error("Insufficient resources: need {gold} gold and {wood} wood, have {have_gold} gold and {have_wood} wood")]
    InsufficientResources {
        /// Gold required.
        gold: i32,
        /// Wood required.
        wood: i32,
        /// Gold available.
        have_gold: i32,
        /// Wood available.
        have_wood: i32,
    },

    /// Training would push food usage over the cap.
    #[error("Food cap exceeded: {used} + {needed} > {cap}")]
    FoodCapExceeded {
        /// Food currently committed.
        used: i32,
        /// Food the unit needs.
        needed: i32,
        /// Current food cap.
        cap: i32,
    },

    /// Footprint is out of bounds, blocked, or not bare grass.
    #[error("Cannot place building at ({x}, {y})")]
    InvalidPlacement {
        /// Top-left x of the rejected footprint.
        x: i32,
        /// Top-left y of the rejected footprint.
        y: i32,
    },

    /// Only barracks have production queues.
    #[error("Building {0} cannot train units")]
    NotABarracks(BuildingId),

    /// Nothing requested or nothing to cancel.
    #[error("Production queue of building {0} is empty")]
    QueueEmpty(BuildingId),

    /// Queue index past the end.
    #[error("Queue index {index} out of range (len {len})")]
    QueueIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Queue length.
        len: usize,
    },

    /// The building has already been completed.
    #[error("Building {0} is already complete")]
    BuildingComplete(BuildingId),

    /// Map data could not be turned into a grid.
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// Save file header did not match the supported version.
    #[error("Unsupported save version: {0}")]
    SaveVersionMismatch(String),

    /// Save file content could not be parsed.
    #[error("Malformed save data at line {line}: {message}")]
    SaveFormat {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary snapshot encoding or decoding failed.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
