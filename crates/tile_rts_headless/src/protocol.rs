//! JSON-lines protocol for controlling a headless world.
//!
//! One command per stdin line, one response per stdout line.
//!
//! # Commands
//!
//! ```json
//! {"cmd":"advance","ms":125}
//! {"cmd":"tick","count":20}
//! {"cmd":"spawn","unit_type":"worker","x":3,"y":2}
//! {"cmd":"gather","unit":1,"x":12,"y":4}
//! {"cmd":"build","building":"barracks","x":8,"y":6,"builders":[1]}
//! {"cmd":"train","building":1,"unit_type":"footman","count":3}
//! {"cmd":"save","path":"saves/slot1.txt"}
//! {"cmd":"state"}
//! ```

use serde::{Deserialize, Serialize};
use tile_rts_core::building::{BuildState, Building, BuildingKind};
use tile_rts_core::economy::Economy;
use tile_rts_core::map::ResourceKind;
use tile_rts_core::math::Tile;
use tile_rts_core::scheduler::TickEvents;
use tile_rts_core::unit::{Unit, UnitJob, UnitTypeIndex};
use tile_rts_core::world::World;

/// Protocol version reported in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Commands (stdin)
// ============================================================================

/// Commands accepted on stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Feed wall-clock time through the fixed-timestep accumulator.
    Advance {
        /// Elapsed milliseconds.
        ms: u32,
    },

    /// Run whole ticks.
    Tick {
        /// Number of ticks (default 1).
        #[serde(default = "default_count")]
        count: u32,
    },

    /// Spawn a unit.
    Spawn {
        /// Unit type id from the unit table.
        unit_type: String,
        /// Tile X.
        x: i32,
        /// Tile Y.
        y: i32,
    },

    /// Move a unit.
    Move {
        /// Unit id.
        unit: u32,
        /// Target tile X.
        x: i32,
        /// Target tile Y.
        y: i32,
    },

    /// Send a unit to gather.
    Gather {
        /// Unit id.
        unit: u32,
        /// Resource tile X.
        x: i32,
        /// Resource tile Y.
        y: i32,
    },

    /// Place a building and optionally assign builders.
    Build {
        /// Building kind id: `dropoff`, `farm` or `barracks`.
        building: String,
        /// Top-left tile X.
        x: i32,
        /// Top-left tile Y.
        y: i32,
        /// Units to put to work on the site.
        #[serde(default)]
        builders: Vec<u32>,
    },

    /// Assign a unit to an existing construction site.
    Assign {
        /// Unit id.
        unit: u32,
        /// Building id.
        building: u32,
    },

    /// Cancel a building.
    CancelBuilding {
        /// Building id.
        building: u32,
        /// Refund the cost (default true).
        #[serde(default = "default_true")]
        refund: bool,
    },

    /// Remove a building.
    RemoveBuilding {
        /// Building id.
        building: u32,
        /// Refund the cost if unfinished (default false).
        #[serde(default)]
        refund: bool,
    },

    /// Queue units at a barracks.
    Train {
        /// Barracks id.
        building: u32,
        /// Unit type id.
        unit_type: String,
        /// How many (default 1).
        #[serde(default = "default_count")]
        count: u32,
    },

    /// Cancel queued training.
    CancelTrain {
        /// Barracks id.
        building: u32,
        /// Queue index; the last item if omitted.
        #[serde(default)]
        index: Option<usize>,
    },

    /// Set or clear a barracks rally point.
    Rally {
        /// Barracks id.
        building: u32,
        /// Rally tile; clears the rally point if omitted.
        #[serde(default)]
        tile: Option<(i32, i32)>,
    },

    /// Write a save file.
    Save {
        /// Destination path.
        path: String,
    },

    /// Replace the world with a save file.
    Load {
        /// Source path.
        path: String,
    },

    /// Dump the full world state.
    State,

    /// Report the state hash.
    Hash,

    /// End the session.
    Quit,
}

fn default_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Responses (stdout)
// ============================================================================

/// Responses written to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session started.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
    },

    /// Command succeeded.
    Ok {
        /// Command name.
        cmd: String,
        /// Id of the unit or building the command created.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u32>,
        /// How many items the command queued.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },

    /// Command failed. The world is unchanged.
    Error {
        /// Error message.
        message: String,
        /// Command name, if the line parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Ticks were run.
    Events {
        /// Tick after the last one run.
        tick: u64,
        /// Number of ticks run.
        ticks: u32,
        /// Everything that happened, merged in tick order.
        events: TickEvents,
    },

    /// Full world state.
    State(WorldState),

    /// State hash for determinism checks.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash of the simulation state.
        hash: u64,
    },

    /// Session ended.
    Bye,
}

/// World state snapshot for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current tick.
    pub tick: u64,
    /// State hash.
    pub hash: u64,
    /// Stockpiles and food.
    pub economy: Economy,
    /// Registered dropoff tiles.
    pub dropoffs: Vec<Tile>,
    /// All units in update order.
    pub units: Vec<UnitState>,
    /// All buildings in id order.
    pub buildings: Vec<BuildingState>,
}

/// Unit state for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// Unit id.
    pub id: u32,
    /// Unit type id.
    pub unit_type: String,
    /// Current tile.
    pub tile: Tile,
    /// Where the unit is heading.
    pub goal: Tile,
    /// Waypoints left.
    pub path_len: usize,
    /// Hit points.
    pub hp: i32,
    /// Current job.
    pub job: UnitJob,
    /// Cargo amount.
    pub carried: i32,
    /// Cargo kind.
    pub carried_kind: Option<ResourceKind>,
    /// Assigned construction site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<u32>,
}

/// Building state for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingState {
    /// Building id.
    pub id: u32,
    /// Kind.
    pub kind: BuildingKind,
    /// Top-left tile.
    pub tile: Tile,
    /// Footprint width.
    pub w: i32,
    /// Footprint height.
    pub h: i32,
    /// Construction state.
    pub state: BuildState,
    /// Construction progress.
    pub progress_ms: i32,
    /// Construction time.
    pub total_ms: i32,
    /// Training queue, head first.
    pub queue: Vec<QueueItemState>,
    /// Rally point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rally: Option<Tile>,
}

/// One training queue entry for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItemState {
    /// Unit type id.
    pub unit_type: String,
    /// Time left.
    pub remaining_ms: i32,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create a plain success response.
    pub fn ok(cmd: &str) -> Self {
        Self::Ok {
            cmd: cmd.to_string(),
            id: None,
            count: None,
        }
    }

    /// Create a success response carrying a new id.
    pub fn created(cmd: &str, id: u32) -> Self {
        Self::Ok {
            cmd: cmd.to_string(),
            id: Some(id),
            count: None,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Tick { .. } => "tick",
            Self::Spawn { .. } => "spawn",
            Self::Move { .. } => "move",
            Self::Gather { .. } => "gather",
            Self::Build { .. } => "build",
            Self::Assign { .. } => "assign",
            Self::CancelBuilding { .. } => "cancel_building",
            Self::RemoveBuilding { .. } => "remove_building",
            Self::Train { .. } => "train",
            Self::CancelTrain { .. } => "cancel_train",
            Self::Rally { .. } => "rally",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::State => "state",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

impl WorldState {
    /// Capture `world`.
    pub fn capture(world: &World) -> Self {
        let type_id = |index: UnitTypeIndex| {
            world
                .unit_types()
                .get(index)
                .map_or_else(|| "?".to_string(), |t| t.id.clone())
        };

        Self {
            tick: world.tick(),
            hash: world.state_hash(),
            economy: *world.economy(),
            dropoffs: world.dropoffs().to_vec(),
            units: world
                .units()
                .iter()
                .map(|u| UnitState::from_unit(u, type_id(u.type_index)))
                .collect(),
            buildings: world
                .buildings()
                .map(|b| BuildingState::from_building(b, &type_id))
                .collect(),
        }
    }
}

impl UnitState {
    fn from_unit(unit: &Unit, unit_type: String) -> Self {
        Self {
            id: unit.id.0,
            unit_type,
            tile: unit.tile,
            goal: unit.goal,
            path_len: unit.path.len(),
            hp: unit.hp,
            job: unit.job,
            carried: unit.carried,
            carried_kind: unit.carried_kind,
            building: unit.building_target.map(|b| b.0),
        }
    }
}

impl BuildingState {
    fn from_building<F>(building: &Building, type_id: &F) -> Self
    where
        F: Fn(UnitTypeIndex) -> String,
    {
        Self {
            id: building.id.0,
            kind: building.kind,
            tile: building.tile,
            w: building.w,
            h: building.h,
            state: building.state,
            progress_ms: building.build_progress_ms,
            total_ms: building.build_total_ms,
            queue: building
                .queue
                .iter()
                .map(|item| QueueItemState {
                    unit_type: type_id(item.unit_type),
                    remaining_ms: item.remaining_ms,
                })
                .collect(),
            rally: building.rally,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let cmd = Command::from_json(r#"{"cmd":"tick","count":60}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 60 });
    }

    #[test]
    fn test_default_tick_count() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 1 });
    }

    #[test]
    fn test_parse_build_command() {
        let json = r#"{"cmd":"build","building":"farm","x":4,"y":7}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Build { building, x: 4, y: 7, builders } if building == "farm" && builders.is_empty()
        ));
    }

    #[test]
    fn test_cancel_building_refunds_by_default() {
        let cmd = Command::from_json(r#"{"cmd":"cancel_building","building":3}"#).unwrap();
        assert_eq!(
            cmd,
            Command::CancelBuilding {
                building: 3,
                refund: true
            }
        );
        let cmd = Command::from_json(r#"{"cmd":"remove_building","building":3}"#).unwrap();
        assert_eq!(
            cmd,
            Command::RemoveBuilding {
                building: 3,
                refund: false
            }
        );
    }

    #[test]
    fn test_parse_rally() {
        let cmd = Command::from_json(r#"{"cmd":"rally","building":2,"tile":[5,6]}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Rally {
                building: 2,
                tile: Some((5, 6))
            }
        );
        let cmd = Command::from_json(r#"{"cmd":"rally","building":2}"#).unwrap();
        assert_eq!(cmd.name(), "rally");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"attack","unit":1}"#).is_err());
    }

    #[test]
    fn test_ok_response_skips_empty_fields() {
        let json = Response::ok("move").to_json_line();
        assert_eq!(json, "{\"type\":\"ok\",\"cmd\":\"move\"}\n");
        let json = Response::created("spawn", 7).to_json_line();
        assert!(json.contains(r#""id":7"#));
    }

    #[test]
    fn test_serialize_events_response() {
        let resp = Response::Events {
            tick: 40,
            ticks: 2,
            events: TickEvents::default(),
        };
        let json = resp.to_json_line();
        assert!(json.contains(r#""type":"events""#));
        assert!(json.contains(r#""ticks":2"#));
    }
}
