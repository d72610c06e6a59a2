//! Per-unit job logic: resource seeking and the tick planner.
//!
//! Everything here is a pure function of the map, the dropoff registry and
//! one unit. The scheduler asks [`plan`] what a unit wants to do this tick
//! and applies the returned [`Plan`]; after a harvest it asks
//! [`plan_after_harvest`] for the follow-up.
//!
//! Scan orders are fixed (row-major for tiles, `dy` then `dx` for
//! neighbours) and every "nearest" search keeps the first candidate on ties,
//! so two worlds in the same state always make the same choice.

use crate::economy::CARRY_CAPACITY;
use crate::map::{Map, ResourceKind};
use crate::math::{Tile, NEIGHBOURS_8};
use crate::unit::{Unit, UnitJob};

/// A harvestable tile together with where to stand to harvest it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTarget {
    /// The resource tile.
    pub resource: Tile,
    /// Walkable neighbour to stand on.
    pub stand: Tile,
}

/// What a unit does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Nothing changes.
    Hold,
    /// Step onto the next waypoint.
    Advance(Tile),
    /// The next waypoint is blocked; drop the path and wait.
    DropPath,
    /// Switch to `Idle`, keeping any cargo.
    Idle,
    /// Take one quantum from an adjacent resource tile.
    Harvest {
        /// Tile to harvest.
        resource: Tile,
        /// Kind being harvested.
        kind: ResourceKind,
    },
    /// Take up `job` and walk to `goal`.
    Walk {
        /// New job.
        job: UnitJob,
        /// New goal; the path is computed when applied.
        goal: Tile,
    },
    /// Unload cargo at the dropoff underfoot.
    Deposit {
        /// Gathering job and standing tile to return to, if any resource of
        /// the delivered kind is left.
        resume: Option<(UnitJob, Tile)>,
    },
}

/// First tile in `dropoffs` with the smallest Manhattan distance to `from`.
#[must_use]
pub fn nearest_dropoff(dropoffs: &[Tile], from: Tile) -> Option<Tile> {
    let mut best: Option<(i32, Tile)> = None;
    for &d in dropoffs {
        let dist = d.manhattan(from);
        if best.map_or(true, |(b, _)| dist < b) {
            best = Some((dist, d));
        }
    }
    best.map(|(_, d)| d)
}

/// First 8-neighbour of `tile` holding a positive amount of `kind`.
#[must_use]
pub fn find_adjacent_resource(map: &Map, tile: Tile, kind: ResourceKind) -> Option<Tile> {
    NEIGHBOURS_8
        .iter()
        .map(|&(dx, dy)| tile.offset(dx, dy))
        .find(|&t| map.has_resource(t, kind))
}

/// Walkable 8-neighbour of `resource` closest to `from` (Manhattan).
#[must_use]
pub fn find_stand_tile(map: &Map, resource: Tile, from: Tile) -> Option<Tile> {
    let mut best: Option<(i32, Tile)> = None;
    for &(dx, dy) in &NEIGHBOURS_8 {
        let stand = resource.offset(dx, dy);
        if !map.is_walkable(stand) {
            continue;
        }
        let dist = stand.manhattan(from);
        if best.map_or(true, |(b, _)| dist < b) {
            best = Some((dist, stand));
        }
    }
    best.map(|(_, t)| t)
}

/// Nearest tile of `kind` (Manhattan from `from`) that can be stood next to.
///
/// Tiles with no walkable neighbour are skipped. Ties go to the first tile
/// in row-major order.
#[must_use]
pub fn find_nearest_resource(map: &Map, from: Tile, kind: ResourceKind) -> Option<ResourceTarget> {
    let mut best: Option<(i32, ResourceTarget)> = None;
    for resource in map.tiles() {
        if !map.has_resource(resource, kind) {
            continue;
        }
        let dist = resource.manhattan(from);
        if best.is_some_and(|(b, _)| dist >= b) {
            continue;
        }
        if let Some(stand) = find_stand_tile(map, resource, from) {
            best = Some((dist, ResourceTarget { resource, stand }));
        }
    }
    best.map(|(_, target)| target)
}

/// Decide what `unit` does this tick.
#[must_use]
pub fn plan(map: &Map, dropoffs: &[Tile], unit: &Unit) -> Plan {
    if let Some(&next) = unit.path.front() {
        return if map.is_walkable(next) {
            Plan::Advance(next)
        } else {
            Plan::DropPath
        };
    }

    match unit.job {
        UnitJob::Moving => Plan::Idle,
        UnitJob::GatheringGold | UnitJob::GatheringWood => {
            let Some(kind) = unit.job.gathered_kind() else {
                return Plan::Hold;
            };
            if let Some(resource) = find_adjacent_resource(map, unit.tile, kind) {
                return Plan::Harvest { resource, kind };
            }
            match find_nearest_resource(map, unit.tile, kind) {
                Some(target) => Plan::Walk {
                    job: unit.job,
                    goal: target.stand,
                },
                None => Plan::Idle,
            }
        }
        UnitJob::Delivering => {
            if delivery_tile(dropoffs, unit) == unit.tile {
                Plan::Deposit {
                    resume: resume_gathering(map, unit),
                }
            } else {
                Plan::Hold
            }
        }
        UnitJob::Building | UnitJob::Idle => Plan::Hold,
    }
}

/// Follow-up after `unit` harvested from `resource`.
///
/// `unit` and `map` must already reflect the harvest. Exhaustion is handled
/// before capacity: a unit that empties its tile moves on to the next one
/// even when full, and delivers after its next harvest there.
#[must_use]
pub fn plan_after_harvest(
    map: &Map,
    dropoffs: &[Tile],
    unit: &Unit,
    resource: Tile,
    kind: ResourceKind,
) -> Plan {
    if !map.has_resource(resource, kind) {
        return match find_nearest_resource(map, unit.tile, kind) {
            Some(target) => Plan::Walk {
                job: unit.job,
                goal: target.stand,
            },
            None if unit.carried > 0 => deliver(dropoffs, unit),
            None => Plan::Idle,
        };
    }

    if unit.carried >= CARRY_CAPACITY {
        deliver(dropoffs, unit)
    } else {
        Plan::Hold
    }
}

/// Where cargo is unloaded. With no dropoff registered the unit's own tile
/// serves as one.
fn delivery_tile(dropoffs: &[Tile], unit: &Unit) -> Tile {
    nearest_dropoff(dropoffs, unit.tile).unwrap_or(unit.tile)
}

fn deliver(dropoffs: &[Tile], unit: &Unit) -> Plan {
    Plan::Walk {
        job: UnitJob::Delivering,
        goal: delivery_tile(dropoffs, unit),
    }
}

fn resume_gathering(map: &Map, unit: &Unit) -> Option<(UnitJob, Tile)> {
    let kind = unit.carried_kind?;
    let job = UnitJob::gathering(kind)?;
    find_nearest_resource(map, unit.tile, kind).map(|target| (job, target.stand))
}
