//! Test fixtures: unit tables, maps and ready-made worlds.

use tile_rts_core::building::{BuildingId, BuildingKind};
use tile_rts_core::config::SimConfig;
use tile_rts_core::map::Map;
use tile_rts_core::math::{fx_from_int, Fx, Tile};
use tile_rts_core::unit::{Armor, ArmorType, Attack, AttackType, UnitId, UnitType};
use tile_rts_core::world::World;

/// Tick length used by fixtures (20 Hz).
pub const TICK_MS: u32 = 50;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fx {
    fx_from_int(n)
}

/// Worker: cheap gatherer and builder.
#[must_use]
pub fn worker_type() -> UnitType {
    UnitType {
        id: "worker".into(),
        hp: 30,
        move_speed_px_s: 64,
        attack: Attack {
            kind: AttackType::Normal,
            damage: 3,
            cooldown_ms: 1000,
            range_tiles: 1,
        },
        armor: Armor {
            kind: ArmorType::Light,
            value: 0,
        },
        sight_tiles: 4,
        cost_gold: 50,
        cost_wood: 0,
        food: 1,
        build_time_ms: 1000,
    }
}

/// Footman: melee infantry.
#[must_use]
pub fn footman_type() -> UnitType {
    UnitType {
        id: "footman".into(),
        hp: 60,
        move_speed_px_s: 56,
        attack: Attack {
            kind: AttackType::Normal,
            damage: 6,
            cooldown_ms: 900,
            range_tiles: 1,
        },
        armor: Armor {
            kind: ArmorType::Heavy,
            value: 2,
        },
        sight_tiles: 5,
        cost_gold: 100,
        cost_wood: 20,
        food: 2,
        build_time_ms: 1500,
    }
}

/// Archer: ranged unit that costs wood.
#[must_use]
pub fn archer_type() -> UnitType {
    UnitType {
        id: "archer".into(),
        hp: 40,
        move_speed_px_s: 60,
        attack: Attack {
            kind: AttackType::Pierce,
            damage: 5,
            cooldown_ms: 1200,
            range_tiles: 4,
        },
        armor: Armor {
            kind: ArmorType::Light,
            value: 0,
        },
        sight_tiles: 7,
        cost_gold: 80,
        cost_wood: 30,
        food: 1,
        build_time_ms: 1200,
    }
}

/// The standard unit table: worker, footman, archer.
#[must_use]
pub fn unit_types() -> Vec<UnitType> {
    vec![worker_type(), footman_type(), archer_type()]
}

/// A 16x10 map with a dropoff, a gold mine, a forest belt and a wall.
pub const DEMO_MAP: [&str; 10] = [
    "................",
    ".D..........TTT.",
    "............TTT.",
    "......#.........",
    "......#.....G...",
    "......#.........",
    "................",
    ".TT.............",
    ".TT........####.",
    "................",
];

/// Parse map rows.
///
/// # Panics
///
/// Panics if `rows` is empty.
#[must_use]
pub fn map(rows: &[&str]) -> Map {
    Map::from_rows(rows).expect("fixture map must have rows")
}

/// An all-grass map.
#[must_use]
pub fn open_map(width: i32, height: i32) -> Map {
    Map::new(width, height)
}

/// World with the standard unit table, `rows` as the map and the resource
/// ledger seeded from the config defaults.
#[must_use]
pub fn world(rows: &[&str]) -> World {
    world_with_config(rows, SimConfig::default())
}

/// Like [`world`] with an explicit config.
#[must_use]
pub fn world_with_config(rows: &[&str], config: SimConfig) -> World {
    let (wood, gold) = (config.wood_per_tile, config.gold_per_tile);
    let mut world = World::new(config);
    world.load_data(unit_types(), map(rows));
    world.init_resources_from_tiles(wood, gold);
    world
}

/// World on [`DEMO_MAP`].
#[must_use]
pub fn demo_world() -> World {
    world(&DEMO_MAP)
}

/// Starting worker of a world set up by [`world`].
///
/// # Panics
///
/// Panics if the world has no units.
#[must_use]
pub fn first_worker(world: &World) -> UnitId {
    world.units()[0].id
}

/// [`DEMO_MAP`] with the starting worker on wood and two extra workers on
/// gold.
///
/// # Panics
///
/// Panics if the demo map no longer matches the orders.
#[must_use]
pub fn gathering_world() -> World {
    let mut world = demo_world();
    let worker = first_worker(&world);
    world
        .order_gather(worker, Tile::new(12, 1))
        .expect("worker exists");
    for x in [3, 4] {
        let id = world
            .spawn_unit("worker", Tile::new(x, 2))
            .expect("worker type exists");
        world
            .order_gather(id, Tile::new(12, 4))
            .expect("worker exists");
    }
    world
}

/// [`DEMO_MAP`] with a barracks under construction at (8, 6) and two
/// builders assigned.
///
/// # Panics
///
/// Panics if the barracks cannot be placed.
#[must_use]
pub fn construction_world() -> (World, BuildingId) {
    let mut world = demo_world();
    world.economy_mut().wood = 200;
    let site = world
        .start_building(BuildingKind::Barracks, Tile::new(8, 6))
        .expect("barracks fits");
    let worker = first_worker(&world);
    world.order_build(worker, site).expect("site exists");
    let extra = world
        .spawn_unit("worker", Tile::new(10, 7))
        .expect("worker type exists");
    world.order_build(extra, site).expect("site exists");
    (world, site)
}

/// Step `world` `ticks` times at [`TICK_MS`].
pub fn run_ticks(world: &mut World, ticks: u64) {
    for _ in 0..ticks {
        world.step(TICK_MS);
    }
}
