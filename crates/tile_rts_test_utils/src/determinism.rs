//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the world must avoid:
//!
//! - **Floating-point math**: construction speed uses
//!   [`tile_rts_core::math::Fx`].
//! - **HashMap iteration order**: units are updated in slot order and
//!   buildings live in a `BTreeMap`; hash maps are only used for lookups.
//! - **Ties in searches**: every nearest-tile search keeps the first
//!   candidate in a fixed scan order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual planners and searches
//! 2. **Property tests**: random order scripts must replay identically
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: N worlds stepped on different threads all match

use std::thread;

use tile_rts_core::world::World;

use crate::fixtures::TICK_MS;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// All distinct hashes (one for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation several times and compare the final hashes.
///
/// Generic over the state so hosts can wrap the world (for example in a
/// runner with its own accumulator).
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Build the world twice, step both [`TICK_MS`] at a time, and compare.
pub fn verify_world_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> World,
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        |world| {
            world.step(TICK_MS);
        },
        World::state_hash,
    )
}

/// Step `num_worlds` worlds on separate scoped threads.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_worlds<F>(setup_fn: F, num_worlds: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> World + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        world.step(TICK_MS);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks: num_ticks,
    }
}

/// Step two identical worlds in lockstep and report the first tick at which
/// their hashes differ.
///
/// `None` if they never diverge, `Some(0)` if they differ from the start.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> World,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step(TICK_MS);
        b.step(TICK_MS);
        if a.state_hash() != b.state_hash() {
            tracing::warn!(tick, "Worlds diverged");
            return Some(tick);
        }
    }
    None
}

/// Run `warmup` ticks, take a binary snapshot, then check the restored copy
/// keeps matching the original for `after` more ticks.
pub fn verify_snapshot_determinism<F>(setup_fn: F, warmup: u64, after: u64) -> bool
where
    F: Fn() -> World,
{
    let mut world = setup_fn();
    for _ in 0..warmup {
        world.step(TICK_MS);
    }

    let Ok(bytes) = world.snapshot() else {
        return false;
    };
    let Ok(mut restored) = World::restore(&bytes) else {
        return false;
    };
    if restored.state_hash() != world.state_hash() {
        return false;
    }

    for _ in 0..after {
        world.step(TICK_MS);
        restored.step(TICK_MS);
    }
    restored.state_hash() == world.state_hash()
}

/// Proptest strategies for world inputs.
pub mod strategies {
    use proptest::prelude::*;
    use tile_rts_core::building::BuildingKind;
    use tile_rts_core::math::Tile;
    use tile_rts_core::world::World;

    /// A tile inside a `width` x `height` map.
    pub fn arb_tile(width: i32, height: i32) -> impl Strategy<Value = Tile> {
        (0..width, 0..height).prop_map(|(x, y)| Tile::new(x, y))
    }

    /// A tile that may fall up to two tiles outside the map.
    pub fn arb_tile_near(width: i32, height: i32) -> impl Strategy<Value = Tile> {
        (-2..width + 2, -2..height + 2).prop_map(|(x, y)| Tile::new(x, y))
    }

    /// ASCII map rows drawn from the map legend.
    pub fn arb_map_rows(width: usize, height: usize) -> impl Strategy<Value = Vec<String>> {
        let cell = prop_oneof![
            6 => Just('.'),
            1 => Just('#'),
            1 => Just('T'),
            1 => Just('G'),
        ];
        prop::collection::vec(
            prop::collection::vec(cell, width).prop_map(|cells| cells.into_iter().collect()),
            height,
        )
    }

    /// Any building kind.
    pub fn arb_building_kind() -> impl Strategy<Value = BuildingKind> {
        prop_oneof![
            Just(BuildingKind::Dropoff),
            Just(BuildingKind::Farm),
            Just(BuildingKind::Barracks),
        ]
    }

    /// One scripted player action.
    #[derive(Debug, Clone)]
    pub enum ScriptedOrder {
        /// Move the n-th unit (modulo the unit count).
        Move(usize, Tile),
        /// Send the n-th unit to gather at a tile.
        Gather(usize, Tile),
        /// Place a building.
        Place(BuildingKind, Tile),
        /// Run some ticks.
        Wait(u8),
    }

    impl ScriptedOrder {
        /// Apply to `world`. Rejected orders are ignored.
        pub fn apply(&self, world: &mut World) {
            let pick = |world: &World, n: usize| {
                let units = world.units();
                (!units.is_empty()).then(|| units[n % units.len()].id)
            };
            match *self {
                Self::Move(n, goal) => {
                    if let Some(id) = pick(world, n) {
                        let _ = world.order_move(id, goal);
                    }
                }
                Self::Gather(n, target) => {
                    if let Some(id) = pick(world, n) {
                        let _ = world.order_gather(id, target);
                    }
                }
                Self::Place(kind, tile) => {
                    let _ = world.start_building(kind, tile);
                }
                Self::Wait(ticks) => {
                    for _ in 0..ticks {
                        world.step(crate::fixtures::TICK_MS);
                    }
                }
            }
        }
    }

    /// A scripted order for a `width` x `height` map.
    pub fn arb_order(width: i32, height: i32) -> impl Strategy<Value = ScriptedOrder> {
        prop_oneof![
            (0..8usize, arb_tile(width, height)).prop_map(|(n, t)| ScriptedOrder::Move(n, t)),
            (0..8usize, arb_tile(width, height)).prop_map(|(n, t)| ScriptedOrder::Gather(n, t)),
            (arb_building_kind(), arb_tile(width, height))
                .prop_map(|(k, t)| ScriptedOrder::Place(k, t)),
            (1..20u8).prop_map(ScriptedOrder::Wait),
        ]
    }
}
