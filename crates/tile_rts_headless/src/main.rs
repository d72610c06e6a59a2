//! Headless tile RTS runner.
//!
//! This binary runs the simulation without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted play, CI testing, and determinism
//! checks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tile_rts_headless
//!
//! # Use a config file
//! cargo run -p tile_rts_headless -- --config headless.ron run
//!
//! # Run 5000 ticks and save the result
//! cargo run -p tile_rts_headless -- simulate --ticks 5000 --save out/save.txt
//!
//! # Check that parallel runs agree
//! cargo run -p tile_rts_headless -- verify --runs 8 --ticks 2000
//!
//! # Check an asset directory
//! cargo run -p tile_rts_headless -- validate
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_rts_core::map::Terrain;
use tile_rts_core::scheduler::TickEvents;
use tile_rts_core::world::World;
use tile_rts_headless::{build_world, GameAssets, HeadlessConfig, HeadlessRunner};

#[derive(Parser)]
#[command(name = "tile_rts_headless")]
#[command(about = "Headless tile RTS runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RON config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive JSON-lines session
    Run,

    /// Step the world without input and print a summary
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Write a save file when done
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Run the same game several times in parallel and compare state hashes
    Verify {
        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "2000")]
        ticks: u64,
    },

    /// Load the assets and report what they contain
    Validate,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let config = load_config(cli.config);

    match cli.command {
        Some(Commands::Run) | None => cmd_run(config),
        Some(Commands::Simulate { ticks, save }) => cmd_simulate(&config, ticks, save),
        Some(Commands::Verify { runs, ticks }) => cmd_verify(&config, runs, ticks),
        Some(Commands::Validate) => cmd_validate(&config),
    }
}

fn load_config(path: Option<PathBuf>) -> HeadlessConfig {
    let Some(path) = path else {
        return HeadlessConfig::default();
    };
    match HeadlessConfig::load(&path) {
        Ok(config) => {
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    }
}

fn load_assets(config: &HeadlessConfig) -> GameAssets {
    match GameAssets::load(&config.assets_dir) {
        Ok(assets) => assets,
        Err(e) => {
            eprintln!("Failed to load assets: {e}");
            std::process::exit(1);
        }
    }
}

fn run_world(world: &mut World, tick_ms: u32, ticks: u64) -> TickEvents {
    let mut totals = TickEvents::default();
    for _ in 0..ticks {
        totals.merge(world.step(tick_ms));
    }
    totals
}

/// Run an interactive session
fn cmd_run(config: HeadlessConfig) {
    tracing::info!("Starting interactive session");

    let mut runner = match HeadlessRunner::from_config(config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to start session: {e}");
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = runner.run(stdin.lock(), stdout.lock()) {
        eprintln!("Session I/O failed: {e}");
        std::process::exit(1);
    }
}

/// Step a fresh world and report
fn cmd_simulate(config: &HeadlessConfig, ticks: u64, save: Option<PathBuf>) {
    tracing::info!("Simulating {} ticks", ticks);

    let mut world = build_world(&config.sim, load_assets(config));
    let start = Instant::now();
    let events = run_world(&mut world, config.sim.tick_ms(), ticks);
    let elapsed = start.elapsed();

    let gathered: i32 = events.deliveries.iter().map(|d| d.amount).sum();
    let economy = world.economy();
    eprintln!("Simulation complete:");
    eprintln!("  Ticks: {} ({:.1?})", world.tick(), elapsed);
    eprintln!("  Gold: {}  Wood: {}", economy.gold, economy.wood);
    eprintln!("  Food: {}/{}", economy.food_used, economy.food_cap);
    eprintln!("  Units: {}", world.units().len());
    eprintln!("  Buildings: {}", world.buildings().count());
    eprintln!(
        "  Deliveries: {} ({} resources)",
        events.deliveries.len(),
        gathered
    );
    eprintln!("  Tiles exhausted: {}", events.exhausted.len());
    eprintln!("  State hash: {:016x}", world.state_hash());

    if let Some(path) = save {
        if let Err(e) = world.save_game(&path) {
            eprintln!("Failed to save: {e}");
            std::process::exit(1);
        }
        eprintln!("Saved to {}", path.display());
    }
}

/// Verify determinism
fn cmd_verify(config: &HeadlessConfig, runs: u32, ticks: u64) {
    tracing::info!("Verifying determinism: {} runs of {} ticks", runs, ticks);

    let assets = load_assets(config);
    let tick_ms = config.sim.tick_ms();

    let hashes: Vec<u64> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| {
            let mut world = build_world(&config.sim, assets.clone());
            run_world(&mut world, tick_ms, ticks);
            world.state_hash()
        })
        .collect();

    let mut unique = hashes.clone();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != 1 {
        eprintln!("FAIL: Non-determinism detected!");
        eprintln!("  Hashes: {hashes:016x?}");
        std::process::exit(1);
    }

    // A world restored from a mid-game snapshot must finish identically.
    let mut world = build_world(&config.sim, assets);
    run_world(&mut world, tick_ms, ticks / 2);
    let restored = world
        .snapshot()
        .and_then(|bytes| World::restore(&bytes));
    let mut restored = match restored {
        Ok(restored) => restored,
        Err(e) => {
            eprintln!("FAIL: Snapshot round trip failed: {e}");
            std::process::exit(1);
        }
    };
    run_world(&mut restored, tick_ms, ticks - ticks / 2);
    if restored.state_hash() != hashes[0] {
        eprintln!("FAIL: Restored snapshot diverged!");
        eprintln!("  Expected: {:016x}", hashes[0]);
        eprintln!("  Actual:   {:016x}", restored.state_hash());
        std::process::exit(1);
    }

    eprintln!("PASS: All {} runs produced identical results", hashes.len());
    eprintln!("  State hash: {:016x}", hashes[0]);
}

/// Check the asset directory
fn cmd_validate(config: &HeadlessConfig) {
    tracing::info!("Validating assets in {}", config.assets_dir.display());

    let assets = load_assets(config);
    let map = &assets.map;
    eprintln!("Assets OK:");
    eprintln!("  Unit types: {}", assets.unit_types.len());
    for ty in &assets.unit_types {
        eprintln!(
            "    {} - {} hp, {}g {}w, {} food, {} ms",
            ty.id, ty.hp, ty.cost_gold, ty.cost_wood, ty.food, ty.build_time_ms
        );
    }
    eprintln!("  Map: {}x{}", map.width(), map.height());
    eprintln!(
        "  Dropoffs: {}",
        map.tiles_with_terrain(Terrain::Dropoff).len()
    );
    eprintln!(
        "  Forest tiles: {}",
        map.tiles_with_terrain(Terrain::Forest).len()
    );
    eprintln!("  Gold tiles: {}", map.tiles_with_terrain(Terrain::Gold).len());

    let world = build_world(&config.sim, assets);
    eprintln!("  Starting units: {}", world.units().len());
    if world.units().is_empty() {
        tracing::warn!("No starting units: the unit table has no worker or footman");
    }
}
