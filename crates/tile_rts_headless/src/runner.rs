//! Headless session: owns a world and answers protocol commands.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tile_rts_core::building::{BuildingId, BuildingKind};
use tile_rts_core::config::SimConfig;
use tile_rts_core::error::GameError;
use tile_rts_core::math::Tile;
use tile_rts_core::scheduler::TickEvents;
use tile_rts_core::timestep::FixedTimestep;
use tile_rts_core::unit::UnitId;
use tile_rts_core::world::World;

use crate::assets::{AssetError, GameAssets};
use crate::config::HeadlessConfig;
use crate::protocol::{Command, Response, WorldState};

/// Why a command was rejected.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The simulation refused the order.
    #[error(transparent)]
    Game(#[from] GameError),
    /// No building kind with this id.
    #[error("Unknown building kind: {0}")]
    UnknownBuildingKind(String),
    /// Tile outside the map.
    #[error("Tile ({x}, {y}) is off the map")]
    OffMap {
        /// Tile X.
        x: i32,
        /// Tile Y.
        y: i32,
    },
}

/// Build a ready-to-play world from loaded assets.
///
/// Installs the unit table and map, spawns the starting units and seeds the
/// resource ledger from the config.
pub fn build_world(sim: &SimConfig, assets: GameAssets) -> World {
    let mut world = World::new(sim.clone());
    world.load_data(assets.unit_types, assets.map);
    world.init_resources_from_tiles(sim.wood_per_tile, sim.gold_per_tile);
    world
}

/// A headless game session.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    world: World,
    timestep: FixedTimestep,
    finished: bool,
}

impl HeadlessRunner {
    /// Start a session on `world`.
    pub fn new(config: HeadlessConfig, world: World) -> Self {
        Self {
            timestep: config.timestep(),
            config,
            world,
            finished: false,
        }
    }

    /// Start a session on the assets named by the config.
    pub fn from_config(config: HeadlessConfig) -> Result<Self, AssetError> {
        let assets = GameAssets::load(&config.assets_dir)?;
        let world = build_world(&config.sim, assets);
        Ok(Self::new(config, world))
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The frame accumulator.
    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }

    /// Whether a `quit` command has been handled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read commands from `input` until `quit` or end of input, writing one
    /// response line per command to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &Response::ready(self.world.tick()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    Response::error(format!("Parse error: {e}"), None)
                }
            };
            write_response(&mut output, &response)?;

            if self.finished {
                return Ok(());
            }
        }

        tracing::info!(tick = self.world.tick(), "Input closed");
        Ok(())
    }

    /// Execute one command.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        tracing::debug!(cmd = name, "Handling command");
        match self.execute(cmd) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(cmd = name, error = %e, "Command rejected");
                Response::error(e.to_string(), Some(name))
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Response, CommandError> {
        let name = cmd.name();
        let response = match cmd {
            Command::Advance { ms } => {
                let ticks = self.timestep.accumulate(ms);
                self.events_response(ticks)
            }
            Command::Tick { count } => self.events_response(count),
            Command::Spawn { unit_type, x, y } => {
                let tile = self.on_map(x, y)?;
                let id = self.world.spawn_unit(&unit_type, tile)?;
                Response::created(name, id.0)
            }
            Command::Move { unit, x, y } => {
                self.world.order_move(UnitId(unit), Tile::new(x, y))?;
                Response::ok(name)
            }
            Command::Gather { unit, x, y } => {
                self.world.order_gather(UnitId(unit), Tile::new(x, y))?;
                Response::ok(name)
            }
            Command::Build {
                building,
                x,
                y,
                builders,
            } => {
                let kind = BuildingKind::from_id(&building)
                    .ok_or(CommandError::UnknownBuildingKind(building))?;
                if let Some(&missing) = builders
                    .iter()
                    .find(|&&b| self.world.unit(UnitId(b)).is_none())
                {
                    return Err(GameError::UnknownUnit(UnitId(missing)).into());
                }
                let id = self.world.start_building(kind, Tile::new(x, y))?;
                for builder in builders {
                    self.world.order_build(UnitId(builder), id)?;
                }
                Response::created(name, id.0)
            }
            Command::Assign { unit, building } => {
                self.world.order_build(UnitId(unit), BuildingId(building))?;
                Response::ok(name)
            }
            Command::CancelBuilding { building, refund } => {
                self.world.cancel_building(BuildingId(building), refund)?;
                self.relax();
                Response::ok(name)
            }
            Command::RemoveBuilding { building, refund } => {
                self.world.remove_building(BuildingId(building), refund)?;
                self.relax();
                Response::ok(name)
            }
            Command::Train {
                building,
                unit_type,
                count,
            } => {
                let queued = self
                    .world
                    .queue_train(BuildingId(building), &unit_type, count)?;
                Response::Ok {
                    cmd: name.to_string(),
                    id: None,
                    count: Some(queued),
                }
            }
            Command::CancelTrain { building, index } => {
                let building = BuildingId(building);
                match index {
                    Some(index) => self.world.cancel_train_at(building, index)?,
                    None => self.world.cancel_last_train(building)?,
                }
                Response::ok(name)
            }
            Command::Rally { building, tile } => {
                let rally = tile.map(|(x, y)| Tile::new(x, y));
                self.world.set_rally(BuildingId(building), rally)?;
                Response::ok(name)
            }
            Command::Save { path } => {
                self.world.save_game(&path)?;
                Response::ok(name)
            }
            Command::Load { path } => {
                self.world.load_game(&path)?;
                self.timestep.reset();
                Response::ok(name)
            }
            Command::State => Response::State(WorldState::capture(&self.world)),
            Command::Hash => Response::StateHash {
                tick: self.world.tick(),
                hash: self.world.state_hash(),
            },
            Command::Quit => {
                self.finished = true;
                tracing::info!(tick = self.world.tick(), "Session ended");
                Response::Bye
            }
        };
        Ok(response)
    }

    fn on_map(&self, x: i32, y: i32) -> Result<Tile, CommandError> {
        let tile = Tile::new(x, y);
        if self.world.map().in_bounds(tile) {
            Ok(tile)
        } else {
            Err(CommandError::OffMap { x, y })
        }
    }

    fn relax(&mut self) {
        let released = self.world.relax_builders();
        if !released.is_empty() {
            tracing::debug!(?released, "Builders released");
        }
    }

    fn events_response(&mut self, ticks: u32) -> Response {
        Response::Events {
            events: self.run_ticks(ticks),
            tick: self.world.tick(),
            ticks,
        }
    }

    /// Run `count` ticks and return their merged events.
    pub fn run_ticks(&mut self, count: u32) -> TickEvents {
        let tick_ms = self.timestep.tick_ms();
        let mut merged = TickEvents::default();
        for _ in 0..count {
            let events = self.world.step(tick_ms);
            log_events(self.world.tick(), &events);
            merged.merge(events);
            self.maybe_autosave();
        }
        merged
    }

    fn maybe_autosave(&self) {
        let Some((path, every)) = self.config.autosave() else {
            return;
        };
        let tick = self.world.tick();
        if tick % every != 0 {
            return;
        }
        match self.world.save_game(path) {
            Ok(()) => tracing::info!(tick, path = %path.display(), "Autosaved"),
            Err(e) => tracing::warn!(tick, path = %path.display(), error = %e, "Autosave failed"),
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

fn log_events(tick: u64, events: &TickEvents) {
    if events.is_empty() {
        return;
    }
    for delivery in &events.deliveries {
        tracing::debug!(
            tick,
            unit = %delivery.unit,
            kind = ?delivery.kind,
            amount = delivery.amount,
            "Delivery"
        );
    }
    tracing::debug!(
        tick,
        spawned = events.spawned.len(),
        completed = events.completed.len(),
        exhausted = events.exhausted.len(),
        released = events.released.len(),
        "Tick events"
    );
}
