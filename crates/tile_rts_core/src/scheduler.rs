//! The fixed-timestep tick.
//!
//! [`World::step`] is the only per-tick mutator. Each call runs, in order:
//!
//! 1. **Units** - every unit in id order plans one action and applies it
//! 2. **Construction** - every unfinished building in id order
//! 3. **Production** - every finished barracks in id order
//! 4. **Relax** - builders of finished or vanished sites go idle

use serde::{Deserialize, Serialize};

use crate::building::BuildingId;
use crate::economy::HARVEST_QUANTUM;
use crate::gathering::{self, Plan};
use crate::map::ResourceKind;
use crate::math::Tile;
use crate::unit::{UnitId, UnitJob};
use crate::world::World;

/// Cargo credited at a dropoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Who delivered.
    pub unit: UnitId,
    /// What was delivered; `None` if the cargo kind was unknown.
    pub kind: Option<ResourceKind>,
    /// How much was credited.
    pub amount: i32,
}

/// Events generated during a simulation tick.
///
/// The host uses these for logging and presentation; the world does not
/// depend on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Units trained this tick.
    pub spawned: Vec<UnitId>,
    /// Buildings finished this tick.
    pub completed: Vec<BuildingId>,
    /// Cargo delivered this tick.
    pub deliveries: Vec<Delivery>,
    /// Resource tiles drained this tick.
    pub exhausted: Vec<Tile>,
    /// Builders sent back to idle this tick.
    pub released: Vec<UnitId>,
}

impl TickEvents {
    /// Whether nothing noteworthy happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
            && self.completed.is_empty()
            && self.deliveries.is_empty()
            && self.exhausted.is_empty()
            && self.released.is_empty()
    }

    /// Append the events of a later tick.
    pub fn merge(&mut self, later: TickEvents) {
        self.spawned.extend(later.spawned);
        self.completed.extend(later.completed);
        self.deliveries.extend(later.deliveries);
        self.exhausted.extend(later.exhausted);
        self.released.extend(later.released);
    }
}

impl World {
    /// Advance the world by one tick of `dt_ms` milliseconds.
    pub fn step(&mut self, dt_ms: u32) -> TickEvents {
        let mut events = TickEvents::default();

        // Units spawned during this tick are not updated until the next one.
        let unit_count = self.units.len();
        for slot in 0..unit_count {
            let plan = gathering::plan(&self.map, &self.dropoffs, &self.units[slot]);
            self.apply_plan(slot, plan, &mut events);
        }

        let ids: Vec<BuildingId> = self.buildings.keys().copied().collect();
        for id in ids {
            if self.advance_construction(id, dt_ms) {
                events.completed.push(id);
            }
            if let Some(unit) = self.advance_production(id, dt_ms) {
                events.spawned.push(unit);
            }
        }

        events.released = self.relax_builders();
        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "World state hash");
        }

        #[cfg(feature = "debug-validation")]
        debug_assert!(self.map.ledger_is_consistent(), "resource ledger out of sync");

        events
    }

    fn apply_plan(&mut self, slot: usize, plan: Plan, events: &mut TickEvents) {
        match plan {
            Plan::Hold => {}
            Plan::Advance(next) => {
                let unit = &mut self.units[slot];
                unit.tile = next;
                unit.path.pop_front();
            }
            Plan::DropPath => self.units[slot].path.clear(),
            Plan::Idle => self.units[slot].job = UnitJob::Idle,
            Plan::Harvest { resource, kind } => {
                let Some(taken) = self.map.resource_take_at(resource, HARVEST_QUANTUM) else {
                    return;
                };
                if !self.map.has_resource(resource, kind) {
                    tracing::debug!(tile = %resource, ?kind, "Resource exhausted");
                    events.exhausted.push(resource);
                }
                let unit = &mut self.units[slot];
                unit.carried += taken;
                unit.carried_kind = Some(kind);

                let next = gathering::plan_after_harvest(
                    &self.map,
                    &self.dropoffs,
                    &self.units[slot],
                    resource,
                    kind,
                );
                debug_assert!(!matches!(next, Plan::Harvest { .. } | Plan::Deposit { .. }));
                self.apply_plan(slot, next, events);
            }
            Plan::Walk { job, goal } => {
                let path = self.path_between(self.units[slot].tile, goal);
                let unit = &mut self.units[slot];
                unit.job = job;
                unit.goal = goal;
                unit.set_path(path);
            }
            Plan::Deposit { resume } => {
                let unit = &self.units[slot];
                let (id, kind, carried) = (unit.id, unit.carried_kind, unit.carried);
                let amount = self.economy.deposit(kind, carried);
                events.deliveries.push(Delivery {
                    unit: id,
                    kind,
                    amount,
                });
                self.units[slot].carried = 0;

                match resume {
                    Some((job, stand)) => {
                        self.apply_plan(slot, Plan::Walk { job, goal: stand }, events);
                    }
                    None => {
                        let unit = &mut self.units[slot];
                        unit.carried_kind = None;
                        unit.job = UnitJob::Idle;
                    }
                }
            }
        }
    }
}
