//! Building placement, construction progress and builder release.
//!
//! Placing a building reserves its cost and blocks its footprint in one
//! step. Progress only accrues while assigned builders stand on the ring
//! around the footprint; each extra builder adds three quarters of a
//! builder's speed.

use crate::building::{building_type, BuildState, Building, BuildingId, BuildingKind};
use crate::error::{GameError, Result};
use crate::map::Terrain;
use crate::math::{fx_from_int, fx_scale_int, Fx, Tile};
use crate::unit::{UnitId, UnitJob};
use crate::world::World;

/// Speed added by each builder after the first (0.75).
const EXTRA_BUILDER_SPEED: Fx = Fx::from_bits(0xC000);

/// Construction speed multiplier for `workers` adjacent builders.
///
/// One builder works at 1.0; each further builder adds 0.75.
#[must_use]
pub fn construction_speed(workers: usize) -> Fx {
    let extra = i32::try_from(workers.saturating_sub(1)).unwrap_or(i32::MAX);
    fx_from_int(1).saturating_add(EXTRA_BUILDER_SPEED.saturating_mul_int(extra))
}

impl World {
    /// Whether every footprint tile of `kind` placed at `tile` is in bounds,
    /// unblocked and bare grass.
    #[must_use]
    pub fn can_place_building(&self, kind: BuildingKind, tile: Tile) -> bool {
        let ty = building_type(kind);
        (0..ty.h).all(|dy| {
            (0..ty.w).all(|dx| {
                let t = tile.offset(dx, dy);
                !self.map.is_blocked(t) && self.map.terrain(t) == Some(Terrain::Grass)
            })
        })
    }

    /// Place a new building, paying for it and blocking its footprint.
    pub fn start_building(&mut self, kind: BuildingKind, tile: Tile) -> Result<BuildingId> {
        let ty = building_type(kind);
        if !self.economy.can_afford(ty.cost_gold, ty.cost_wood) {
            return Err(GameError::InsufficientResources {
                gold: ty.cost_gold,
                wood: ty.cost_wood,
                have_gold: self.economy.gold,
                have_wood: self.economy.wood,
            });
        }
        if !self.can_place_building(kind, tile) {
            return Err(GameError::InvalidPlacement {
                x: tile.x,
                y: tile.y,
            });
        }
        self.economy.spend(ty.cost_gold, ty.cost_wood)?;

        let id = BuildingId(self.next_building_id);
        self.next_building_id += 1;
        self.map.set_blocked_rect(tile, ty.w, ty.h, true);
        self.buildings.insert(id, Building::planned(id, &ty, tile));

        tracing::info!(building = %id, ?kind, %tile, "Building placed");
        Ok(id)
    }

    /// Cancel a building, optionally refunding its cost.
    ///
    /// Costs are refunded only if `refund` is set and the building was not
    /// finished. Queued units always give back their food; their gold and
    /// wood follow `refund`.
    pub fn cancel_building(&mut self, id: BuildingId, refund: bool) -> Result<()> {
        let building = self.take_building(id, refund)?;
        tracing::info!(building = %id, kind = ?building.kind, refund, "Building cancelled");
        Ok(())
    }

    /// Remove a building, optionally refunding its cost.
    ///
    /// Like [`cancel_building`](Self::cancel_building), and a finished
    /// dropoff is also taken out of the dropoff registry.
    pub fn remove_building(&mut self, id: BuildingId, refund: bool) -> Result<()> {
        let building = self.take_building(id, refund)?;
        if building.is_complete() && building.kind == BuildingKind::Dropoff {
            if let Some(pos) = self.dropoffs.iter().position(|&d| d == building.tile) {
                self.dropoffs.remove(pos);
            }
        }
        tracing::info!(building = %id, kind = ?building.kind, refund, "Building removed");
        Ok(())
    }

    fn take_building(&mut self, id: BuildingId, refund: bool) -> Result<Building> {
        let building = self
            .buildings
            .remove(&id)
            .ok_or(GameError::UnknownBuilding(id))?;

        self.map
            .set_blocked_rect(building.tile, building.w, building.h, false);
        if refund && !building.is_complete() {
            self.economy.refund(building.cost_gold, building.cost_wood);
        }
        for item in &building.queue {
            if let Some(ty) = self.unit_types.get(item.unit_type) {
                self.economy.food_used -= ty.food;
                if refund {
                    self.economy.refund(ty.cost_gold, ty.cost_wood);
                }
            }
        }
        Ok(building)
    }

    /// Number of units assigned to `building` that stand right next to it.
    #[must_use]
    pub fn adjacent_builders(&self, building: &Building) -> usize {
        self.units
            .iter()
            .filter(|u| {
                u.job == UnitJob::Building
                    && u.building_target == Some(building.id)
                    && building.distance_to(u.tile) == 1
            })
            .count()
    }

    /// Advance construction of one building by `dt_ms`.
    ///
    /// Returns `true` if the building completed on this call.
    pub(crate) fn advance_construction(&mut self, id: BuildingId, dt_ms: u32) -> bool {
        let Some(building) = self.buildings.get(&id) else {
            return false;
        };
        if building.is_complete() {
            return false;
        }
        let workers = self.adjacent_builders(building);
        if workers == 0 {
            return false;
        }

        let step = fx_scale_int(dt_ms, construction_speed(workers));
        let Some(building) = self.buildings.get_mut(&id) else {
            return false;
        };
        building.state = BuildState::Constructing;
        building.build_progress_ms = building
            .build_progress_ms
            .saturating_add(i32::try_from(step).unwrap_or(i32::MAX));
        if building.build_progress_ms < building.build_total_ms {
            return false;
        }

        building.state = BuildState::Complete;
        let (kind, tile, w, h) = (building.kind, building.tile, building.w, building.h);
        match kind {
            BuildingKind::Dropoff => {
                self.dropoffs.push(tile);
                self.map.set_terrain(tile, Terrain::Dropoff);
                self.map.set_blocked_rect(tile, w, h, false);
            }
            BuildingKind::Farm => {
                self.economy.food_cap += building_type(kind).food_cap_bonus;
            }
            BuildingKind::Barracks => {}
        }
        tracing::info!(building = %id, ?kind, tick = self.tick, "Building complete");
        true
    }

    /// Release builders whose site is gone or finished.
    ///
    /// Released units go idle with no target and no path. Runs at the end of
    /// every [`step`](Self::step); hosts may also call it right after
    /// cancelling or removing a building.
    pub fn relax_builders(&mut self) -> Vec<UnitId> {
        let mut released = Vec::new();
        for unit in &mut self.units {
            if unit.job != UnitJob::Building {
                continue;
            }
            let active = unit
                .building_target
                .and_then(|id| self.buildings.get(&id))
                .is_some_and(|b| !b.is_complete());
            if active {
                continue;
            }
            unit.job = UnitJob::Idle;
            unit.building_target = None;
            unit.path.clear();
            released.push(unit.id);
        }
        if !released.is_empty() {
            tracing::debug!(count = released.len(), "Builders released");
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Map;
    use crate::unit::UnitType;

    fn world(rows: &[&str]) -> World {
        let mut world = World::default();
        world.load_data(
            vec![UnitType {
                id: "peon".into(),
                hp: 30,
                food: 1,
                cost_gold: 40,
                ..Default::default()
            }],
            Map::from_rows(rows).unwrap(),
        );
        world.init_resources_from_tiles(300, 500);
        world
    }

    fn open(w: usize, h: usize) -> World {
        let row = ".".repeat(w);
        let rows: Vec<&str> = (0..h).map(|_| row.as_str()).collect();
        world(&rows)
    }

    /// Put a builder on the ring and assign it.
    fn assign(world: &mut World, site: BuildingId, at: Tile) -> UnitId {
        let id = world.spawn_unit("peon", at).unwrap();
        world.order_build(id, site).unwrap();
        id
    }

    #[test]
    fn test_speed_multiplier() {
        assert_eq!(construction_speed(1), fx_from_int(1));
        assert_eq!(construction_speed(2).to_bits(), 0x0001_C000);
        assert_eq!(construction_speed(3).to_bits(), 0x0002_8000);
        assert_eq!(construction_speed(0), fx_from_int(1));
    }

    #[test]
    fn test_placement_rules() {
        let mut w = world(&["....T", ".#...", "....."]);
        assert!(w.can_place_building(BuildingKind::Barracks, Tile::new(2, 1)));
        assert!(!w.can_place_building(BuildingKind::Barracks, Tile::new(0, 0)), "wall");
        assert!(!w.can_place_building(BuildingKind::Barracks, Tile::new(3, 0)), "forest");
        assert!(!w.can_place_building(BuildingKind::Barracks, Tile::new(3, 2)), "off map");

        w.economy_mut().wood = 200;
        w.start_building(BuildingKind::Barracks, Tile::new(2, 1)).unwrap();
        assert!(!w.can_place_building(BuildingKind::Farm, Tile::new(3, 2)), "blocked");
    }

    #[test]
    fn test_start_building_is_atomic() {
        let mut w = open(6, 6);
        let before = *w.economy();

        let err = w.start_building(BuildingKind::Farm, Tile::new(9, 9)).unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));

        w.economy_mut().wood = 40;
        let err = w.start_building(BuildingKind::Farm, Tile::new(9, 9)).unwrap_err();
        assert!(matches!(err, GameError::InvalidPlacement { x: 9, y: 9 }));
        assert_eq!(w.economy().gold, before.gold);
        assert_eq!(w.economy().wood, 40);

        let id = w.start_building(BuildingKind::Farm, Tile::new(1, 1)).unwrap();
        assert_eq!((w.economy().gold, w.economy().wood), (before.gold - 60, 0));
        assert!(w.map().is_blocked(Tile::new(1, 1)));
        assert_eq!(w.find_building(id).unwrap().state, BuildState::Planned);
    }

    #[test]
    fn test_single_builder_completes_farm() {
        let mut w = open(6, 6);
        w.economy_mut().wood = 40;
        let site = w.start_building(BuildingKind::Farm, Tile::new(2, 2)).unwrap();
        assign(&mut w, site, Tile::new(1, 2));

        for _ in 0..23 {
            w.step(50);
        }
        let b = w.find_building(site).unwrap();
        assert_eq!(b.state, BuildState::Constructing);
        assert_eq!(b.build_progress_ms, 1150);

        w.step(50);
        assert!(w.find_building(site).unwrap().is_complete());
        assert_eq!(w.economy().food_cap, 14);
    }

    #[test]
    fn test_two_builders_build_faster() {
        let mut w = open(6, 6);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(2, 2)).unwrap();
        assign(&mut w, site, Tile::new(1, 2));
        assign(&mut w, site, Tile::new(3, 3));

        w.step(50);
        assert_eq!(w.find_building(site).unwrap().build_progress_ms, 87);
    }

    #[test]
    fn test_distant_builder_does_not_count() {
        let mut w = open(8, 8);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(2, 2)).unwrap();
        let far = w.spawn_unit("peon", Tile::new(6, 6)).unwrap();
        w.order_build(far, site).unwrap();
        w.step(50);
        let b = w.find_building(site).unwrap();
        assert_eq!(b.state, BuildState::Planned);
        assert_eq!(b.build_progress_ms, 0);
    }

    #[test]
    fn test_dropoff_completion_registers_and_unblocks() {
        let mut w = open(5, 5);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(2, 2)).unwrap();
        let builder = assign(&mut w, site, Tile::new(1, 1));
        for _ in 0..30 {
            w.step(50);
        }
        assert!(w.find_building(site).unwrap().is_complete());
        assert_eq!(w.dropoffs(), &[Tile::new(2, 2)]);
        assert_eq!(w.map().terrain(Tile::new(2, 2)), Some(Terrain::Dropoff));
        assert!(!w.map().is_blocked(Tile::new(2, 2)));

        let u = w.unit(builder).unwrap();
        assert_eq!(u.job, UnitJob::Idle);
        assert_eq!(u.building_target, None);

        w.remove_building(site, true).unwrap();
        assert!(w.dropoffs().is_empty());
        assert_eq!(w.economy().gold, 500 - 120, "no refund once complete");
    }

    #[test]
    fn test_cancel_refunds_and_releases() {
        let mut w = open(6, 6);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(2, 2)).unwrap();
        let builder = assign(&mut w, site, Tile::new(1, 2));
        w.cancel_building(site, true).unwrap();

        assert_eq!(w.economy().gold, 500);
        assert!(!w.map().is_blocked(Tile::new(2, 2)));
        assert!(w.find_building(site).is_none());

        assert_eq!(w.relax_builders(), vec![builder]);
        assert_eq!(w.unit(builder).unwrap().job, UnitJob::Idle);
        assert!(w.relax_builders().is_empty());
    }

    #[test]
    fn test_cancel_without_refund() {
        let mut w = open(6, 6);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(2, 2)).unwrap();
        w.cancel_building(site, false).unwrap();
        assert_eq!(w.economy().gold, 380);
    }

    #[test]
    fn test_unknown_building_changes_nothing() {
        let mut w = open(4, 4);
        let hash = w.state_hash();
        assert!(matches!(
            w.cancel_building(BuildingId(5), true),
            Err(GameError::UnknownBuilding(BuildingId(5)))
        ));
        assert!(w.remove_building(BuildingId(5), true).is_err());
        assert_eq!(w.state_hash(), hash);
    }

    #[test]
    fn test_removing_barracks_returns_queue() {
        let mut w = open(8, 8);
        w.economy_mut().wood = 80;
        let site = w.start_building(BuildingKind::Barracks, Tile::new(2, 2)).unwrap();
        assert_eq!(w.queue_train(site, "peon", 2).unwrap(), 2);
        assert_eq!(w.economy().food_used, 2);
        assert_eq!(w.economy().gold, 500 - 150 - 80);

        w.remove_building(site, false).unwrap();
        assert_eq!(w.economy().food_used, 0);
        assert_eq!(w.economy().gold, 500 - 150 - 80);
    }
}
