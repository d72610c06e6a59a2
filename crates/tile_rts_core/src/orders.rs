//! Player orders to units and buildings.
//!
//! Orders resolve synchronously, path search included. An unreachable goal
//! is not an error: the unit gets an empty path and sorts itself out on the
//! next tick.

use crate::building::BuildingId;
use crate::error::{GameError, Result};
use crate::gathering::{find_nearest_resource, find_stand_tile};
use crate::map::ResourceKind;
use crate::math::Tile;
use crate::unit::{UnitId, UnitJob};
use crate::world::World;

impl World {
    /// Walk to `goal`.
    pub fn order_move(&mut self, unit: UnitId, goal: Tile) -> Result<()> {
        let from = self.unit(unit).ok_or(GameError::UnknownUnit(unit))?.tile;
        let path = self.path_between(from, goal);

        let u = self.unit_mut(unit)?;
        u.goal = goal;
        u.job = UnitJob::Moving;
        u.building_target = None;
        u.set_path(path);
        tracing::debug!(%unit, %goal, steps = u.path.len(), "Move order");
        Ok(())
    }

    /// Gather the resource at `target`.
    ///
    /// The kind comes from the live ledger, or from the terrain if the ledger
    /// holds nothing there. Without a kind the unit goes idle and forgets its
    /// cargo kind. If `target` is drained or cannot be stood next to, the
    /// nearest resource of the same kind anywhere on the map is used
    /// instead; if there is none the unit goes idle.
    pub fn order_gather(&mut self, unit: UnitId, target: Tile) -> Result<()> {
        let from = self.unit(unit).ok_or(GameError::UnknownUnit(unit))?.tile;

        let kind = match self.map.resource_kind(target) {
            ResourceKind::None => self
                .map
                .terrain(target)
                .map_or(ResourceKind::None, |t| t.resource()),
            kind => kind,
        };
        let Some(job) = UnitJob::gathering(kind) else {
            let u = self.unit_mut(unit)?;
            u.job = UnitJob::Idle;
            u.carried_kind = None;
            return Ok(());
        };

        let stand = if self.map.has_resource(target, kind) {
            find_stand_tile(&self.map, target, from)
        } else {
            None
        }
        .or_else(|| find_nearest_resource(&self.map, from, kind).map(|t| t.stand));
        let path = stand.map(|s| self.path_between(from, s));

        let u = self.unit_mut(unit)?;
        u.carried_kind = Some(kind);
        u.building_target = None;
        let (Some(stand), Some(path)) = (stand, path) else {
            u.job = UnitJob::Idle;
            tracing::debug!(%unit, %target, ?kind, "Nothing left to gather");
            return Ok(());
        };
        u.job = job;
        u.goal = stand;
        u.set_path(path);
        tracing::debug!(%unit, %target, %stand, ?kind, "Gather order");
        Ok(())
    }

    /// Send a unit to work on an unfinished building.
    ///
    /// The unit walks to the walkable tile just outside the footprint that
    /// is nearest to it.
    pub fn order_build(&mut self, unit: UnitId, building: BuildingId) -> Result<()> {
        let from = self.unit(unit).ok_or(GameError::UnknownUnit(unit))?.tile;
        let site = self
            .find_building(building)
            .ok_or(GameError::UnknownBuilding(building))?;
        if site.is_complete() {
            return Err(GameError::BuildingComplete(building));
        }

        let mut goal: Option<(i32, Tile)> = None;
        for tile in site.ring_scan(0) {
            if site.distance_to(tile) != 1 || !self.map.is_walkable(tile) {
                continue;
            }
            let dist = tile.manhattan(from);
            if goal.map_or(true, |(best, _)| dist < best) {
                goal = Some((dist, tile));
            }
        }
        let goal = goal.map_or(from, |(_, tile)| tile);
        let path = self.path_between(from, goal);

        let u = self.unit_mut(unit)?;
        u.job = UnitJob::Building;
        u.building_target = Some(building);
        u.goal = goal;
        u.set_path(path);
        tracing::debug!(%unit, %building, %goal, "Build order");
        Ok(())
    }

    /// Set or clear where freshly trained units walk to.
    pub fn set_rally(&mut self, building: BuildingId, rally: Option<Tile>) -> Result<()> {
        self.building_mut(building)?.rally = rally;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::building::BuildingKind;
    use crate::map::Map;
    use crate::unit::UnitType;

    use super::*;

    fn world(rows: &[&str]) -> World {
        let mut world = World::default();
        world.load_data(
            vec![UnitType {
                id: "peon".into(),
                hp: 30,
                ..Default::default()
            }],
            Map::from_rows(rows).unwrap(),
        );
        world.init_resources_from_tiles(300, 500);
        world
    }

    #[test]
    fn test_move_sets_path_and_job() {
        let mut w = world(&["......", "......"]);
        let id = w.spawn_unit("peon", Tile::new(0, 0)).unwrap();
        w.order_move(id, Tile::new(4, 1)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::Moving);
        assert_eq!(u.goal, Tile::new(4, 1));
        assert_eq!(u.path.len(), 4);
        assert_eq!(u.path.back(), Some(&Tile::new(4, 1)));
    }

    #[test]
    fn test_move_unreachable_leaves_empty_path() {
        let mut w = world(&["..#..", "..#..", "..#.."]);
        let id = w.spawn_unit("peon", Tile::new(0, 0)).unwrap();
        w.order_move(id, Tile::new(4, 0)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::Moving);
        assert!(u.path.is_empty());
    }

    #[test]
    fn test_move_unknown_unit() {
        let mut w = world(&["..."]);
        assert!(matches!(
            w.order_move(UnitId(42), Tile::new(0, 0)),
            Err(GameError::UnknownUnit(UnitId(42)))
        ));
    }

    #[test]
    fn test_gather_paths_to_stand_tile() {
        let mut w = world(&["......T", "......."]);
        let id = w.spawn_unit("peon", Tile::new(0, 1)).unwrap();
        w.order_gather(id, Tile::new(6, 0)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::GatheringWood);
        assert_eq!(u.carried_kind, Some(ResourceKind::Wood));
        assert_eq!(u.goal, Tile::new(5, 1));
        assert_eq!(u.path.back(), Some(&Tile::new(5, 1)));
    }

    #[test]
    fn test_gather_falls_back_to_terrain_kind() {
        let mut w = World::default();
        w.load_data(
            vec![UnitType {
                id: "peon".into(),
                ..Default::default()
            }],
            Map::from_rows(&["G....", "....."]).unwrap(),
        );
        let id = w.spawn_unit("peon", Tile::new(3, 1)).unwrap();

        // Ledger never seeded: the kind still comes from terrain, but there
        // is nothing to harvest anywhere.
        w.order_gather(id, Tile::new(0, 0)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.carried_kind, Some(ResourceKind::Gold));
        assert_eq!(u.job, UnitJob::Idle);
    }

    #[test]
    fn test_gather_on_grass_goes_idle() {
        let mut w = world(&["T....", "....."]);
        let id = w.spawn_unit("peon", Tile::new(2, 1)).unwrap();
        w.order_gather(id, Tile::new(0, 0)).unwrap();
        w.order_gather(id, Tile::new(3, 1)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::Idle);
        assert_eq!(u.carried_kind, None);
    }

    #[test]
    fn test_gather_enclosed_target_uses_other_tile() {
        let mut w = world(&["###..", "#T#..", "###.T", "....."]);
        let id = w.spawn_unit("peon", Tile::new(4, 3)).unwrap();
        w.order_gather(id, Tile::new(1, 1)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::GatheringWood);
        assert_eq!(u.goal.chebyshev(Tile::new(4, 2)), 1);
    }

    #[test]
    fn test_gather_with_nothing_left_goes_idle_keeping_kind() {
        let mut w = world(&["###..", "#T#..", "###..", "....."]);
        let id = w.spawn_unit("peon", Tile::new(4, 3)).unwrap();
        w.order_gather(id, Tile::new(1, 1)).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::Idle);
        assert_eq!(u.carried_kind, Some(ResourceKind::Wood));
    }

    #[test]
    fn test_build_order_targets_ring() {
        let mut w = world(&["........", "........", "........", "........"]);
        w.economy_mut().wood = 100;
        let site = w.start_building(BuildingKind::Barracks, Tile::new(4, 1)).unwrap();
        let id = w.spawn_unit("peon", Tile::new(0, 0)).unwrap();
        w.order_build(id, site).unwrap();
        let u = w.unit(id).unwrap();
        assert_eq!(u.job, UnitJob::Building);
        assert_eq!(u.building_target, Some(site));
        assert_eq!(u.goal, Tile::new(3, 0));
    }

    #[test]
    fn test_build_order_rejects_unknown_building() {
        let mut w = world(&["...."]);
        let id = w.spawn_unit("peon", Tile::new(0, 0)).unwrap();
        assert!(matches!(
            w.order_build(id, BuildingId(9)),
            Err(GameError::UnknownBuilding(BuildingId(9)))
        ));
        assert_eq!(w.unit(id).unwrap().job, UnitJob::Idle);
    }

    #[test]
    fn test_rally() {
        let mut w = world(&["....", "...."]);
        let site = w.start_building(BuildingKind::Dropoff, Tile::new(1, 1)).unwrap();
        w.set_rally(site, Some(Tile::new(3, 0))).unwrap();
        assert_eq!(w.find_building(site).unwrap().rally, Some(Tile::new(3, 0)));
        assert!(w.set_rally(BuildingId(77), None).is_err());
    }
}
