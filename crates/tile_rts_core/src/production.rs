//! Barracks production queues.
//!
//! Training reserves gold, wood and food up front. Cancelling a queued unit
//! returns all three; a trained unit keeps its food.

use crate::building::{Building, BuildingId, BuildingKind, TrainItem};
use crate::error::{GameError, Result};
use crate::math::Tile;
use crate::unit::UnitId;
use crate::world::World;

/// Rings searched outward from a footprint for a free spawn tile.
const SPAWN_RINGS: i32 = 4;

impl World {
    /// Queue up to `count` units of `unit_type` at a barracks.
    ///
    /// Each unit is paid for as it is queued; the batch stops at the first
    /// one that cannot be afforded. Returns how many were queued. Fails if
    /// none were.
    pub fn queue_train(&mut self, building: BuildingId, unit_type: &str, count: u32) -> Result<u32> {
        let kind = self
            .find_building(building)
            .ok_or(GameError::UnknownBuilding(building))?
            .kind;
        if kind != BuildingKind::Barracks {
            return Err(GameError::NotABarracks(building));
        }
        let index = self
            .unit_types
            .lookup(unit_type)
            .ok_or_else(|| GameError::UnknownUnitType(unit_type.to_string()))?;
        let Some(ty) = self.unit_types.get(index) else {
            return Err(GameError::UnknownUnitType(unit_type.to_string()));
        };
        if count == 0 {
            return Err(GameError::QueueEmpty(building));
        }

        let mut queued = 0;
        let mut refusal = None;
        for _ in 0..count {
            if let Err(e) = self.economy.reserve_unit(ty) {
                refusal = Some(e);
                break;
            }
            queued += 1;
        }

        if queued > 0 {
            let item = TrainItem {
                unit_type: index,
                remaining_ms: ty.build_time_ms,
            };
            let queue = &mut self.building_mut(building)?.queue;
            queue.extend(std::iter::repeat(item).take(queued as usize));
            tracing::info!(%building, unit_type, queued, requested = count, "Training queued");
        }
        match refusal {
            Some(e) if queued == 0 => Err(e),
            _ => Ok(queued),
        }
    }

    /// Drop the last queued unit and refund it.
    pub fn cancel_last_train(&mut self, building: BuildingId) -> Result<()> {
        let len = self.barracks_queue_len(building)?;
        self.cancel_train_at(building, len.saturating_sub(1))
    }

    /// Drop the queued unit at `index` and refund it.
    pub fn cancel_train_at(&mut self, building: BuildingId, index: usize) -> Result<()> {
        let len = self.barracks_queue_len(building)?;
        if len == 0 {
            return Err(GameError::QueueEmpty(building));
        }
        if index >= len {
            return Err(GameError::QueueIndexOutOfRange { index, len });
        }

        let item = self
            .building_mut(building)?
            .queue
            .remove(index)
            .ok_or(GameError::QueueIndexOutOfRange { index, len })?;
        if let Some(ty) = self.unit_types.get(item.unit_type) {
            self.economy.release_unit(ty);
        }
        tracing::debug!(%building, index, "Training cancelled");
        Ok(())
    }

    fn barracks_queue_len(&self, building: BuildingId) -> Result<usize> {
        let b = self
            .find_building(building)
            .ok_or(GameError::UnknownBuilding(building))?;
        if b.kind != BuildingKind::Barracks {
            return Err(GameError::NotABarracks(building));
        }
        Ok(b.queue.len())
    }

    /// Count down the head of a finished barracks' queue and spawn the unit
    /// when it is done. Returns the new unit.
    pub(crate) fn advance_production(&mut self, id: BuildingId, dt_ms: u32) -> Option<UnitId> {
        let building = self.buildings.get_mut(&id)?;
        if building.kind != BuildingKind::Barracks || !building.is_complete() {
            return None;
        }
        let head = building.queue.front_mut()?;
        head.remaining_ms = head
            .remaining_ms
            .saturating_sub(i32::try_from(dt_ms).unwrap_or(i32::MAX));
        if head.remaining_ms > 0 {
            return None;
        }
        let item = building.queue.pop_front()?;

        let building = self.buildings.get(&id)?;
        let rally = building.rally;
        let spawn = self.find_spawn_tile(building);
        let unit = self.spawn_unit_of(item.unit_type, spawn)?;
        if let Some(rally) = rally {
            if let Err(e) = self.order_move(unit, rally) {
                tracing::warn!(%unit, error = %e, "Rally order failed");
            }
        }
        tracing::info!(building = %id, %unit, tile = %spawn, "Unit trained");
        Some(unit)
    }

    /// First walkable tile found scanning rings around the footprint, or the
    /// building's own tile if every ring is full.
    #[must_use]
    pub fn find_spawn_tile(&self, building: &Building) -> Tile {
        (0..SPAWN_RINGS)
            .flat_map(|r| building.ring_scan(r))
            .find(|&t| self.map.is_walkable(t))
            .unwrap_or(building.tile)
    }
}
