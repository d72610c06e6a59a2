//! End-to-end gameplay scenarios driven through the public world API.

use tile_rts_core::building::{BuildState, BuildingKind};
use tile_rts_core::economy::CARRY_CAPACITY;
use tile_rts_core::error::GameError;
use tile_rts_core::map::{ResourceKind, Terrain};
use tile_rts_core::math::Tile;
use tile_rts_core::unit::UnitJob;
use tile_rts_test_utils::fixtures::{
    construction_world, demo_world, first_worker, run_ticks, world, TICK_MS,
};

// =============================================================================
// Gathering
// =============================================================================

#[test]
fn worker_fills_up_after_ten_harvests() {
    let mut w = world(&["T.....", "......", "D....."]);
    let worker = w.spawn_unit("worker", Tile::new(1, 0)).unwrap();
    w.order_gather(worker, Tile::new(0, 0)).unwrap();

    run_ticks(&mut w, 10);
    let u = w.unit(worker).unwrap();
    assert_eq!(u.carried, CARRY_CAPACITY);
    assert_eq!(u.job, UnitJob::Delivering);
    assert_eq!(u.goal, Tile::new(0, 2));
    assert_eq!(w.map().resource_amount(Tile::new(0, 0)), 280);
}

#[test]
fn gold_is_credited_and_worker_returns() {
    let mut w = world(&["D...G", "....."]);
    let worker = first_worker(&w);
    w.order_gather(worker, Tile::new(4, 0)).unwrap();

    let mut delivered = 0;
    for _ in 0..60 {
        delivered += w
            .step(TICK_MS)
            .deliveries
            .iter()
            .map(|d| d.amount)
            .sum::<i32>();
    }
    assert!(delivered >= 40, "delivered {delivered}");
    assert_eq!(w.economy().gold, 500 + delivered);
    assert_eq!(w.unit(worker).unwrap().carried_kind, Some(ResourceKind::Gold));
}

#[test]
fn exhausted_forest_turns_to_grass_and_worker_moves_on() {
    let mut w = world(&["TT....", "......", "D....."]);
    w.resource_take_at(Tile::new(1, 0), 296);
    let worker = w.spawn_unit("worker", Tile::new(2, 1)).unwrap();
    w.order_gather(worker, Tile::new(1, 0)).unwrap();

    let mut exhausted = Vec::new();
    for _ in 0..3 {
        exhausted.extend(w.step(TICK_MS).exhausted);
    }
    assert_eq!(exhausted, vec![Tile::new(1, 0)]);
    assert_eq!(w.map().terrain(Tile::new(1, 0)), Some(Terrain::Grass));
    assert_eq!(w.map().resource_kind(Tile::new(1, 0)), ResourceKind::None);
    assert!(w.map().is_walkable(Tile::new(1, 0)));

    let u = w.unit(worker).unwrap();
    assert_eq!(u.job, UnitJob::GatheringWood);
    assert_eq!(u.carried, 4);
    assert_eq!(u.goal.chebyshev(Tile::new(0, 0)), 1);
}

#[test]
fn gatherer_without_dropoff_unloads_in_place() {
    let mut w = world(&["T....", "....."]);
    let worker = w.spawn_unit("worker", Tile::new(1, 1)).unwrap();
    w.order_gather(worker, Tile::new(0, 0)).unwrap();

    run_ticks(&mut w, 10);
    let u = w.unit(worker).unwrap();
    assert_eq!(u.job, UnitJob::Delivering);
    assert_eq!(u.carried, CARRY_CAPACITY);

    let events = w.step(TICK_MS);
    assert_eq!(events.deliveries.len(), 1);
    assert_eq!(w.economy().wood, CARRY_CAPACITY);

    let u = w.unit(worker).unwrap();
    assert_eq!(u.carried, 0);
    assert_eq!(u.tile, Tile::new(1, 1));
    assert_eq!(u.job, UnitJob::GatheringWood);
}

// =============================================================================
// Construction and production
// =============================================================================

#[test]
fn barracks_builds_then_trains_footmen() {
    let (mut w, site) = construction_world();
    run_ticks(&mut w, 200);
    assert_eq!(w.find_building(site).unwrap().state, BuildState::Complete);
    assert!(w
        .units()
        .iter()
        .all(|u| u.job != UnitJob::Building && u.building_target.is_none()));

    w.economy_mut().gold = 300;
    w.economy_mut().wood = 100;
    assert_eq!(w.queue_train(site, "footman", 5).unwrap(), 3);
    assert_eq!(w.find_building(site).unwrap().queue.len(), 3);

    w.set_rally(site, Some(Tile::new(14, 9))).unwrap();
    let before = w.units().len();
    let mut spawned = Vec::new();
    for _ in 0..100 {
        spawned.extend(w.step(TICK_MS).spawned);
    }
    assert_eq!(spawned.len(), 3);
    assert_eq!(w.units().len(), before + 3);
    assert_eq!(w.economy().food_used, 6);
    let last = w.unit(spawned[2]).unwrap();
    assert_eq!(last.goal, Tile::new(14, 9));
}

#[test]
fn dropoff_built_in_the_field_shortens_trips() {
    let mut w = demo_world();
    let site = w
        .start_building(BuildingKind::Dropoff, Tile::new(11, 3))
        .unwrap();
    let worker = first_worker(&w);
    w.order_build(worker, site).unwrap();
    run_ticks(&mut w, 60);

    assert!(w.find_building(site).unwrap().is_complete());
    assert_eq!(w.dropoffs(), &[Tile::new(1, 1), Tile::new(11, 3)]);
    assert_eq!(w.nearest_dropoff(Tile::new(12, 2)), Some(Tile::new(11, 3)));
    assert_eq!(w.unit(worker).unwrap().job, UnitJob::Idle);
}

#[test]
fn builder_released_when_site_cancelled() {
    let (mut w, site) = construction_world();
    run_ticks(&mut w, 5);
    w.cancel_building(site, true).unwrap();
    assert_eq!(w.economy().gold, 500);
    assert_eq!(w.economy().wood, 200);

    let events = w.step(TICK_MS);
    assert_eq!(events.released.len(), 2);
    assert!(w.units().iter().all(|u| u.job == UnitJob::Idle));
}

#[test]
fn farm_raises_food_cap_for_training() {
    let mut w = world(&["D.........", ".........."]);
    w.economy_mut().gold = 1000;
    w.economy_mut().wood = 500;
    let barracks = w
        .start_building(BuildingKind::Barracks, Tile::new(5, 0))
        .unwrap();
    let farm = w.start_building(BuildingKind::Farm, Tile::new(8, 1)).unwrap();
    let a = w.spawn_unit("worker", Tile::new(4, 0)).unwrap();
    let b = w.spawn_unit("worker", Tile::new(7, 1)).unwrap();
    w.order_build(a, barracks).unwrap();
    w.order_build(b, farm).unwrap();
    run_ticks(&mut w, 120);
    assert_eq!(w.economy().food_cap, 14);

    let queued = w.queue_train(barracks, "footman", 10).unwrap();
    assert_eq!(queued, 7);
    assert!(matches!(
        w.queue_train(barracks, "worker", 1),
        Err(GameError::FoodCapExceeded { .. })
    ));
}
