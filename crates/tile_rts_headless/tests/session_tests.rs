//! End-to-end protocol sessions against assets on disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tile_rts_core::building::BuildState;
use tile_rts_core::unit::UnitJob;
use tile_rts_headless::protocol::WorldState;
use tile_rts_headless::{HeadlessConfig, HeadlessRunner, Response};
use tile_rts_test_utils::fixtures::DEMO_MAP;

const UNITS_CSV: &str = "\
id,hp,move_speed,attack_type,damage,cooldown_ms,range,armor_type,armor,sight,cost_gold,cost_wood,food,build_time_ms
worker,30,64,Normal,3,1000,1,Light,0,4,50,0,1,1000
footman,60,56,Normal,6,900,1,Heavy,2,5,100,20,2,1500
";

fn write_assets(dir: &Path) {
    fs::write(dir.join("units.csv"), UNITS_CSV).unwrap();
    fs::write(dir.join("map.txt"), DEMO_MAP.join("\n")).unwrap();
}

fn config(dir: &TempDir) -> HeadlessConfig {
    write_assets(dir.path());
    HeadlessConfig {
        assets_dir: dir.path().to_path_buf(),
        ..HeadlessConfig::default()
    }
}

/// Run a script and parse every response line.
fn session(config: HeadlessConfig, script: &[&str]) -> Vec<Response> {
    let mut runner = HeadlessRunner::from_config(config).unwrap();
    let input = script.join("\n");
    let mut output = Vec::new();
    runner.run(input.as_bytes(), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn state(response: &Response) -> &WorldState {
    match response {
        Response::State(state) => state,
        other => panic!("expected state, got {other:?}"),
    }
}

// ============================================================================
// Session flow
// ============================================================================

#[test]
fn ready_then_one_response_per_command() {
    let dir = TempDir::new().unwrap();
    let responses = session(
        config(&dir),
        &[r#"{"cmd":"hash"}"#, "", r#"{"cmd":"tick","count":5}"#, r#"{"cmd":"quit"}"#],
    );

    assert_eq!(responses.len(), 4);
    assert!(matches!(responses[0], Response::Ready { tick: 0, .. }));
    assert!(matches!(responses[1], Response::StateHash { tick: 0, .. }));
    assert!(matches!(responses[2], Response::Events { tick: 5, ticks: 5, .. }));
    assert_eq!(responses[3], Response::Bye);
}

#[test]
fn lines_after_quit_are_ignored() {
    let dir = TempDir::new().unwrap();
    let responses = session(config(&dir), &[r#"{"cmd":"quit"}"#, r#"{"cmd":"tick"}"#]);
    assert_eq!(responses.len(), 2);
}

#[test]
fn errors_do_not_end_the_session() {
    let dir = TempDir::new().unwrap();
    let responses = session(
        config(&dir),
        &[
            "not json",
            r#"{"cmd":"move","unit":42,"x":3,"y":3}"#,
            r#"{"cmd":"train","building":1,"unit_type":"footman"}"#,
            r#"{"cmd":"state"}"#,
        ],
    );

    assert!(matches!(responses[1], Response::Error { cmd: None, .. }));
    assert!(matches!(&responses[2], Response::Error { cmd: Some(c), .. } if c == "move"));
    assert!(matches!(&responses[3], Response::Error { cmd: Some(c), .. } if c == "train"));
    assert_eq!(state(&responses[4]).units.len(), 2);
}

#[test]
fn advance_carries_partial_ticks() {
    let dir = TempDir::new().unwrap();
    let responses = session(
        config(&dir),
        &[
            r#"{"cmd":"advance","ms":30}"#,
            r#"{"cmd":"advance","ms":30}"#,
            r#"{"cmd":"advance","ms":5000}"#,
        ],
    );

    assert!(matches!(responses[1], Response::Events { ticks: 0, .. }));
    assert!(matches!(responses[2], Response::Events { ticks: 1, .. }));
    // Capped at ten ticks per frame.
    assert!(matches!(responses[3], Response::Events { tick: 11, ticks: 10, .. }));
}

// ============================================================================
// Gameplay
// ============================================================================

#[test]
fn worker_gathers_wood_through_protocol() {
    let dir = TempDir::new().unwrap();
    let responses = session(
        config(&dir),
        &[
            r#"{"cmd":"gather","unit":1,"x":12,"y":1}"#,
            r#"{"cmd":"tick","count":200}"#,
            r#"{"cmd":"state"}"#,
        ],
    );

    match &responses[2] {
        Response::Events { events, .. } => assert!(!events.deliveries.is_empty()),
        other => panic!("expected events, got {other:?}"),
    }
    let state = state(&responses[3]);
    assert!(state.economy.wood >= 20);
    assert!(matches!(
        state.units[0].job,
        UnitJob::GatheringWood | UnitJob::Delivering
    ));
}

#[test]
fn barracks_built_and_trains() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.sim.starting_wood = 200;

    let responses = session(
        config,
        &[
            r#"{"cmd":"build","building":"barracks","x":8,"y":6,"builders":[1]}"#,
            r#"{"cmd":"tick","count":200}"#,
            r#"{"cmd":"train","building":1,"unit_type":"footman","count":2}"#,
            r#"{"cmd":"rally","building":1,"tile":[12,7]}"#,
            r#"{"cmd":"tick","count":100}"#,
            r#"{"cmd":"state"}"#,
        ],
    );

    assert!(matches!(responses[1], Response::Ok { id: Some(1), .. }));
    match &responses[2] {
        Response::Events { events, .. } => assert!(!events.completed.is_empty()),
        other => panic!("expected events, got {other:?}"),
    }
    assert!(matches!(responses[3], Response::Ok { count: Some(2), .. }));
    match &responses[5] {
        Response::Events { events, .. } => assert_eq!(events.spawned.len(), 2),
        other => panic!("expected events, got {other:?}"),
    }

    let state = state(&responses[6]);
    assert_eq!(state.buildings[0].state, BuildState::Complete);
    assert_eq!(state.units.len(), 4);
    assert_eq!(state.units[0].job, UnitJob::Idle, "builder released");
}

#[test]
fn cancelled_site_refunds_through_protocol() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.sim.starting_wood = 100;

    let responses = session(
        config,
        &[
            r#"{"cmd":"build","building":"farm","x":4,"y":6,"builders":[1]}"#,
            r#"{"cmd":"state"}"#,
            r#"{"cmd":"cancel_building","building":1}"#,
            r#"{"cmd":"cancel_building","building":1}"#,
            r#"{"cmd":"state"}"#,
        ],
    );

    let placed = state(&responses[2]);
    assert_eq!((placed.economy.gold, placed.economy.wood), (440, 60));
    assert_eq!(placed.units[0].job, UnitJob::Building);

    assert!(matches!(responses[3], Response::Ok { .. }));
    assert!(matches!(&responses[4], Response::Error { cmd: Some(c), .. } if c == "cancel_building"));

    let cancelled = state(&responses[5]);
    assert_eq!((cancelled.economy.gold, cancelled.economy.wood), (500, 100));
    assert!(cancelled.buildings.is_empty());
    assert_eq!(cancelled.units[0].job, UnitJob::Idle);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn save_and_load_through_protocol() {
    let dir = TempDir::new().unwrap();
    let save = dir.path().join("slot.txt");
    let save_cmd = format!(r#"{{"cmd":"save","path":"{}"}}"#, save.display());
    let load_cmd = format!(r#"{{"cmd":"load","path":"{}"}}"#, save.display());

    let responses = session(
        config(&dir),
        &[
            r#"{"cmd":"gather","unit":1,"x":12,"y":4}"#,
            r#"{"cmd":"tick","count":40}"#,
            r#"{"cmd":"state"}"#,
            save_cmd.as_str(),
            r#"{"cmd":"tick","count":60}"#,
            load_cmd.as_str(),
            r#"{"cmd":"state"}"#,
        ],
    );

    assert!(matches!(responses[4], Response::Ok { .. }));
    assert!(matches!(responses[6], Response::Ok { .. }));

    let before = state(&responses[3]);
    let after = state(&responses[7]);
    assert_eq!(after.economy, before.economy);
    assert_eq!(after.dropoffs, before.dropoffs);
    assert_eq!(after.units.len(), before.units.len());
    for (a, b) in after.units.iter().zip(&before.units) {
        assert_eq!((a.id, a.tile, a.job, a.carried), (b.id, b.tile, b.job, b.carried));
    }
}

#[test]
fn load_of_missing_file_reports_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.txt");
    let load_cmd = format!(r#"{{"cmd":"load","path":"{}"}}"#, missing.display());

    let responses = session(config(&dir), &[load_cmd.as_str(), r#"{"cmd":"state"}"#]);

    assert!(matches!(&responses[1], Response::Error { cmd: Some(c), .. } if c == "load"));
    assert_eq!(state(&responses[2]).units.len(), 2);
}

#[test]
fn autosave_writes_on_interval() {
    let dir = TempDir::new().unwrap();
    let autosave = dir.path().join("saves").join("auto.txt");
    let config = HeadlessConfig {
        autosave_path: Some(autosave.clone()),
        autosave_every_ticks: 10,
        ..config(&dir)
    };

    let mut runner = HeadlessRunner::from_config(config).unwrap();
    runner.run_ticks(9);
    assert!(!autosave.exists());
    runner.run_ticks(1);

    let text = fs::read_to_string(&autosave).unwrap();
    assert!(text.starts_with("VERSION 1"));
}

#[test]
fn missing_assets_fail_to_start() {
    let dir = TempDir::new().unwrap();
    let config = HeadlessConfig {
        assets_dir: dir.path().join("absent"),
        ..HeadlessConfig::default()
    };
    assert!(HeadlessRunner::from_config(config).is_err());
}
