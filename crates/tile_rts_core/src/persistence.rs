//! Text save format, version 1.
//!
//! ```text
//! VERSION 1
//! ECO gold wood food_used food_cap
//! IDS next_unit_id next_building_id
//! MAP width height
//! TILES | BLOCKED | RESKIND | RESAMNT | RESMAX   (then `height` rows of `width` integers)
//! DROPOFFS n                                      (then n lines `D x y`)
//! BUILDINGS n                                     (then per building:)
//!   B id kind x y w h state progress total cost_gold cost_wood rally_x rally_y
//!   BQ count                                      (then count lines `QI unit_type remaining_ms`)
//! UNITS n                                         (then n lines:)
//!   U id unit_type x y goal_x goal_y hp job carried carried_kind building_target
//! ```
//!
//! Loading is all-or-nothing: the file is parsed into a scratch world that
//! replaces the live one only if every line is valid.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::Write as _;
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use crate::building::{BuildState, Building, BuildingId, BuildingKind, TrainItem};
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::map::{Map, ResourceKind, Terrain};
use crate::math::Tile;
use crate::unit::{Unit, UnitId, UnitJob, UnitTypeIndex, UnitTypeTable};
use crate::world::World;

/// Save format version written and accepted.
pub const SAVE_VERSION: u32 = 1;

/// Largest map side a save may declare.
pub const MAX_MAP_SIDE: i32 = 1024;

/// Largest building side a save may declare.
pub const MAX_FOOTPRINT: i32 = 8;

/// Sections every save must contain exactly once.
const SECTIONS: [&str; 11] = [
    "ECO", "IDS", "MAP", "TILES", "BLOCKED", "RESKIND", "RESAMNT", "RESMAX", "DROPOFFS",
    "BUILDINGS", "UNITS",
];

fn carried_kind_code(kind: Option<ResourceKind>) -> u8 {
    match kind {
        Some(ResourceKind::Gold) => 1,
        Some(ResourceKind::Wood) => 2,
        Some(ResourceKind::None) | None => 0,
    }
}

fn carried_kind_from_code(code: u8) -> Option<Option<ResourceKind>> {
    match code {
        0 => Some(None),
        1 => Some(Some(ResourceKind::Gold)),
        2 => Some(Some(ResourceKind::Wood)),
        _ => None,
    }
}

impl World {
    /// Render the world in the text save format.
    #[must_use]
    pub fn save_to_string(&self) -> String {
        SaveWriter(self).to_string()
    }

    /// Replace this world with one parsed from `text`.
    ///
    /// The unit-type table, configuration and tick counter of the live world
    /// are kept. On error the live world is untouched.
    pub fn load_from_str(&mut self, text: &str) -> Result<()> {
        match self.parse_save(text) {
            Ok(world) => {
                *self = world;
                tracing::info!(
                    units = self.units.len(),
                    buildings = self.buildings.len(),
                    "Save loaded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejected save data");
                Err(e)
            }
        }
    }

    /// Write the save file to `path`, replacing it atomically.
    ///
    /// The data goes to `{path}.tmp` first and is renamed over `path` once
    /// flushed, so a crash mid-write leaves any previous save intact.
    pub fn save_game(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(self.save_to_string().as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;

        tracing::info!(path = %path.display(), tick = self.tick, "Game saved");
        Ok(())
    }

    /// Load a save file written by [`save_game`](Self::save_game).
    pub fn load_game(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        self.load_from_str(&text)?;
        tracing::info!(path = %path.display(), "Game loaded");
        Ok(())
    }

    fn parse_save(&self, text: &str) -> Result<World> {
        let mut world = self.scratch();
        let mut reader = Reader::new(text);

        let mut header = reader.expect("VERSION header")?;
        if header.tag()? != "VERSION" {
            return Err(header.error("expected VERSION header"));
        }
        let version = header.tokens.next().unwrap_or_default();
        if version.parse::<u32>().ok() != Some(SAVE_VERSION) {
            return Err(GameError::SaveVersionMismatch(version.to_string()));
        }
        header.finish()?;

        let mut seen: Vec<&str> = Vec::with_capacity(SECTIONS.len());
        let mut dims: Option<(i32, i32)> = None;
        while let Some(mut record) = reader.next_record() {
            let tag = record.tag()?;
            if seen.contains(&tag) {
                return Err(record.error(format!("duplicate {tag} section")));
            }
            match tag {
                "ECO" => {
                    world.economy = Economy {
                        gold: record.field("gold")?,
                        wood: record.field("wood")?,
                        food_used: record.field("food_used")?,
                        food_cap: record.field("food_cap")?,
                    };
                    record.finish()?;
                }
                "IDS" => {
                    world.next_unit_id = record.field("next_unit_id")?;
                    world.next_building_id = record.field("next_building_id")?;
                    record.finish()?;
                }
                "MAP" => {
                    let width: i32 = record.field("width")?;
                    let height: i32 = record.field("height")?;
                    if !(0..=MAX_MAP_SIDE).contains(&width)
                        || !(0..=MAX_MAP_SIDE).contains(&height)
                        || (width == 0) != (height == 0)
                    {
                        return Err(record.error(format!("invalid map size {width}x{height}")));
                    }
                    record.finish()?;
                    world.map = Map::new(width, height);
                    dims = Some((width, height));
                }
                "TILES" | "BLOCKED" | "RESKIND" | "RESAMNT" | "RESMAX" => {
                    let Some((width, _)) = dims else {
                        return Err(record.error(format!("{tag} before MAP")));
                    };
                    record.finish()?;
                    read_grid_section(&mut reader, &mut world.map, tag, width)?;
                }
                "DROPOFFS" => {
                    let count: usize = record.field("dropoff count")?;
                    record.finish()?;
                    for _ in 0..count {
                        let mut d = reader.expect("dropoff")?;
                        d.expect_tag("D")?;
                        world.dropoffs.push(Tile::new(d.field("x")?, d.field("y")?));
                        d.finish()?;
                    }
                }
                "BUILDINGS" => {
                    let count: usize = record.field("building count")?;
                    record.finish()?;
                    for _ in 0..count {
                        let (line, building) = read_building(&mut reader, &world.unit_types)?;
                        if building.id.0 == 0 || world.buildings.contains_key(&building.id) {
                            return Err(format_error(line, format!("bad building id {}", building.id)));
                        }
                        world.buildings.insert(building.id, building);
                    }
                }
                "UNITS" => {
                    let count: usize = record.field("unit count")?;
                    record.finish()?;
                    for _ in 0..count {
                        let (line, unit) = read_unit(&mut reader, &world.unit_types)?;
                        if unit.id.0 == 0 || world.unit_slots.contains_key(&unit.id) {
                            return Err(format_error(line, format!("bad unit id {}", unit.id)));
                        }
                        world.insert_unit(unit);
                    }
                }
                other => return Err(record.error(format!("unknown tag `{other}`"))),
            }
            seen.push(tag);
        }

        if let Some(missing) = SECTIONS.iter().find(|&&s| !seen.contains(&s)) {
            return Err(format_error(
                reader.last_line + 1,
                format!("missing {missing} section"),
            ));
        }

        // A stale counter would hand out ids that are already taken.
        let max_unit = world.units.iter().map(|u| u.id.0).max().unwrap_or(0);
        let max_building = world.buildings.keys().map(|b| b.0).max().unwrap_or(0);
        world.next_unit_id = world.next_unit_id.max(next_id(max_unit, reader.last_line)?);
        world.next_building_id = world
            .next_building_id
            .max(next_id(max_building, reader.last_line)?);

        // Paths are not saved; units still under way get a fresh one.
        for slot in 0..world.units.len() {
            let unit = &world.units[slot];
            if unit.job == UnitJob::Idle || unit.goal == unit.tile {
                continue;
            }
            let path = world.path_between(unit.tile, unit.goal);
            world.units[slot].set_path(path);
        }
        Ok(world)
    }
}

fn next_id(max: u32, line: usize) -> Result<u32> {
    max.checked_add(1)
        .ok_or_else(|| format_error(line, format!("id {max} leaves no room for new ids")))
}

fn format_error(line: usize, message: impl Into<String>) -> GameError {
    GameError::SaveFormat {
        line,
        message: message.into(),
    }
}

struct SaveWriter<'a>(&'a World);

impl fmt::Display for SaveWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let world = self.0;
        let eco = &world.economy;
        let map = &world.map;

        writeln!(f, "VERSION {SAVE_VERSION}")?;
        writeln!(
            f,
            "ECO {} {} {} {}",
            eco.gold, eco.wood, eco.food_used, eco.food_cap
        )?;
        writeln!(f, "IDS {} {}", world.next_unit_id, world.next_building_id)?;
        writeln!(f, "MAP {} {}", map.width(), map.height())?;

        let width = usize::try_from(map.width()).unwrap_or(0);
        write_grid(f, "TILES", width, map.raw_tiles().iter().map(|t| i32::from(t.code())))?;
        write_grid(f, "BLOCKED", width, map.raw_blocked().iter().map(|&b| i32::from(b)))?;
        write_grid(f, "RESKIND", width, map.raw_res_kind().iter().map(|k| i32::from(k.code())))?;
        write_grid(f, "RESAMNT", width, map.raw_res_amount().iter().copied())?;
        write_grid(f, "RESMAX", width, map.raw_res_max().iter().copied())?;

        writeln!(f, "DROPOFFS {}", world.dropoffs.len())?;
        for d in &world.dropoffs {
            writeln!(f, "D {} {}", d.x, d.y)?;
        }

        let type_id = |index: UnitTypeIndex| {
            world
                .unit_types
                .get(index)
                .map_or("?", |ty| ty.id.as_str())
        };

        writeln!(f, "BUILDINGS {}", world.buildings.len())?;
        for b in world.buildings.values() {
            let rally = b.rally.unwrap_or(Tile::UNSET);
            writeln!(
                f,
                "B {} {} {} {} {} {} {} {} {} {} {} {} {}",
                b.id.0,
                b.kind.code(),
                b.tile.x,
                b.tile.y,
                b.w,
                b.h,
                b.state.code(),
                b.build_progress_ms,
                b.build_total_ms,
                b.cost_gold,
                b.cost_wood,
                rally.x,
                rally.y
            )?;
            writeln!(f, "BQ {}", b.queue.len())?;
            for item in &b.queue {
                writeln!(f, "QI {} {}", type_id(item.unit_type), item.remaining_ms)?;
            }
        }

        writeln!(f, "UNITS {}", world.units.len())?;
        for u in &world.units {
            writeln!(
                f,
                "U {} {} {} {} {} {} {} {} {} {} {}",
                u.id.0,
                type_id(u.type_index),
                u.tile.x,
                u.tile.y,
                u.goal.x,
                u.goal.y,
                u.hp,
                u.job.code(),
                u.carried,
                carried_kind_code(u.carried_kind),
                u.building_target.map_or(0, |b| b.0)
            )?;
        }
        Ok(())
    }
}

fn write_grid(
    f: &mut fmt::Formatter<'_>,
    tag: &str,
    width: usize,
    values: impl Iterator<Item = i32>,
) -> fmt::Result {
    writeln!(f, "{tag}")?;
    if width == 0 {
        return Ok(());
    }
    let mut row = String::new();
    for (i, value) in values.enumerate() {
        if i % width != 0 {
            row.push(' ');
        }
        write!(row, "{value}")?;
        if i % width == width - 1 {
            writeln!(f, "{row}")?;
            row.clear();
        }
    }
    Ok(())
}

/// Non-blank lines of a save file with their 1-based line numbers.
struct Reader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    last_line: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            last_line: 0,
        }
    }

    fn next_record(&mut self) -> Option<Record<'a>> {
        for (i, line) in self.lines.by_ref() {
            self.last_line = i + 1;
            if !line.trim().is_empty() {
                return Some(Record {
                    line: i + 1,
                    tokens: line.split_whitespace(),
                });
            }
        }
        None
    }

    fn expect(&mut self, what: &str) -> Result<Record<'a>> {
        let line = self.last_line + 1;
        self.next_record()
            .ok_or_else(|| format_error(line, format!("unexpected end of file, expected {what}")))
    }
}

/// One line split into whitespace-separated fields.
struct Record<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Record<'a> {
    fn error(&self, message: impl Into<String>) -> GameError {
        format_error(self.line, message)
    }

    fn tag(&mut self) -> Result<&'a str> {
        let line = self.line;
        self.tokens
            .next()
            .ok_or_else(|| format_error(line, "missing tag"))
    }

    fn expect_tag(&mut self, expected: &str) -> Result<()> {
        match self.tag()? {
            tag if tag == expected => Ok(()),
            tag => Err(self.error(format!("expected `{expected}`, found `{tag}`"))),
        }
    }

    fn token(&mut self, name: &str) -> Result<&'a str> {
        let line = self.line;
        self.tokens
            .next()
            .ok_or_else(|| format_error(line, format!("missing {name}")))
    }

    fn field<T: FromStr>(&mut self, name: &str) -> Result<T> {
        let token = self.token(name)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {name} `{token}`")))
    }

    fn code<T>(&mut self, name: &str, decode: impl Fn(u8) -> Option<T>) -> Result<T> {
        let code: u8 = self.field(name)?;
        decode(code).ok_or_else(|| self.error(format!("unknown {name} {code}")))
    }

    fn unit_type(&mut self, table: &UnitTypeTable) -> Result<UnitTypeIndex> {
        let id = self.token("unit type")?;
        table
            .lookup(id)
            .ok_or_else(|| GameError::UnknownUnitType(id.to_string()))
    }

    fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(self.error(format!("unexpected trailing `{extra}`"))),
        }
    }
}

fn read_grid_section(reader: &mut Reader<'_>, map: &mut Map, tag: &str, width: i32) -> Result<()> {
    let width = usize::try_from(width).unwrap_or(0);
    let (tiles, blocked, kinds, amounts, maxes) = map.raw_mut();
    match tag {
        "TILES" => read_grid(reader, tag, width, tiles, |v| {
            u8::try_from(v).ok().and_then(Terrain::from_code)
        }),
        "BLOCKED" => read_grid(reader, tag, width, blocked, |v| match v {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }),
        "RESKIND" => read_grid(reader, tag, width, kinds, |v| {
            u8::try_from(v).ok().and_then(ResourceKind::from_code)
        }),
        "RESAMNT" => read_grid(reader, tag, width, amounts, Some),
        _ => read_grid(reader, tag, width, maxes, Some),
    }
}

fn read_grid<T>(
    reader: &mut Reader<'_>,
    tag: &str,
    width: usize,
    out: &mut [T],
    decode: impl Fn(i32) -> Option<T>,
) -> Result<()> {
    if width == 0 {
        return Ok(());
    }
    for row in out.chunks_mut(width) {
        let mut record = reader.expect(&format!("{tag} row"))?;
        for cell in row.iter_mut() {
            let value: i32 = record.field(tag)?;
            *cell = decode(value).ok_or_else(|| record.error(format!("invalid {tag} value {value}")))?;
        }
        record.finish()?;
    }
    Ok(())
}

fn read_building(reader: &mut Reader<'_>, types: &UnitTypeTable) -> Result<(usize, Building)> {
    let mut r = reader.expect("building")?;
    let line = r.line;
    r.expect_tag("B")?;
    let id = BuildingId(r.field("building id")?);
    let kind = r.code("building kind", BuildingKind::from_code)?;
    let tile = Tile::new(r.field("x")?, r.field("y")?);
    let w = r.field("width")?;
    let h = r.field("height")?;
    if !(1..=MAX_FOOTPRINT).contains(&w) || !(1..=MAX_FOOTPRINT).contains(&h) {
        return Err(r.error(format!("invalid footprint {w}x{h}")));
    }
    let state = r.code("build state", BuildState::from_code)?;
    let build_progress_ms = r.field("progress")?;
    let build_total_ms = r.field("total")?;
    let cost_gold = r.field("cost_gold")?;
    let cost_wood = r.field("cost_wood")?;
    let rally = Tile::new(r.field("rally_x")?, r.field("rally_y")?);
    r.finish()?;

    let mut header = reader.expect("BQ")?;
    header.expect_tag("BQ")?;
    let count: usize = header.field("queue length")?;
    header.finish()?;

    let mut queue = VecDeque::new();
    for _ in 0..count {
        let mut item = reader.expect("QI")?;
        item.expect_tag("QI")?;
        let unit_type = item.unit_type(types)?;
        let remaining_ms = item.field("remaining_ms")?;
        item.finish()?;
        queue.push_back(TrainItem {
            unit_type,
            remaining_ms,
        });
    }

    let building = Building {
        id,
        kind,
        tile,
        w,
        h,
        state,
        build_progress_ms,
        build_total_ms,
        cost_gold,
        cost_wood,
        queue,
        rally: (rally != Tile::UNSET).then_some(rally),
    };
    Ok((line, building))
}

fn read_unit(reader: &mut Reader<'_>, types: &UnitTypeTable) -> Result<(usize, Unit)> {
    let mut r = reader.expect("unit")?;
    let line = r.line;
    r.expect_tag("U")?;
    let id = UnitId(r.field("unit id")?);
    let type_index = r.unit_type(types)?;
    let tile = Tile::new(r.field("x")?, r.field("y")?);
    let goal = Tile::new(r.field("goal_x")?, r.field("goal_y")?);
    let hp = r.field("hp")?;

    let mut unit = Unit::new(id, type_index, tile, hp);
    unit.goal = goal;
    unit.job = r.code("job", UnitJob::from_code)?;
    unit.carried = r.field("carried")?;
    unit.carried_kind = r.code("carried kind", carried_kind_from_code)?;
    let target: u32 = r.field("building target")?;
    unit.building_target = (target != 0).then_some(BuildingId(target));
    r.finish()?;
    Ok((line, unit))
}
