//! Unit table and map loading.
//!
//! An asset directory holds two files:
//!
//! - `units.csv`: a header row, then one unit type per line with the columns
//!   `id,hp,move_speed,attack_type,damage,cooldown_ms,range,armor_type,armor,sight,cost_gold,cost_wood,food,build_time_ms`
//! - `map.txt`: one row of legend characters per line (`.` grass, `#` wall,
//!   `T` forest, `G` gold, `D` dropoff). Blank lines are skipped and short
//!   rows are padded with grass.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tile_rts_core::map::Map;
use tile_rts_core::unit::{Armor, ArmorType, Attack, AttackType, UnitType};

/// File name of the unit table inside an asset directory.
pub const UNITS_FILE: &str = "units.csv";

/// File name of the map inside an asset directory.
pub const MAP_FILE: &str = "map.txt";

const UNIT_COLUMNS: usize = 14;

/// Error type for asset loading.
#[derive(Error, Debug)]
pub enum AssetError {
    /// Failed to read a file.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A line could not be parsed.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// The file has no usable content.
    #[error("{} is empty", path.display())]
    Empty {
        /// The empty file.
        path: PathBuf,
    },
}

/// Everything a world needs from disk.
#[derive(Debug, Clone)]
pub struct GameAssets {
    /// Unit type table in file order.
    pub unit_types: Vec<UnitType>,
    /// Terrain grid.
    pub map: Map,
}

impl GameAssets {
    /// Load `units.csv` and `map.txt` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        let unit_types = load_unit_types(dir.join(UNITS_FILE))?;
        let map = load_map(dir.join(MAP_FILE))?;
        tracing::info!(
            dir = %dir.display(),
            unit_types = unit_types.len(),
            width = map.width(),
            height = map.height(),
            "Assets loaded"
        );
        Ok(Self { unit_types, map })
    }
}

fn read(path: &Path) -> Result<String, AssetError> {
    fs::read_to_string(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a unit table from a CSV file.
pub fn load_unit_types(path: impl AsRef<Path>) -> Result<Vec<UnitType>, AssetError> {
    let path = path.as_ref();
    parse_unit_types(&read(path)?, path)
}

/// Parse unit table CSV text. `path` is only used in error messages.
pub fn parse_unit_types(text: &str, path: &Path) -> Result<Vec<UnitType>, AssetError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    // Header
    if lines.next().is_none() {
        return Err(AssetError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mut seen = HashSet::new();
    let mut types = Vec::new();
    for (line, text) in lines {
        let ty = parse_unit_row(text).map_err(|message| AssetError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        if !seen.insert(ty.id.clone()) {
            return Err(AssetError::Parse {
                path: path.to_path_buf(),
                line,
                message: format!("duplicate unit type '{}'", ty.id),
            });
        }
        types.push(ty);
    }
    Ok(types)
}

fn parse_unit_row(row: &str) -> Result<UnitType, String> {
    let cols: Vec<&str> = row.split(',').map(str::trim).collect();
    if cols.len() != UNIT_COLUMNS {
        return Err(format!(
            "expected {UNIT_COLUMNS} columns, found {}",
            cols.len()
        ));
    }
    if cols[0].is_empty() || cols[0].contains(char::is_whitespace) {
        return Err(format!("invalid unit id '{}'", cols[0]));
    }

    Ok(UnitType {
        id: cols[0].to_string(),
        hp: number(&cols, 1, "hp")?,
        move_speed_px_s: number(&cols, 2, "move_speed")?,
        attack: Attack {
            kind: AttackType::from_name(cols[3]),
            damage: number(&cols, 4, "damage")?,
            cooldown_ms: number(&cols, 5, "cooldown_ms")?,
            range_tiles: number(&cols, 6, "range")?,
        },
        armor: Armor {
            kind: ArmorType::from_name(cols[7]),
            value: number(&cols, 8, "armor")?,
        },
        sight_tiles: number(&cols, 9, "sight")?,
        cost_gold: number(&cols, 10, "cost_gold")?,
        cost_wood: number(&cols, 11, "cost_wood")?,
        food: number(&cols, 12, "food")?,
        build_time_ms: number(&cols, 13, "build_time_ms")?,
    })
}

fn number<T: FromStr>(cols: &[&str], index: usize, name: &str) -> Result<T, String> {
    cols[index]
        .parse()
        .map_err(|_| format!("bad {name} '{}'", cols[index]))
}

/// Load a map from a text file.
pub fn load_map(path: impl AsRef<Path>) -> Result<Map, AssetError> {
    let path = path.as_ref();
    parse_map(&read(path)?, path)
}

/// Parse map text. `path` is only used in error messages.
pub fn parse_map(text: &str, path: &Path) -> Result<Map, AssetError> {
    let rows: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .collect();
    if rows.is_empty() {
        return Err(AssetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Map::from_rows(&rows).map_err(|e| AssetError::Parse {
        path: path.to_path_buf(),
        line: 1,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_rts_core::map::Terrain;
    use tile_rts_core::math::Tile;

    const UNITS: &str = "\
id,hp,move_speed,attack_type,damage,cooldown_ms,range,armor_type,armor,sight,cost_gold,cost_wood,food,build_time_ms
worker,30,64,Normal,3,1000,1,Light,0,4,50,0,1,1000

archer,40,60,Pierce,5,1200,4,Fortified,0,7,80,30,1,1200
";

    #[test]
    fn test_parse_units() {
        let types = parse_unit_types(UNITS, Path::new("units.csv")).unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].id, "worker");
        assert_eq!(types[0].cost_gold, 50);
        assert_eq!(types[1].attack.kind, AttackType::Pierce);
        assert_eq!(types[1].attack.range_tiles, 4);
    }

    #[test]
    fn test_unknown_armor_falls_back_to_medium() {
        let types = parse_unit_types(UNITS, Path::new("units.csv")).unwrap();
        assert_eq!(types[1].armor.kind, ArmorType::Medium);
    }

    #[test]
    fn test_bad_number_reports_line() {
        let text = "header\nworker,30,64,Normal,3,1000,1,Light,0,4,lots,0,1,1000\n";
        let err = parse_unit_types(text, Path::new("units.csv")).unwrap_err();
        match err {
            AssetError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("cost_gold"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_column_count() {
        let text = "header\nworker,30,64\n";
        assert!(matches!(
            parse_unit_types(text, Path::new("units.csv")),
            Err(AssetError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let text = format!("{UNITS}worker,1,1,Normal,1,1,1,Light,0,1,1,1,1,1\n");
        assert!(parse_unit_types(&text, Path::new("units.csv")).is_err());
    }

    #[test]
    fn test_empty_units_file() {
        assert!(matches!(
            parse_unit_types("\n\n", Path::new("units.csv")),
            Err(AssetError::Empty { .. })
        ));
    }

    #[test]
    fn test_parse_map_pads_short_rows() {
        let map = parse_map("..T.\r\n\n.D\n", Path::new("map.txt")).unwrap();
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 2);
        assert_eq!(map.terrain(Tile::new(2, 0)), Some(Terrain::Forest));
        assert_eq!(map.terrain(Tile::new(1, 1)), Some(Terrain::Dropoff));
        assert_eq!(map.terrain(Tile::new(3, 1)), Some(Terrain::Grass));
    }

    #[test]
    fn test_empty_map() {
        assert!(matches!(
            parse_map("", Path::new("map.txt")),
            Err(AssetError::Empty { .. })
        ));
    }
}
