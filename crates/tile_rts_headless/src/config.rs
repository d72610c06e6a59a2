//! Host configuration loaded from RON.
//!
//! ```ron
//! HeadlessConfig(
//!     assets_dir: "assets",
//!     autosave_path: Some("saves/autosave.txt"),
//!     autosave_every_ticks: 1200,
//!     sim: SimConfig(tick_rate: 20, starting_gold: 800),
//! )
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_rts_core::config::SimConfig;
use tile_rts_core::timestep::{FixedTimestep, DEFAULT_MAX_TICKS_PER_FRAME};

/// Error type for config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Headless host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Directory holding `units.csv` and `map.txt`.
    pub assets_dir: PathBuf,
    /// Where autosaves go. Autosave is off without a path.
    pub autosave_path: Option<PathBuf>,
    /// Autosave interval in ticks; 0 disables autosave.
    pub autosave_every_ticks: u64,
    /// Catch-up cap for the frame accumulator.
    pub max_ticks_per_frame: u32,
    /// Simulation parameters.
    pub sim: SimConfig,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            autosave_path: None,
            autosave_every_ticks: 0,
            max_ticks_per_frame: DEFAULT_MAX_TICKS_PER_FRAME,
            sim: SimConfig::default(),
        }
    }
}

impl HeadlessConfig {
    /// Load from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(ron)?)
    }

    /// The frame accumulator these settings describe.
    #[must_use]
    pub fn timestep(&self) -> FixedTimestep {
        FixedTimestep::new(self.sim.tick_rate).with_max_ticks(self.max_ticks_per_frame)
    }

    /// Whether autosave is on, and where it writes.
    #[must_use]
    pub fn autosave(&self) -> Option<(&Path, u64)> {
        match (&self.autosave_path, self.autosave_every_ticks) {
            (Some(path), every) if every > 0 => Some((path.as_path(), every)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HeadlessConfig::default();
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.max_ticks_per_frame, 10);
        assert!(config.autosave().is_none());
        assert_eq!(config.timestep().tick_ms(), 50);
    }

    #[test]
    fn test_parse_partial_config() {
        let ron = r#"
            HeadlessConfig(
                autosave_path: Some("saves/auto.txt"),
                autosave_every_ticks: 100,
                sim: SimConfig(tick_rate: 10, starting_gold: 800),
            )
        "#;
        let config = HeadlessConfig::from_ron_str(ron).unwrap();
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.sim.tick_rate, 10);
        assert_eq!(config.sim.starting_gold, 800);
        assert_eq!(config.sim.wood_per_tile, 300);
        assert_eq!(
            config.autosave(),
            Some((Path::new("saves/auto.txt"), 100))
        );
        assert_eq!(config.timestep().tick_ms(), 100);
    }

    #[test]
    fn test_zero_interval_disables_autosave() {
        let config = HeadlessConfig {
            autosave_path: Some(PathBuf::from("auto.txt")),
            ..HeadlessConfig::default()
        };
        assert!(config.autosave().is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            HeadlessConfig::from_ron_str("HeadlessConfig(assets_dir: 5)"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HeadlessConfig::load("/nonexistent/headless.ron"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
