//! Configuration loading.
//!
//! The config is a TOML file, by default managed by confy under the `valo`
//! application name:
//!
//! ```toml
//! data_dir = "/srv/valo"
//!
//! [tables]
//! agent_state = "agent_state.parquet"
//! round_info = "round_info.parquet"
//! map_info = "map_info.parquet"
//!
//! [[frame_rates]]
//! stored = 29
//! actual = 29.97
//! ```
//!
//! Table paths are resolved against `data_dir` unless absolute.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "valo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValoConfig {
    pub data_dir: PathBuf,
    pub tables: TablePaths,
    pub frame_rates: FrameRateTable,
}

impl Default for ValoConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().unwrap_or_else(|| PathBuf::from(".")),
            tables: TablePaths::default(),
            frame_rates: FrameRateTable::default(),
        }
    }
}

impl ValoConfig {
    /// Load from an explicit file, or from the confy-managed location
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => load_file(path),
            None => Ok(confy::load(APP_NAME, None)?),
        }
    }

    /// Write to `path`, or to the confy-managed location when `None`
    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        match path {
            Some(path) => save_file(path, self),
            None => Ok(confy::store(APP_NAME, None, self)?),
        }
    }

    pub fn resolve(&self, table: &Path) -> PathBuf {
        if table.is_absolute() {
            table.to_path_buf()
        } else {
            self.data_dir.join(table)
        }
    }

    pub fn agent_state_path(&self) -> PathBuf {
        self.resolve(&self.tables.agent_state)
    }

    pub fn round_info_path(&self) -> PathBuf {
        self.resolve(&self.tables.round_info)
    }

    pub fn map_info_path(&self) -> PathBuf {
        self.resolve(&self.tables.map_info)
    }
}

/// Parquet file (or directory) backing each store table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePaths {
    pub agent_state: PathBuf,
    pub round_info: PathBuf,
    pub map_info: PathBuf,
}

impl Default for TablePaths {
    fn default() -> Self {
        Self {
            agent_state: PathBuf::from("agent_state.parquet"),
            round_info: PathBuf::from("round_info.parquet"),
            map_info: PathBuf::from("map_info.parquet"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRateCorrection {
    pub stored: i64,
    pub actual: f64,
}

/// Lookup from stored integer frame rates to the true recording rate.
///
/// Upstream data truncates NTSC rates, so 29 and 59 really mean 29.97 and
/// 59.94. Rates with no entry are used as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRateTable(pub Vec<FrameRateCorrection>);

impl Default for FrameRateTable {
    fn default() -> Self {
        Self(vec![
            FrameRateCorrection {
                stored: 29,
                actual: 29.97,
            },
            FrameRateCorrection {
                stored: 59,
                actual: 59.94,
            },
        ])
    }
}

impl FrameRateTable {
    pub fn actual(&self, stored: i64) -> f64 {
        self.0
            .iter()
            .find(|c| c.stored == stored)
            .map(|c| c.actual)
            .unwrap_or(stored as f64)
    }
}

/// Default data directory (`<data_dir>/valo`)
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_NAME))
}

/// Load a config from a TOML file
pub fn load_file(path: &Path) -> Result<ValoConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save a config to a TOML file
pub fn save_file(path: &Path, config: &ValoConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(path, contents).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error(transparent)]
    Confy(#[from] confy::ConfyError),
}
