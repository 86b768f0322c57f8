//! Engine configuration
//!
//! Stored as JSON. Every field has a default, so a partial file (or no file
//! at all) is fine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::catalog::filter::FilterSettings;
use crate::error::ConfigError;
use crate::rarity::{RarityGroup, RarityTable};
use crate::state::data::AggregationMode;
use crate::state::library::Library;
use crate::ui::grid::{CellSize, GridViewport};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog database; falls back to [`Library::default_path`]
    pub database_path: Option<PathBuf>,

    /// Quiet period after the last name keystroke before searching
    pub debounce_ms: u64,

    /// Shortest name (in characters) that triggers a search
    pub min_name_len: usize,

    /// Upper bound for a single store call
    pub query_timeout_ms: u64,

    pub aggregation: AggregationMode,

    pub cell_width: f32,
    pub cell_height: f32,

    /// Rows rendered above and below the viewport
    pub overscan_rows: usize,

    /// Additional store labels per rarity group
    pub extra_rarity_synonyms: BTreeMap<RarityGroup, Vec<String>>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let cell = CellSize::default();
        Self {
            database_path: None,
            debounce_ms: 300,
            min_name_len: 2,
            query_timeout_ms: 5000,
            aggregation: AggregationMode::PerSet,
            cell_width: cell.width,
            cell_height: cell.height,
            overscan_rows: 2,
            extra_rarity_synonyms: BTreeMap::new(),
        }
    }
}

impl CatalogConfig {
    /// Where the config file lives by default:
    /// - Linux: ~/.config/ygo-catalog/config.json
    /// - macOS: ~/Library/Application Support/ygo-catalog/config.json
    /// - Windows: %APPDATA%\ygo-catalog\config.json
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("ygo-catalog");
        path.push("config.json");
        Some(path)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a config file; it must exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load an explicitly requested file, or the default file if there is one.
    /// Without either, defaults are used.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate the rarity tables including configured synonyms
    pub fn rarity_table(&self) -> Result<RarityTable, ConfigError> {
        RarityTable::with_extra_synonyms(&self.extra_rarity_synonyms)
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(Library::default_path)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn cell(&self) -> CellSize {
        CellSize::new(self.cell_width, self.cell_height)
    }

    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            debounce: self.debounce(),
            min_name_len: self.min_name_len,
            mode: self.aggregation,
        }
    }

    /// Viewport with no size yet; the caller resizes it
    pub fn viewport(&self) -> GridViewport {
        GridViewport::new(0.0, 0.0, self.cell(), self.overscan_rows)
    }
}
