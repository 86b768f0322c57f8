//! Local Yu-Gi-Oh! card catalog engine
//!
//! Browses a SQLite card catalog by name and set, groups printings into
//! display entities, classifies rarity labels, lays entities out in a
//! virtualized grid and tracks owned quantities per printing.

pub mod catalog;
pub mod config;
pub mod error;
pub mod rarity;
pub mod state;
pub mod ui;

pub use catalog::runtime::CatalogRuntime;
pub use config::CatalogConfig;
pub use error::{CatalogError, ConfigError, StoreError};
pub use rarity::{RarityGroup, RarityTable};
pub use state::library::{CatalogStore, Library};
