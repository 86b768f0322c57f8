//! Error types for the catalog engine
//!
//! Only two places can fail: calls across the store boundary and startup
//! validation. Classification and aggregation are total.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::rarity::RarityGroup;
use crate::state::data::PrintingKey;

/// Failures reported by a [`CatalogStore`](crate::state::library::CatalogStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store could not be reached (lock poisoned, worker panicked, ...)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no printing of card {card_id} in set {set_code:?} with rarity {rarity:?}")]
    NoSuchPrinting {
        card_id: i64,
        set_code: Option<String>,
        rarity: Option<String>,
    },

    #[error("invalid cardinfo payload: {0}")]
    Import(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rarity synonym {synonym:?} is claimed by both {first} and {second}")]
    DuplicateSynonym {
        synonym: String,
        first: RarityGroup,
        second: RarityGroup,
    },

    #[error("rarity group {group} has an empty synonym")]
    EmptySynonym { group: RarityGroup },

    #[error("rarity group {group} is missing from the {table} table")]
    MissingEntry {
        group: RarityGroup,
        table: &'static str,
    },

    #[error("rarity group {group} is listed more than once in the {table} table")]
    DuplicateEntry {
        group: RarityGroup,
        table: &'static str,
    },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// User visible failures of the catalog engine
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A store query was rejected or timed out; the previous results stay visible
    #[error("catalog query failed: {0}")]
    QueryFailure(#[source] StoreError),

    #[error("configuration inconsistency: {0}")]
    ConfigurationInconsistency(#[from] ConfigError),

    /// The quantity write was rejected; the optimistic value is kept locally
    #[error("failed to save quantity {quantity} for {key}: {source}")]
    PersistenceFailure {
        key: PrintingKey,
        quantity: i64,
        #[source]
        source: StoreError,
    },

    /// The printing is neither loaded nor present in the store
    #[error("{0} is not in the catalog")]
    UnknownPrinting(PrintingKey),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_failure_message_names_the_printing() {
        let err = CatalogError::PersistenceFailure {
            key: PrintingKey::new(46986414, Some("LOB-005".into()), Some("Ultra Rare".into())),
            quantity: 3,
            source: StoreError::Unavailable("offline".into()),
        };

        let message = err.to_string();
        assert!(message.contains("46986414"));
        assert!(message.contains("LOB-005"));
        assert!(message.contains("quantity 3"));
    }

    #[test]
    fn test_config_error_converts_into_catalog_error() {
        let err: CatalogError = ConfigError::EmptySynonym {
            group: RarityGroup::Rare,
        }
        .into();
        assert!(matches!(err, CatalogError::ConfigurationInconsistency(_)));
    }
}
