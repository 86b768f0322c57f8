//! State management module
//!
//! This module owns everything that lives in the catalog database:
//! - Database connection, schema and queries (library.rs)
//! - Shared row and entity types (data.rs)
//! - Owned quantities with optimistic updates (collection.rs)
//! - YGOPRODeck cardinfo import (import.rs)

pub mod collection;
pub mod data;
pub mod import;
pub mod library;
