//! Catalog browsing
//!
//! - Row to entity aggregation (aggregate.rs)
//! - Debounced, generation-checked filtering (filter.rs)
//! - The tokio driver tying filters, store and grid together (runtime.rs)

pub mod aggregate;
pub mod filter;
pub mod runtime;
