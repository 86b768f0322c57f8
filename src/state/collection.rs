//! Owned quantities per printing
//!
//! Adjustments are applied locally first and persisted afterwards. A failed
//! write keeps the local value and is reported to the caller, who retries by
//! issuing the same adjustment again (last successful write wins).

use std::collections::HashMap;

use log::{debug, warn};

use super::data::{CardDisplayEntity, PrintingKey, PrintingRow};
use super::library::CatalogStore;
use crate::error::{CatalogError, StoreError};

/// An optimistic change that still has to reach the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: PrintingKey,
    pub quantity: i64,
    write_id: u64,
}

/// A locally staged value the store may not reflect yet
#[derive(Debug, Clone, Copy)]
struct LocalWrite {
    quantity: i64,
    write_id: u64,
    /// Clock value at which the store acknowledged the write
    settled_at: Option<u64>,
}

/// Local ledger of owned quantities, keyed by printing
///
/// Staged values survive a reseed until a store read that started after
/// the write was acknowledged reports them back.
#[derive(Debug, Default)]
pub struct QuantityTracker {
    ledger: HashMap<PrintingKey, i64>,
    local: HashMap<PrintingKey, LocalWrite>,
    next_write: u64,
    clock: u64,
}

impl QuantityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker to take when a store read is dispatched, for `seed_since`
    pub fn mark(&self) -> u64 {
        self.clock
    }

    /// Replace the ledger with a result read after every acknowledged write
    pub fn seed(&mut self, rows: &[PrintingRow]) {
        self.seed_since(rows, self.clock);
    }

    /// Replace the ledger with the quantities of a fresh query result.
    ///
    /// `mark` is the value of `mark()` when the query was dispatched. Local
    /// values acknowledged after it, or never acknowledged, are kept on top
    /// of the rows.
    pub fn seed_since(&mut self, rows: &[PrintingRow], mark: u64) {
        self.ledger.clear();
        for row in rows {
            self.ledger
                .insert(row.printing_key(), row.quantity.unwrap_or(0).max(0));
        }

        self.local
            .retain(|_, write| write.settled_at.map_or(true, |settled| settled > mark));
        for (key, write) in &self.local {
            self.ledger.insert(key.clone(), write.quantity);
        }
    }

    /// Current local quantity (0 for printings never seen)
    pub fn quantity(&self, key: &PrintingKey) -> i64 {
        self.known(key).unwrap_or(0)
    }

    /// Local quantity, if the printing is in the ledger
    pub fn known(&self, key: &PrintingKey) -> Option<i64> {
        self.ledger.get(key).copied()
    }

    /// Record the stored amount of a printing the ledger does not hold.
    /// `None` means the store has no such printing.
    pub fn learn(&mut self, key: &PrintingKey, stored: Option<i64>) -> Result<i64, CatalogError> {
        let stored = stored.ok_or_else(|| CatalogError::UnknownPrinting(key.clone()))?;
        Ok(*self.ledger.entry(key.clone()).or_insert(stored.max(0)))
    }

    /// Copy ledger values onto freshly rebuilt entities
    pub fn sync(&self, entities: &mut [CardDisplayEntity]) {
        for entity in entities.iter_mut() {
            if let Some(&quantity) = self.ledger.get(&entity.card.printing_key()) {
                entity.card.quantity = Some(quantity);
            }
        }
    }

    /// Apply `delta` locally and return the write to send to the store.
    ///
    /// The result never goes below zero. Every entity created from this
    /// printing gets the new quantity immediately. The printing must be in
    /// the ledger, see `learn`.
    pub fn stage(
        &mut self,
        entities: &mut [CardDisplayEntity],
        key: &PrintingKey,
        delta: i64,
    ) -> Result<PendingWrite, CatalogError> {
        let current = self
            .known(key)
            .ok_or_else(|| CatalogError::UnknownPrinting(key.clone()))?;
        let quantity = current.saturating_add(delta).max(0);

        self.next_write += 1;
        self.ledger.insert(key.clone(), quantity);
        self.local.insert(
            key.clone(),
            LocalWrite {
                quantity,
                write_id: self.next_write,
                settled_at: None,
            },
        );
        for entity in entities.iter_mut() {
            if entity.card.printing_key() == *key {
                entity.card.quantity = Some(quantity);
            }
        }

        debug!("Staged {key}: {current} -> {quantity}");
        Ok(PendingWrite {
            key: key.clone(),
            quantity,
            write_id: self.next_write,
        })
    }

    /// Reconcile a staged write with the outcome of the persistence call.
    /// The local value is kept either way.
    pub fn finish(
        &mut self,
        pending: PendingWrite,
        result: Result<(), StoreError>,
    ) -> Result<i64, CatalogError> {
        match result {
            Ok(()) => {
                self.clock += 1;
                if let Some(write) = self.local.get_mut(&pending.key) {
                    // A newer staged value stays unacknowledged
                    if write.write_id == pending.write_id {
                        write.settled_at = Some(self.clock);
                    }
                }
                Ok(pending.quantity)
            }
            Err(source) => {
                warn!(
                    "Could not save quantity {} for {}: {}",
                    pending.quantity, pending.key, source
                );
                Err(CatalogError::PersistenceFailure {
                    key: pending.key,
                    quantity: pending.quantity,
                    source,
                })
            }
        }
    }

    /// Stage, persist synchronously and reconcile in one call.
    /// Printings outside the ledger start from their stored amount.
    pub fn adjust<S: CatalogStore + ?Sized>(
        &mut self,
        store: &S,
        entities: &mut [CardDisplayEntity],
        key: &PrintingKey,
        delta: i64,
    ) -> Result<i64, CatalogError> {
        if self.known(key).is_none() {
            let stored = store
                .quantity_of(key.card_id, key.set_code.as_deref(), key.rarity.as_deref())
                .map_err(CatalogError::QueryFailure)?;
            self.learn(key, stored)?;
        }

        let pending = self.stage(entities, key, delta)?;
        let result = store.persist_quantity(
            pending.key.card_id,
            pending.key.set_code.as_deref(),
            pending.key.rarity.as_deref(),
            pending.quantity,
        );
        self.finish(pending, result)
    }
}
