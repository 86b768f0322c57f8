//! Collapse printing rows into display entities
//!
//! Pure transformation: rows are taken in store order, entities come out in
//! first-seen key order and every rarity label is kept (including repeats).

use std::collections::HashMap;

use crate::rarity::{RarityGroup, RarityTable};
use crate::state::data::{AggregationMode, CardDisplayEntity, DisplayKey, PrintingRow};

/// Group `rows` into display entities according to `mode`
pub fn aggregate(rows: &[PrintingRow], mode: AggregationMode) -> Vec<CardDisplayEntity> {
    let mut entities: Vec<CardDisplayEntity> = Vec::new();
    let mut positions: HashMap<DisplayKey, usize> = HashMap::new();

    for row in rows {
        let key = DisplayKey::for_row(row, mode);

        let index = match positions.get(&key) {
            Some(&index) => index,
            None => {
                entities.push(CardDisplayEntity {
                    key: key.clone(),
                    card: row.clone(),
                    rarities: Vec::new(),
                });
                positions.insert(key, entities.len() - 1);
                entities.len() - 1
            }
        };

        if let Some(label) = row.rarity_label() {
            entities[index].rarities.push(label.to_string());
        }
    }

    entities
}

/// Keep only entities with at least one label in `group` (order preserved)
pub fn filter_by_rarity(
    entities: Vec<CardDisplayEntity>,
    table: &RarityTable,
    group: RarityGroup,
) -> Vec<CardDisplayEntity> {
    entities
        .into_iter()
        .filter(|entity| entity.matches_rarity(table, group))
        .collect()
}
