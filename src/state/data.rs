//! Shared data structures for the catalog state
//!
//! These structs represent the data model that flows between
//! the store layer, the aggregation step and the grid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rarity::{RarityGroup, RarityTable};

/// One observed (card, set, rarity) instance as delivered by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintingRow {
    /// Card identifier, stable across printings
    pub card_id: i64,
    pub name: String,
    /// Card-type classification (e.g. "Effect Monster")
    pub card_type: String,
    /// Artwork identifier (alternate arts share the card id)
    pub image_id: Option<i64>,
    /// Opaque image reference, never decoded here
    pub image_path: Option<String>,
    pub set_code: Option<String>,
    pub set_name: Option<String>,
    /// Raw rarity label from the store, NOT canonicalized
    pub rarity: Option<String>,
    /// Owned quantity for this printing
    pub quantity: Option<i64>,
    pub price: Option<f64>,
}

impl PrintingRow {
    /// A bare row with only the mandatory fields set
    pub fn new(card_id: i64, name: impl Into<String>, card_type: impl Into<String>) -> Self {
        Self {
            card_id,
            name: name.into(),
            card_type: card_type.into(),
            image_id: None,
            image_path: None,
            set_code: None,
            set_name: None,
            rarity: None,
            quantity: None,
            price: None,
        }
    }

    /// Identity of this printing for quantity tracking
    pub fn printing_key(&self) -> PrintingKey {
        PrintingKey::new(self.card_id, self.set_code.clone(), self.rarity.clone())
    }

    /// The rarity label, if present and not blank
    pub fn rarity_label(&self) -> Option<&str> {
        self.rarity.as_deref().filter(|label| !label.trim().is_empty())
    }
}

/// How printings are collapsed into display entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One entity per (card, artwork, set)
    #[default]
    PerSet,
    /// One entity per (card, artwork), all sets collapsed
    Full,
}

/// Set component of a [`DisplayKey`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetSlot {
    /// The row carried this set code
    Code(String),
    /// The row carried no set code
    Unset,
    /// Sets are collapsed ([`AggregationMode::Full`])
    Collapsed,
}

/// Grouping key of a display entity
///
/// A missing artwork or set is represented explicitly, so a real set code
/// can never collide with a placeholder value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayKey {
    pub card_id: i64,
    pub image_id: Option<i64>,
    pub set: SetSlot,
}

impl DisplayKey {
    pub fn for_row(row: &PrintingRow, mode: AggregationMode) -> Self {
        let set = match mode {
            AggregationMode::Full => SetSlot::Collapsed,
            AggregationMode::PerSet => match &row.set_code {
                Some(code) => SetSlot::Code(code.clone()),
                None => SetSlot::Unset,
            },
        };

        Self {
            card_id: row.card_id,
            image_id: row.image_id,
            set,
        }
    }
}

/// Identity of one collectible printing: (card, set, rarity)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrintingKey {
    pub card_id: i64,
    pub set_code: Option<String>,
    pub rarity: Option<String>,
}

impl PrintingKey {
    pub fn new(card_id: i64, set_code: Option<String>, rarity: Option<String>) -> Self {
        Self {
            card_id,
            set_code,
            rarity,
        }
    }
}

impl fmt::Display for PrintingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "card {} ({}, {})",
            self.card_id,
            self.set_code.as_deref().unwrap_or("no set"),
            self.rarity.as_deref().unwrap_or("no rarity")
        )
    }
}

/// The deduplicated unit shown in the grid
#[derive(Debug, Clone, PartialEq)]
pub struct CardDisplayEntity {
    pub key: DisplayKey,
    /// The first row seen for this key; only `quantity` changes afterwards
    pub card: PrintingRow,
    /// Rarity labels of every row sharing the key, in first-seen order.
    /// Repeats are kept: each one is a separate stock entry.
    pub rarities: Vec<String>,
}

impl CardDisplayEntity {
    pub fn card_id(&self) -> i64 {
        self.card.card_id
    }

    pub fn name(&self) -> &str {
        &self.card.name
    }

    /// Printing identity of the row this entity was created from
    pub fn printing_key(&self) -> PrintingKey {
        self.card.printing_key()
    }

    /// Canonical group of every accumulated label, same order
    pub fn rarity_groups(&self, table: &RarityTable) -> Vec<RarityGroup> {
        self.rarities
            .iter()
            .map(|label| table.classify(Some(label)))
            .collect()
    }

    /// Most valuable group among the accumulated labels, for the badge
    pub fn top_rarity(&self, table: &RarityTable) -> RarityGroup {
        self.rarities
            .iter()
            .map(|label| table.classify(Some(label)))
            .max_by_key(|group| group.priority())
            .unwrap_or(RarityGroup::Unknown)
    }

    /// True when at least one accumulated label falls in `group`
    pub fn matches_rarity(&self, table: &RarityTable, group: RarityGroup) -> bool {
        self.rarities
            .iter()
            .any(|label| table.classify(Some(label)) == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(card_id: i64, set_code: Option<&str>, image_id: Option<i64>) -> PrintingRow {
        PrintingRow {
            set_code: set_code.map(str::to_string),
            image_id,
            ..PrintingRow::new(card_id, "Dark Magician", "Normal Monster")
        }
    }

    #[test]
    fn test_key_keeps_missing_set_apart_from_real_codes() {
        let missing = DisplayKey::for_row(&row(1, None, None), AggregationMode::PerSet);
        let named = DisplayKey::for_row(&row(1, Some("none"), None), AggregationMode::PerSet);
        assert_ne!(missing, named);
        assert_eq!(missing.set, SetSlot::Unset);
    }

    #[test]
    fn test_key_keeps_missing_artwork_apart() {
        let base = DisplayKey::for_row(&row(1, Some("LOB-005"), None), AggregationMode::PerSet);
        let alt = DisplayKey::for_row(&row(1, Some("LOB-005"), Some(1)), AggregationMode::PerSet);
        assert_ne!(base, alt);
    }

    #[test]
    fn test_full_mode_collapses_sets() {
        let a = DisplayKey::for_row(&row(7, Some("LOB-005"), Some(7)), AggregationMode::Full);
        let b = DisplayKey::for_row(&row(7, Some("SDY-006"), Some(7)), AggregationMode::Full);
        let c = DisplayKey::for_row(&row(7, None, Some(7)), AggregationMode::Full);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.set, SetSlot::Collapsed);
    }

    #[test]
    fn test_blank_rarity_is_not_a_label() {
        let mut r = row(1, None, None);
        assert_eq!(r.rarity_label(), None);
        r.rarity = Some("  ".into());
        assert_eq!(r.rarity_label(), None);
        r.rarity = Some("Rare".into());
        assert_eq!(r.rarity_label(), Some("Rare"));
    }

    #[test]
    fn test_top_rarity_prefers_known_groups() {
        let table = RarityTable::standard().unwrap();
        let entity = CardDisplayEntity {
            key: DisplayKey::for_row(&row(1, None, None), AggregationMode::PerSet),
            card: row(1, None, None),
            rarities: vec!["Mystery".into(), "Common".into(), "Secret Rare".into()],
        };
        assert_eq!(entity.top_rarity(&table), RarityGroup::SecretRare);
        assert!(entity.matches_rarity(&table, RarityGroup::Common));
        assert!(!entity.matches_rarity(&table, RarityGroup::GhostRare));
        assert_eq!(
            entity.rarity_groups(&table),
            vec![
                RarityGroup::Unknown,
                RarityGroup::Common,
                RarityGroup::SecretRare
            ]
        );
    }

    #[test]
    fn test_printing_key_display() {
        let key = PrintingKey::new(89631139, None, Some("Ultra Rare".into()));
        assert_eq!(key.to_string(), "card 89631139 (no set, Ultra Rare)");
    }
}
