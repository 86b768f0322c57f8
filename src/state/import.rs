//! YGOPRODeck `cardinfo.php` import
//!
//! Loads a saved API response into the catalog. Artwork files are not
//! downloaded; each artwork is registered under its conventional local path.

use std::io::Read;

use log::{debug, info};
use serde::Deserialize;

use super::library::{CardRecord, Library, MarketPrices, SetPrinting};
use crate::error::StoreError;

/// Top level of a cardinfo response
#[derive(Debug, Deserialize)]
pub struct CardInfoResponse {
    #[serde(default)]
    pub data: Vec<ApiCard>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCard {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub card_type: String,
    #[serde(rename = "frameType")]
    pub frame_type: Option<String>,
    pub desc: Option<String>,
    pub race: Option<String>,
    pub attribute: Option<String>,
    pub archetype: Option<String>,
    pub atk: Option<i64>,
    pub def: Option<i64>,
    pub level: Option<i64>,
    #[serde(default)]
    pub card_sets: Vec<ApiSet>,
    #[serde(default)]
    pub card_images: Vec<ApiImage>,
    #[serde(default)]
    pub card_prices: Vec<ApiPrices>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSet {
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub set_rarity: Option<String>,
    pub set_price: Option<PriceField>,
}

/// Prices usually arrive as strings ("1.23") but numbers are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Text(String),
    Number(f64),
}

impl PriceField {
    fn into_text(self) -> String {
        match self {
            PriceField::Text(text) => text,
            PriceField::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiPrices {
    pub tcgplayer_price: Option<PriceField>,
    pub ebay_price: Option<PriceField>,
    pub amazon_price: Option<PriceField>,
    pub cardmarket_price: Option<PriceField>,
}

impl From<ApiPrices> for MarketPrices {
    fn from(prices: ApiPrices) -> Self {
        MarketPrices {
            tcgplayer: prices.tcgplayer_price.map(PriceField::into_text),
            ebay: prices.ebay_price.map(PriceField::into_text),
            amazon: prices.amazon_price.map(PriceField::into_text),
            cardmarket: prices.cardmarket_price.map(PriceField::into_text),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiImage {
    pub id: i64,
}

/// Result of one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub cards: usize,
    pub printings: usize,
    /// Newly registered artworks
    pub images: usize,
    /// Nameless cards and already known artworks
    pub skipped: usize,
}

/// Local path an artwork is registered under
pub fn image_reference(card_id: i64, image_id: i64) -> String {
    format!("img/{card_id}_{image_id}.jpg")
}

/// Import a cardinfo JSON document in a single transaction.
/// Owned quantities of printings already in the catalog are kept.
pub fn import_cardinfo<R: Read>(library: &mut Library, reader: R) -> Result<ImportResult, StoreError> {
    let response: CardInfoResponse = serde_json::from_reader(reader)?;
    debug!("Parsed {} cards from cardinfo payload", response.data.len());

    let result = library.transaction(|lib| {
        let mut result = ImportResult::default();

        for card in response.data {
            if card.name.trim().is_empty() {
                debug!("Skipping card {} without a name", card.id);
                result.skipped += 1;
                continue;
            }

            lib.upsert_card(&CardRecord {
                id: card.id,
                name: card.name,
                card_type: card.card_type,
                frame_type: card.frame_type,
                desc: card.desc,
                race: card.race,
                attribute: card.attribute,
                archetype: card.archetype,
                atk: card.atk,
                def: card.def,
                level: card.level,
            })?;
            result.cards += 1;

            for image in &card.card_images {
                if lib.add_image(card.id, image.id, &image_reference(card.id, image.id))? {
                    result.images += 1;
                } else {
                    result.skipped += 1;
                }
            }
            lib.refresh_alt_art(card.id)?;

            // The API sends a one-element list
            if let Some(prices) = card.card_prices.into_iter().next() {
                lib.upsert_prices(card.id, &prices.into())?;
            }

            for set in card.card_sets {
                lib.upsert_printing(
                    card.id,
                    &SetPrinting {
                        set_code: set.set_code,
                        set_name: set.set_name,
                        set_rarity: set.set_rarity,
                        set_price: set.set_price.map(PriceField::into_text),
                    },
                )?;
                result.printings += 1;
            }
        }

        Ok(result)
    })?;

    info!(
        "Import complete: {} cards, {} printings, {} new images, {} skipped",
        result.cards, result.printings, result.images, result.skipped
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::library::CatalogStore;

    const PAYLOAD: &str = r#"{
        "data": [
            {
                "id": 46986414,
                "name": "Dark Magician",
                "type": "Normal Monster",
                "frameType": "normal",
                "desc": "The ultimate wizard in terms of attack and defense.",
                "race": "Spellcaster",
                "attribute": "DARK",
                "archetype": "Dark Magician",
                "card_sets": [
                    { "set_name": "Legend of Blue Eyes White Dragon", "set_code": "LOB-005",
                      "set_rarity": "Ultra Rare", "set_rarity_code": "(UR)", "set_price": "12.50" },
                    { "set_name": "Starter Deck: Yugi", "set_code": "SDY-006",
                      "set_rarity": "Ultra Rare", "set_price": 3.1 }
                ],
                "card_images": [
                    { "id": 46986414, "image_url": "https://example.invalid/46986414.jpg" },
                    { "id": 36996508 }
                ],
                "card_prices": [{ "tcgplayer_price": "0.20" }]
            },
            {
                "id": 5318639,
                "name": "Mystical Space Typhoon",
                "type": "Spell Card",
                "card_images": [{ "id": 5318639 }]
            },
            { "id": 1, "name": "  " }
        ]
    }"#;

    #[test]
    fn test_import_counts() {
        let mut library = Library::open_in_memory().unwrap();
        let result = import_cardinfo(&mut library, PAYLOAD.as_bytes()).unwrap();

        assert_eq!(
            result,
            ImportResult {
                cards: 2,
                printings: 2,
                images: 3,
                skipped: 1,
            }
        );
        assert_eq!(library.card_count().unwrap(), 2);
        assert_eq!(
            library.list_all_sets().unwrap(),
            vec!["Legend of Blue Eyes White Dragon", "Starter Deck: Yugi"]
        );
    }

    #[test]
    fn test_reimport_keeps_quantities_and_skips_known_images() {
        let mut library = Library::open_in_memory().unwrap();
        import_cardinfo(&mut library, PAYLOAD.as_bytes()).unwrap();
        library
            .persist_quantity(46986414, Some("LOB-005"), Some("Ultra Rare"), 3)
            .unwrap();

        let result = import_cardinfo(&mut library, PAYLOAD.as_bytes()).unwrap();
        assert_eq!(result.images, 0);
        assert_eq!(result.skipped, 4);

        let rows = library.get_by_set("Legend of Blue Eyes White Dragon").unwrap();
        assert!(rows.iter().all(|r| r.quantity == Some(3)));
        assert!(rows.iter().all(|r| r.price == Some(12.5)));
    }

    #[test]
    fn test_artworks_are_registered_with_local_paths() {
        let mut library = Library::open_in_memory().unwrap();
        import_cardinfo(&mut library, PAYLOAD.as_bytes()).unwrap();

        let rows = library.search_by_name("Typhoon").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].image_path.as_deref(), Some("img/5318639_5318639.jpg"));
        assert_eq!(rows[0].set_code, None);
    }

    #[test]
    fn test_stats_prices_and_alt_art_are_stored() {
        let mut library = Library::open_in_memory().unwrap();
        import_cardinfo(
            &mut library,
            r#"{ "data": [ {
                "id": 46986414, "name": "Dark Magician", "type": "Normal Monster",
                "atk": 2500, "def": 2100, "level": 7,
                "card_images": [{ "id": 46986414 }, { "id": 36996508 }],
                "card_prices": [{ "tcgplayer_price": "0.20", "ebay_price": "1.99",
                                  "amazon_price": 2.5, "cardmarket_price": "0.11" }]
            } ] }"#
                .as_bytes(),
        )
        .unwrap();

        let card = library.card(46986414).unwrap().unwrap();
        assert_eq!((card.atk, card.def, card.level), (Some(2500), Some(2100), Some(7)));
        assert!(library.has_alt_art(46986414).unwrap());
        assert_eq!(
            library.market_prices(46986414).unwrap(),
            Some(MarketPrices {
                tcgplayer: Some("0.20".into()),
                ebay: Some("1.99".into()),
                amazon: Some("2.5".into()),
                cardmarket: Some("0.11".into()),
            })
        );
    }

    #[test]
    fn test_single_artwork_is_not_alt_art() {
        let mut library = Library::open_in_memory().unwrap();
        import_cardinfo(&mut library, PAYLOAD.as_bytes()).unwrap();
        assert!(library.has_alt_art(46986414).unwrap());
        assert!(!library.has_alt_art(5318639).unwrap());
        assert_eq!(library.market_prices(5318639).unwrap(), None);
    }

    #[test]
    fn test_invalid_payload_leaves_catalog_untouched() {
        let mut library = Library::open_in_memory().unwrap();
        let err = import_cardinfo(&mut library, r#"{ "data": [ { "name": "no id" } ] }"#.as_bytes())
            .unwrap_err();
        assert!(matches!(err, StoreError::Import(_)));
        assert_eq!(library.card_count().unwrap(), 0);
    }
}
