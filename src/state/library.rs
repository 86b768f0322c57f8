use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data::PrintingRow;
use crate::error::StoreError;

/// Boundary to the persistent card catalog
///
/// Every call may fail; callers decide what stays visible on failure.
/// The three scoped searches default to [`load_catalog`](Self::load_catalog).
pub trait CatalogStore {
    /// Distinct set names, ordered
    fn list_all_sets(&self) -> Result<Vec<String>, StoreError>;

    /// All printings matching an optional name substring and an optional set name
    fn load_catalog(
        &self,
        name_filter: Option<&str>,
        set_filter: Option<&str>,
    ) -> Result<Vec<PrintingRow>, StoreError>;

    fn search_by_name(&self, query: &str) -> Result<Vec<PrintingRow>, StoreError> {
        self.load_catalog(Some(query), None)
    }

    fn search_by_name_and_set(
        &self,
        query: &str,
        set_name: &str,
    ) -> Result<Vec<PrintingRow>, StoreError> {
        self.load_catalog(Some(query), Some(set_name))
    }

    fn get_by_set(&self, set_name: &str) -> Result<Vec<PrintingRow>, StoreError> {
        self.load_catalog(None, Some(set_name))
    }

    /// Distinct raw rarity labels present in the catalog
    fn list_all_rarity_labels(&self) -> Result<Vec<String>, StoreError>;

    /// Owned quantity currently stored for one printing; None when the
    /// printing does not exist
    fn quantity_of(
        &self,
        card_id: i64,
        set_code: Option<&str>,
        rarity: Option<&str>,
    ) -> Result<Option<i64>, StoreError>;

    /// Store the absolute owned quantity of one printing
    fn persist_quantity(
        &self,
        card_id: i64,
        set_code: Option<&str>,
        rarity: Option<&str>,
        amount: i64,
    ) -> Result<(), StoreError>;
}

/// Card fields written by the importer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardRecord {
    pub id: i64,
    pub name: String,
    pub card_type: String,
    pub frame_type: Option<String>,
    pub desc: Option<String>,
    pub race: Option<String>,
    pub attribute: Option<String>,
    pub archetype: Option<String>,
    pub atk: Option<i64>,
    pub def: Option<i64>,
    pub level: Option<i64>,
}

/// Per-market prices of a card, kept as delivered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketPrices {
    pub tcgplayer: Option<String>,
    pub ebay: Option<String>,
    pub amazon: Option<String>,
    pub cardmarket: Option<String>,
}

/// One set printing written by the importer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPrinting {
    pub set_code: Option<String>,
    pub set_name: Option<String>,
    pub set_rarity: Option<String>,
    pub set_price: Option<String>,
}

const CATALOG_QUERY: &str = "
    SELECT c.id, c.name, COALESCE(c.type, ''), ci.image_id, ci.local_path,
           cs.set_code, cs.set_name, cs.set_rarity, cs.collection_amount, cs.set_price
    FROM cards c
    LEFT JOIN card_sets cs ON cs.card_id = c.id
    LEFT JOIN card_images ci ON ci.card_id = c.id
    WHERE (?1 IS NULL OR c.name LIKE '%' || ?1 || '%' ESCAPE '\\')
      AND (?2 IS NULL OR cs.set_name = ?2)
    ORDER BY c.name COLLATE NOCASE, c.id, ci.image_id, cs.set_code, cs.rowid";

/// The Library manages the SQLite card catalog.
/// It stores cards, their artworks, their set printings and owned quantities.
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open (or create) the catalog database at `path` and initialize the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        // Ensure the parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!("Catalog database opened at {}", path.display());

        let library = Library {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// A private in-memory catalog, mostly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Where the database lives by default:
    /// - Linux: ~/.local/share/ygo-catalog/cards.db
    /// - macOS: ~/Library/Application Support/ygo-catalog/cards.db
    /// - Windows: %APPDATA%\ygo-catalog\cards.db
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("ygo-catalog");
        path.push("cards.db");
        Some(path)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cards (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL,
                type            TEXT,
                frame_type      TEXT,
                desc            TEXT,
                race            TEXT,
                attribute       TEXT,
                archetype       TEXT
            );

            CREATE TABLE IF NOT EXISTS card_images (
                card_id         INTEGER NOT NULL,
                image_id        INTEGER NOT NULL,
                local_path      TEXT,
                PRIMARY KEY (card_id, image_id)
            );

            CREATE TABLE IF NOT EXISTS card_sets (
                card_id             INTEGER NOT NULL,
                set_code            TEXT,
                set_name            TEXT,
                set_rarity          TEXT,
                set_price           TEXT,
                collection_amount   INTEGER NOT NULL DEFAULT 0,
                UNIQUE (card_id, set_code, set_rarity)
            );

            CREATE TABLE IF NOT EXISTS card_prices (
                card_id             INTEGER PRIMARY KEY,
                tcgplayer_price     TEXT,
                ebay_price          TEXT,
                amazon_price        TEXT,
                cardmarket_price    TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name);
            CREATE INDEX IF NOT EXISTS idx_card_sets_set_name ON card_sets(set_name);",
        )?;

        // Add updated_at column if it doesn't exist (for existing databases).
        // Fails harmlessly when the column is already there.
        let _ = self
            .conn
            .execute("ALTER TABLE card_sets ADD COLUMN updated_at INTEGER", []);

        // Same for monster stats and the alternate artwork flag
        for column in [
            "atk INTEGER",
            "def INTEGER",
            "level INTEGER",
            "has_alt_art INTEGER NOT NULL DEFAULT 0",
        ] {
            let _ = self
                .conn
                .execute(&format!("ALTER TABLE cards ADD COLUMN {column}"), []);
        }

        debug!("Catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file (None for in-memory catalogs)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get a count of cards in the catalog
    pub fn card_count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert or refresh a card
    pub fn upsert_card(&self, card: &CardRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO cards (id, name, type, frame_type, desc, race, attribute, archetype, atk, def, level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                type = excluded.type,
                frame_type = excluded.frame_type,
                desc = excluded.desc,
                race = excluded.race,
                attribute = excluded.attribute,
                archetype = excluded.archetype,
                atk = excluded.atk,
                def = excluded.def,
                level = excluded.level",
            params![
                card.id,
                card.name,
                card.card_type,
                card.frame_type,
                card.desc,
                card.race,
                card.attribute,
                card.archetype,
                card.atk,
                card.def,
                card.level,
            ],
        )?;
        Ok(())
    }

    /// Register an artwork; existing entries are left untouched.
    /// Returns true when a new artwork was added.
    pub fn add_image(&self, card_id: i64, image_id: i64, local_path: &str) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO card_images (card_id, image_id, local_path) VALUES (?1, ?2, ?3)",
            params![card_id, image_id, local_path],
        )?;
        Ok(inserted > 0)
    }

    /// Stored fields of one card
    pub fn card(&self, card_id: i64) -> Result<Option<CardRecord>, StoreError> {
        let card = self
            .conn
            .query_row(
                "SELECT id, name, COALESCE(type, ''), frame_type, desc, race, attribute,
                        archetype, atk, def, level
                 FROM cards WHERE id = ?1",
                params![card_id],
                |row| {
                    Ok(CardRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        card_type: row.get(2)?,
                        frame_type: row.get(3)?,
                        desc: row.get(4)?,
                        race: row.get(5)?,
                        attribute: row.get(6)?,
                        archetype: row.get(7)?,
                        atk: row.get(8)?,
                        def: row.get(9)?,
                        level: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(card)
    }

    /// Recompute the alternate artwork flag from the registered artworks
    pub fn refresh_alt_art(&self, card_id: i64) -> Result<bool, StoreError> {
        self.conn.execute(
            "UPDATE cards SET has_alt_art =
                (SELECT COUNT(*) > 1 FROM card_images WHERE card_id = ?1)
             WHERE id = ?1",
            params![card_id],
        )?;
        self.has_alt_art(card_id)
    }

    /// True when more than one artwork is known for the card
    pub fn has_alt_art(&self, card_id: i64) -> Result<bool, StoreError> {
        let flag: Option<i64> = self
            .conn
            .query_row(
                "SELECT has_alt_art FROM cards WHERE id = ?1",
                params![card_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.unwrap_or(0) != 0)
    }

    /// Replace the market prices of a card
    pub fn upsert_prices(&self, card_id: i64, prices: &MarketPrices) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO card_prices (card_id, tcgplayer_price, ebay_price, amazon_price, cardmarket_price)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(card_id) DO UPDATE SET
                tcgplayer_price = excluded.tcgplayer_price,
                ebay_price = excluded.ebay_price,
                amazon_price = excluded.amazon_price,
                cardmarket_price = excluded.cardmarket_price",
            params![
                card_id,
                prices.tcgplayer,
                prices.ebay,
                prices.amazon,
                prices.cardmarket,
            ],
        )?;
        Ok(())
    }

    pub fn market_prices(&self, card_id: i64) -> Result<Option<MarketPrices>, StoreError> {
        let prices = self
            .conn
            .query_row(
                "SELECT tcgplayer_price, ebay_price, amazon_price, cardmarket_price
                 FROM card_prices WHERE card_id = ?1",
                params![card_id],
                |row| {
                    Ok(MarketPrices {
                        tcgplayer: row.get(0)?,
                        ebay: row.get(1)?,
                        amazon: row.get(2)?,
                        cardmarket: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(prices)
    }

    /// Insert a printing, or refresh its set name and price.
    /// The owned quantity of an existing printing is preserved.
    pub fn upsert_printing(&self, card_id: i64, printing: &SetPrinting) -> Result<(), StoreError> {
        // UNIQUE does not fire for NULL columns, so look the row up with IS first
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT rowid FROM card_sets
                 WHERE card_id = ?1 AND set_code IS ?2 AND set_rarity IS ?3",
                params![card_id, printing.set_code, printing.set_rarity],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(rowid) => {
                self.conn.execute(
                    "UPDATE card_sets SET set_name = ?1, set_price = ?2 WHERE rowid = ?3",
                    params![printing.set_name, printing.set_price, rowid],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO card_sets (card_id, set_code, set_name, set_rarity, set_price, collection_amount)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                    params![
                        card_id,
                        printing.set_code,
                        printing.set_name,
                        printing.set_rarity,
                        printing.set_price,
                    ],
                )?;
            }
        }
        Ok(())
    }

    /// Run `f` inside a single transaction (committed on Ok, rolled back on Err)
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&Library) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.conn.execute_batch("BEGIN")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<PrintingRow> {
        let price: Option<String> = row.get(9)?;
        Ok(PrintingRow {
            card_id: row.get(0)?,
            name: row.get(1)?,
            card_type: row.get(2)?,
            image_id: row.get(3)?,
            image_path: row.get(4)?,
            set_code: row.get(5)?,
            set_name: row.get(6)?,
            rarity: row.get(7)?,
            quantity: row.get(8)?,
            price: price.and_then(|p| p.trim().parse::<f64>().ok()),
        })
    }
}

impl CatalogStore for Library {
    fn list_all_sets(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT set_name FROM card_sets WHERE set_name IS NOT NULL ORDER BY set_name",
        )?;
        let sets = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(sets)
    }

    fn load_catalog(
        &self,
        name_filter: Option<&str>,
        set_filter: Option<&str>,
    ) -> Result<Vec<PrintingRow>, StoreError> {
        let pattern = name_filter.map(escape_like);
        let mut stmt = self.conn.prepare_cached(CATALOG_QUERY)?;
        let rows = stmt
            .query_map(params![pattern, set_filter], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Catalog query name={:?} set={:?} returned {} rows",
            name_filter,
            set_filter,
            rows.len()
        );
        Ok(rows)
    }

    fn list_all_rarity_labels(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT set_rarity FROM card_sets WHERE set_rarity IS NOT NULL ORDER BY set_rarity",
        )?;
        let labels = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(labels)
    }

    fn quantity_of(
        &self,
        card_id: i64,
        set_code: Option<&str>,
        rarity: Option<&str>,
    ) -> Result<Option<i64>, StoreError> {
        let amount = self
            .conn
            .query_row(
                "SELECT collection_amount FROM card_sets
                 WHERE card_id = ?1 AND set_code IS ?2 AND set_rarity IS ?3",
                params![card_id, set_code, rarity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(amount)
    }

    fn persist_quantity(
        &self,
        card_id: i64,
        set_code: Option<&str>,
        rarity: Option<&str>,
        amount: i64,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE card_sets SET collection_amount = ?1, updated_at = ?2
             WHERE card_id = ?3 AND set_code IS ?4 AND set_rarity IS ?5",
            params![amount, Utc::now().timestamp(), card_id, set_code, rarity],
        )?;

        if updated == 0 {
            return Err(StoreError::NoSuchPrinting {
                card_id,
                set_code: set_code.map(str::to_string),
                rarity: rarity.map(str::to_string),
            });
        }
        Ok(())
    }
}

/// Escape LIKE wildcards so the name filter is a plain substring match
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
