//! Rarity classification
//!
//! The store hands us free-text rarity labels ("Ultra Rare", "UR",
//! "Quarter Century Secret Rare", ...). This module maps each label onto a
//! closed set of canonical groups, each with a display color and an icon.
//!
//! The three lookup tables (synonyms, colors, icons) are plain static data
//! and are cross-checked once when a [`RarityTable`] is built.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;

/// Canonical rarity groups, declared in canonical order
///
/// The declaration order is the iteration order used by
/// [`RarityTable::classify`] and defines [`RarityGroup::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityGroup {
    Common,
    Rare,
    SuperRare,
    UltraRare,
    SecretRare,
    UltimateRare,
    GhostRare,
    StarlightRare,
    QuarterCenturySecretRare,
    CollectorsRare,
    PrismaticSecretRare,
    PlatinumSecretRare,
    GoldRare,
    ParallelRare,
    MosaicRare,
    StarfoilRare,
    ShatterfoilRare,
    Unknown,
}

impl RarityGroup {
    /// Every group, in canonical order
    pub const ALL: [RarityGroup; 18] = [
        RarityGroup::Common,
        RarityGroup::Rare,
        RarityGroup::SuperRare,
        RarityGroup::UltraRare,
        RarityGroup::SecretRare,
        RarityGroup::UltimateRare,
        RarityGroup::GhostRare,
        RarityGroup::StarlightRare,
        RarityGroup::QuarterCenturySecretRare,
        RarityGroup::CollectorsRare,
        RarityGroup::PrismaticSecretRare,
        RarityGroup::PlatinumSecretRare,
        RarityGroup::GoldRare,
        RarityGroup::ParallelRare,
        RarityGroup::MosaicRare,
        RarityGroup::StarfoilRare,
        RarityGroup::ShatterfoilRare,
        RarityGroup::Unknown,
    ];

    /// Stable snake_case identifier (matches the serde representation)
    pub fn as_str(self) -> &'static str {
        match self {
            RarityGroup::Common => "common",
            RarityGroup::Rare => "rare",
            RarityGroup::SuperRare => "super_rare",
            RarityGroup::UltraRare => "ultra_rare",
            RarityGroup::SecretRare => "secret_rare",
            RarityGroup::UltimateRare => "ultimate_rare",
            RarityGroup::GhostRare => "ghost_rare",
            RarityGroup::StarlightRare => "starlight_rare",
            RarityGroup::QuarterCenturySecretRare => "quarter_century_secret_rare",
            RarityGroup::CollectorsRare => "collectors_rare",
            RarityGroup::PrismaticSecretRare => "prismatic_secret_rare",
            RarityGroup::PlatinumSecretRare => "platinum_secret_rare",
            RarityGroup::GoldRare => "gold_rare",
            RarityGroup::ParallelRare => "parallel_rare",
            RarityGroup::MosaicRare => "mosaic_rare",
            RarityGroup::StarfoilRare => "starfoil_rare",
            RarityGroup::ShatterfoilRare => "shatterfoil_rare",
            RarityGroup::Unknown => "unknown",
        }
    }

    /// Position in canonical order
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Badge priority: higher wins, `Unknown` never beats a known group
    pub fn priority(self) -> usize {
        match self {
            RarityGroup::Unknown => 0,
            group => group.rank() + 1,
        }
    }
}

impl fmt::Display for RarityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rarity group {0:?}")]
pub struct UnknownRarityGroup(pub String);

impl FromStr for RarityGroup {
    type Err = UnknownRarityGroup;

    /// Accepts the snake_case identifier as well as spaced or hyphenated forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                '\'' => '\0',
                c => c.to_ascii_lowercase(),
            })
            .filter(|c| *c != '\0')
            .collect();

        RarityGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == wanted)
            .ok_or_else(|| UnknownRarityGroup(s.to_string()))
    }
}

/// Raw label synonyms per group (matched after trim + lowercase)
const SYNONYMS: &[(RarityGroup, &[&str])] = &[
    (
        RarityGroup::Common,
        &["Common", "C", "Short Print", "SP", "Super Short Print", "SSP"],
    ),
    (RarityGroup::Rare, &["Rare", "R"]),
    (RarityGroup::SuperRare, &["Super Rare", "SR"]),
    (
        RarityGroup::UltraRare,
        &["Ultra Rare", "UR", "Ultra Rare (Pharaoh's Rare)", "Pharaoh's Rare"],
    ),
    (
        RarityGroup::SecretRare,
        &[
            "Secret Rare",
            "ScR",
            "Extra Secret Rare",
            "Ultra Secret Rare",
            "10000 Secret Rare",
            "Secret Pharaoh's Rare",
        ],
    ),
    (RarityGroup::UltimateRare, &["Ultimate Rare", "UtR"]),
    (
        RarityGroup::GhostRare,
        &["Ghost Rare", "GR", "Ghost/Gold Rare", "Holographic Rare"],
    ),
    (RarityGroup::StarlightRare, &["Starlight Rare", "StR", "Starlight"]),
    (
        RarityGroup::QuarterCenturySecretRare,
        &["Quarter Century Secret Rare", "QCSR", "QCScR"],
    ),
    (
        RarityGroup::CollectorsRare,
        &["Collector's Rare", "Collectors Rare", "CR"],
    ),
    (RarityGroup::PrismaticSecretRare, &["Prismatic Secret Rare", "PScR"]),
    (
        RarityGroup::PlatinumSecretRare,
        &["Platinum Secret Rare", "PlScR", "Platinum Rare", "PlR"],
    ),
    (
        RarityGroup::GoldRare,
        &[
            "Gold Rare",
            "GUR",
            "Premium Gold Rare",
            "PGR",
            "Gold Secret Rare",
            "GScR",
        ],
    ),
    (
        RarityGroup::ParallelRare,
        &[
            "Parallel Rare",
            "Normal Parallel Rare",
            "NPR",
            "Super Parallel Rare",
            "SPR",
            "Ultra Parallel Rare",
            "UPR",
            "Duel Terminal Normal Parallel Rare",
            "DNPR",
            "Duel Terminal Rare Parallel Rare",
            "DRPR",
            "Duel Terminal Super Parallel Rare",
            "DSPR",
            "Duel Terminal Ultra Parallel Rare",
            "DUPR",
        ],
    ),
    (RarityGroup::MosaicRare, &["Mosaic Rare", "MSR"]),
    (RarityGroup::StarfoilRare, &["Starfoil Rare", "SFR", "Starfoil"]),
    (RarityGroup::ShatterfoilRare, &["Shatterfoil Rare", "SHR", "Shatterfoil"]),
    (RarityGroup::Unknown, &["Unknown", "?"]),
];

/// Badge colors (hex RGB)
const COLORS: &[(RarityGroup, &str)] = &[
    (RarityGroup::Common, "#9e9e9e"),
    (RarityGroup::Rare, "#c0c0c0"),
    (RarityGroup::SuperRare, "#4fc3f7"),
    (RarityGroup::UltraRare, "#ffd54f"),
    (RarityGroup::SecretRare, "#e1bee7"),
    (RarityGroup::UltimateRare, "#8d6e63"),
    (RarityGroup::GhostRare, "#eceff1"),
    (RarityGroup::StarlightRare, "#fff59d"),
    (RarityGroup::QuarterCenturySecretRare, "#ff8a65"),
    (RarityGroup::CollectorsRare, "#80cbc4"),
    (RarityGroup::PrismaticSecretRare, "#b39ddb"),
    (RarityGroup::PlatinumSecretRare, "#cfd8dc"),
    (RarityGroup::GoldRare, "#ffb300"),
    (RarityGroup::ParallelRare, "#90caf9"),
    (RarityGroup::MosaicRare, "#a5d6a7"),
    (RarityGroup::StarfoilRare, "#f48fb1"),
    (RarityGroup::ShatterfoilRare, "#ce93d8"),
    (RarityGroup::Unknown, "#616161"),
];

/// Icon references, relative to the asset directory
const ICONS: &[(RarityGroup, &str)] = &[
    (RarityGroup::Common, "icons/rarity/common.png"),
    (RarityGroup::Rare, "icons/rarity/rare.png"),
    (RarityGroup::SuperRare, "icons/rarity/super_rare.png"),
    (RarityGroup::UltraRare, "icons/rarity/ultra_rare.png"),
    (RarityGroup::SecretRare, "icons/rarity/secret_rare.png"),
    (RarityGroup::UltimateRare, "icons/rarity/ultimate_rare.png"),
    (RarityGroup::GhostRare, "icons/rarity/ghost_rare.png"),
    (RarityGroup::StarlightRare, "icons/rarity/starlight_rare.png"),
    (RarityGroup::QuarterCenturySecretRare, "icons/rarity/qcsr.png"),
    (RarityGroup::CollectorsRare, "icons/rarity/collectors_rare.png"),
    (RarityGroup::PrismaticSecretRare, "icons/rarity/prismatic_secret_rare.png"),
    (RarityGroup::PlatinumSecretRare, "icons/rarity/platinum_secret_rare.png"),
    (RarityGroup::GoldRare, "icons/rarity/gold_rare.png"),
    (RarityGroup::ParallelRare, "icons/rarity/parallel_rare.png"),
    (RarityGroup::MosaicRare, "icons/rarity/mosaic_rare.png"),
    (RarityGroup::StarfoilRare, "icons/rarity/starfoil_rare.png"),
    (RarityGroup::ShatterfoilRare, "icons/rarity/shatterfoil_rare.png"),
    (RarityGroup::Unknown, "icons/rarity/unknown.png"),
];

/// Normalize a raw label for matching: trim + lowercase
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct GroupEntry {
    group: RarityGroup,
    /// Normalized, unique across the whole table
    synonyms: Vec<String>,
    color: String,
    icon: String,
}

/// Validated rarity lookup tables
///
/// Holds exactly one entry per [`RarityGroup`], stored in canonical order.
#[derive(Debug, Clone)]
pub struct RarityTable {
    entries: Vec<GroupEntry>,
}

impl RarityTable {
    /// Build the table from the built-in synonym, color and icon tables
    pub fn standard() -> Result<Self, ConfigError> {
        Self::with_extra_synonyms(&BTreeMap::new())
    }

    /// Built-in tables plus user configured synonyms
    ///
    /// An extra synonym that already belongs to another group is rejected
    /// the same way a conflict inside the built-in table would be.
    pub fn with_extra_synonyms(
        extra: &BTreeMap<RarityGroup, Vec<String>>,
    ) -> Result<Self, ConfigError> {
        let mut synonyms: Vec<(RarityGroup, Vec<String>)> = SYNONYMS
            .iter()
            .map(|(group, labels)| (*group, labels.iter().map(|l| l.to_string()).collect()))
            .collect();

        for (group, labels) in extra {
            match synonyms.iter_mut().find(|(g, _)| g == group) {
                Some((_, list)) => list.extend(labels.iter().cloned()),
                None => synonyms.push((*group, labels.clone())),
            }
        }

        let colors: Vec<(RarityGroup, String)> = COLORS
            .iter()
            .map(|(group, color)| (*group, color.to_string()))
            .collect();
        let icons: Vec<(RarityGroup, String)> = ICONS
            .iter()
            .map(|(group, icon)| (*group, icon.to_string()))
            .collect();

        Self::from_tables(&synonyms, &colors, &icons)
    }

    /// Cross-check and assemble the three lookup tables
    ///
    /// Fails when a table lists a group twice, when a group is missing from
    /// any table, when a synonym is empty, or when a synonym belongs to two
    /// groups.
    pub fn from_tables(
        synonyms: &[(RarityGroup, Vec<String>)],
        colors: &[(RarityGroup, String)],
        icons: &[(RarityGroup, String)],
    ) -> Result<Self, ConfigError> {
        let synonym_map = index_table(synonyms, "synonym")?;
        let color_map = index_table(colors, "color")?;
        let icon_map = index_table(icons, "icon")?;

        let mut owners: HashMap<String, RarityGroup> = HashMap::new();
        let mut entries = Vec::with_capacity(RarityGroup::ALL.len());

        for group in RarityGroup::ALL {
            let labels = synonym_map.get(&group).ok_or(ConfigError::MissingEntry {
                group,
                table: "synonym",
            })?;
            let color = color_map.get(&group).ok_or(ConfigError::MissingEntry {
                group,
                table: "color",
            })?;
            let icon = icon_map.get(&group).ok_or(ConfigError::MissingEntry {
                group,
                table: "icon",
            })?;

            let mut normalized = Vec::with_capacity(labels.len());
            for label in labels.iter() {
                let key = normalize_label(label);
                if key.is_empty() {
                    return Err(ConfigError::EmptySynonym { group });
                }
                match owners.get(&key) {
                    Some(&owner) if owner != group => {
                        return Err(ConfigError::DuplicateSynonym {
                            synonym: key,
                            first: owner,
                            second: group,
                        });
                    }
                    // Repeated within the same group: harmless
                    Some(_) => {}
                    None => {
                        owners.insert(key.clone(), group);
                        normalized.push(key);
                    }
                }
            }

            entries.push(GroupEntry {
                group,
                synonyms: normalized,
                color: color.to_string(),
                icon: icon.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// Map a raw label to its canonical group. Total: never fails.
    pub fn classify(&self, raw: Option<&str>) -> RarityGroup {
        raw.and_then(|label| self.lookup(label))
            .unwrap_or(RarityGroup::Unknown)
    }

    /// Like [`classify`](Self::classify) but `None` when no synonym matches
    pub fn lookup(&self, raw: &str) -> Option<RarityGroup> {
        let label = normalize_label(raw);
        if label.is_empty() {
            return None;
        }

        // Canonical order, first match wins
        self.entries
            .iter()
            .find(|entry| entry.synonyms.iter().any(|s| *s == label))
            .map(|entry| entry.group)
    }

    /// Display color for a group
    pub fn color(&self, group: RarityGroup) -> &str {
        &self.entry(group).color
    }

    /// Icon reference for a group
    pub fn icon(&self, group: RarityGroup) -> &str {
        &self.entry(group).icon
    }

    /// Normalized synonyms of a group
    pub fn synonyms(&self, group: RarityGroup) -> &[String] {
        &self.entry(group).synonyms
    }

    /// Labels (as delivered by the store) that no synonym covers
    ///
    /// Each label is reported once, in first-seen order.
    pub fn audit_labels<I, S>(&self, labels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unmatched: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref();
            if self.lookup(label).is_none() && !unmatched.iter().any(|l| l == label) {
                unmatched.push(label.to_string());
            }
        }
        unmatched
    }

    fn entry(&self, group: RarityGroup) -> &GroupEntry {
        // from_tables stores exactly one entry per group, in canonical order
        &self.entries[group.rank()]
    }
}

fn index_table<'a, T>(
    table: &'a [(RarityGroup, T)],
    name: &'static str,
) -> Result<HashMap<RarityGroup, &'a T>, ConfigError> {
    let mut map = HashMap::with_capacity(table.len());
    for (group, value) in table {
        if map.insert(*group, value).is_some() {
            return Err(ConfigError::DuplicateEntry {
                group: *group,
                table: name,
            });
        }
    }
    Ok(map)
}
