//! Filter orchestration
//!
//! The orchestrator owns the current search criteria and the visible entity
//! list. It never touches the store or a clock itself: every mutator returns
//! the [`Command`]s a driver has to carry out (start a timer, run a query,
//! abandon a superseded one), and the driver feeds results back through
//! [`FilterOrchestrator::debounce_elapsed`] and
//! [`FilterOrchestrator::apply_response`].
//!
//! Every dispatched query bumps a generation counter. Only a response for the
//! current generation is applied; anything older is dropped, whatever order
//! responses arrive in.

use std::time::Duration;

use log::{debug, info, warn};

use super::aggregate::{aggregate, filter_by_rarity};
use crate::error::{CatalogError, StoreError};
use crate::rarity::{RarityGroup, RarityTable};
use crate::state::data::{AggregationMode, CardDisplayEntity, PrintingRow};
use crate::state::library::CatalogStore;

/// Set filter sentinel meaning "every set"
pub const ALL_SETS: &str = "ALL";

/// Shortest trimmed name (in characters) that triggers a search
pub const MIN_NAME_LEN: usize = 2;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SetFilter {
    #[default]
    All,
    Named(String),
}

impl SetFilter {
    /// Parse user input; blank or [`ALL_SETS`] means no set filter
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == ALL_SETS {
            SetFilter::All
        } else {
            SetFilter::Named(text.to_string())
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            SetFilter::All => None,
            SetFilter::Named(name) => Some(name),
        }
    }
}

/// Current search state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    /// Trimmed name substring; None when no name filter is active
    pub name: Option<String>,
    pub set: SetFilter,
    /// Applied locally to the aggregated entities, never sent to the store
    pub rarity: Option<RarityGroup>,
    /// Case-insensitive card type substring, applied locally like `rarity`
    pub card_type: Option<String>,
    /// Generation of the most recently dispatched query
    pub generation: u64,
}

/// The store call matching a combination of criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    All,
    BySet(String),
    ByName(String),
    ByNameAndSet { name: String, set: String },
}

impl CatalogQuery {
    pub fn for_criteria(criteria: &FilterCriteria) -> Self {
        match (criteria.name.as_deref(), criteria.set.as_name()) {
            (None, None) => CatalogQuery::All,
            (None, Some(set)) => CatalogQuery::BySet(set.to_string()),
            (Some(name), None) => CatalogQuery::ByName(name.to_string()),
            (Some(name), Some(set)) => CatalogQuery::ByNameAndSet {
                name: name.to_string(),
                set: set.to_string(),
            },
        }
    }

    /// Issue this query against `store`
    pub fn run<S: CatalogStore + ?Sized>(&self, store: &S) -> Result<Vec<PrintingRow>, StoreError> {
        match self {
            CatalogQuery::All => store.load_catalog(None, None),
            CatalogQuery::BySet(set) => store.get_by_set(set),
            CatalogQuery::ByName(name) => store.search_by_name(name),
            CatalogQuery::ByNameAndSet { name, set } => store.search_by_name_and_set(name, set),
        }
    }
}

/// Where the orchestrator is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    Idle,
    /// A name edit is waiting for the debounce window to close
    PendingDebounce,
    /// A query is in flight
    Querying,
}

/// Work the driver must perform on behalf of the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Call back [`FilterOrchestrator::debounce_elapsed`] with `ticket` after `delay`
    StartDebounce { ticket: u64, delay: Duration },
    /// The timer for `ticket` is obsolete
    CancelDebounce { ticket: u64 },
    /// Run `query` and report back with `generation`
    Query { generation: u64, query: CatalogQuery },
    /// The query for `generation` was superseded; its result will be ignored
    Abandon { generation: u64 },
    /// Load the set list (initial activation only)
    FetchSets,
}

/// What happened to a query response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// New entities are visible
    Applied { entities: usize },
    /// Superseded response, dropped without touching visible state
    Stale { generation: u64, current: u64 },
    /// The store call failed; previous entities stay visible
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    pub debounce: Duration,
    pub min_name_len: usize,
    pub mode: AggregationMode,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_name_len: MIN_NAME_LEN,
            mode: AggregationMode::PerSet,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingName {
    ticket: u64,
    name: String,
}

/// Owner of the filter criteria and of the visible entity list
#[derive(Debug)]
pub struct FilterOrchestrator {
    settings: FilterSettings,
    rarities: RarityTable,
    criteria: FilterCriteria,
    activated: bool,
    pending_name: Option<PendingName>,
    next_ticket: u64,
    in_flight: Option<u64>,
    rows: Vec<PrintingRow>,
    entities: Vec<CardDisplayEntity>,
    sets: Vec<String>,
    last_error: Option<CatalogError>,
}

impl FilterOrchestrator {
    pub fn new(settings: FilterSettings, rarities: RarityTable) -> Self {
        Self {
            settings,
            rarities,
            criteria: FilterCriteria::default(),
            activated: false,
            pending_name: None,
            next_ticket: 0,
            in_flight: None,
            rows: Vec::new(),
            entities: Vec::new(),
            sets: Vec::new(),
            last_error: None,
        }
    }

    /// First activation: load the whole catalog and the set list.
    /// Later calls do nothing.
    pub fn activate(&mut self) -> Vec<Command> {
        if self.activated {
            return Vec::new();
        }
        self.activated = true;

        let mut commands = self.dispatch(CatalogQuery::All);
        commands.push(Command::FetchSets);
        commands
    }

    /// Name field edited
    ///
    /// Long enough names restart the debounce window; shorter ones clear the
    /// name criterion right away (querying only if a name was active).
    pub fn set_name_filter(&mut self, text: &str) -> Vec<Command> {
        let name = text.trim();
        let mut commands = self.cancel_pending_name();

        if name.chars().count() >= self.settings.min_name_len {
            if self.criteria.name.as_deref() == Some(name) {
                debug!("Name filter {name:?} unchanged");
                return commands;
            }

            self.next_ticket += 1;
            let ticket = self.next_ticket;
            self.pending_name = Some(PendingName {
                ticket,
                name: name.to_string(),
            });
            commands.push(Command::StartDebounce {
                ticket,
                delay: self.settings.debounce,
            });
        } else if self.criteria.name.take().is_some() {
            debug!("Name filter cleared");
            commands.extend(self.dispatch_current());
        }

        commands
    }

    /// The debounce timer for `ticket` fired
    pub fn debounce_elapsed(&mut self, ticket: u64) -> Vec<Command> {
        match self.pending_name.take() {
            Some(pending) if pending.ticket == ticket => {
                self.criteria.name = Some(pending.name);
                self.dispatch_current()
            }
            other => {
                debug!("Ignoring obsolete debounce ticket {ticket}");
                self.pending_name = other;
                Vec::new()
            }
        }
    }

    /// Set selection changed; not debounced
    pub fn set_set_filter(&mut self, set: &str) -> Vec<Command> {
        let set = SetFilter::parse(set);
        if set == self.criteria.set {
            return Vec::new();
        }
        self.criteria.set = set;
        self.dispatch_current()
    }

    /// Reset every criterion and reload the full catalog
    pub fn clear_filters(&mut self) -> Vec<Command> {
        let mut commands = self.cancel_pending_name();
        self.criteria.name = None;
        self.criteria.set = SetFilter::All;
        self.criteria.rarity = None;
        self.criteria.card_type = None;
        commands.extend(self.dispatch_current());
        commands
    }

    /// Restrict visible entities to one rarity group (local, no query)
    pub fn set_rarity_filter(&mut self, rarity: Option<RarityGroup>) {
        if self.criteria.rarity != rarity {
            self.criteria.rarity = rarity;
            self.rebuild_entities();
        }
    }

    /// Restrict visible entities to a card type such as "Spell" (local, no query).
    /// Blank input removes the restriction.
    pub fn set_type_filter(&mut self, card_type: Option<&str>) {
        let card_type = card_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        if self.criteria.card_type != card_type {
            self.criteria.card_type = card_type;
            self.rebuild_entities();
        }
    }

    /// Switch aggregation mode, re-aggregating the rows already loaded
    pub fn set_mode(&mut self, mode: AggregationMode) {
        if self.settings.mode != mode {
            self.settings.mode = mode;
            self.rebuild_entities();
        }
    }

    /// Deliver the result of the query dispatched as `generation`
    pub fn apply_response(
        &mut self,
        generation: u64,
        result: Result<Vec<PrintingRow>, StoreError>,
    ) -> ResponseOutcome {
        let current = self.criteria.generation;
        if generation != current || self.in_flight != Some(generation) {
            debug!("Discarding stale response for generation {generation} (current {current})");
            return ResponseOutcome::Stale {
                generation,
                current,
            };
        }
        self.in_flight = None;

        match result {
            Ok(rows) => {
                self.rows = rows;
                self.rebuild_entities();
                self.last_error = None;
                info!(
                    "Generation {generation}: {} rows, {} entities",
                    self.rows.len(),
                    self.entities.len()
                );
                ResponseOutcome::Applied {
                    entities: self.entities.len(),
                }
            }
            Err(e) => {
                warn!("Catalog query for generation {generation} failed: {e}");
                self.last_error = Some(CatalogError::QueryFailure(e));
                ResponseOutcome::Failed
            }
        }
    }

    /// Deliver the result of [`Command::FetchSets`]
    pub fn apply_sets(&mut self, result: Result<Vec<String>, StoreError>) {
        match result {
            Ok(sets) => {
                debug!("Loaded {} sets", sets.len());
                self.sets = sets;
            }
            Err(e) => {
                warn!("Could not load the set list: {e}");
                self.last_error = Some(CatalogError::QueryFailure(e));
            }
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn phase(&self) -> FilterPhase {
        if self.in_flight.is_some() {
            FilterPhase::Querying
        } else if self.pending_name.is_some() {
            FilterPhase::PendingDebounce
        } else {
            FilterPhase::Idle
        }
    }

    pub fn mode(&self) -> AggregationMode {
        self.settings.mode
    }

    pub fn rarities(&self) -> &RarityTable {
        &self.rarities
    }

    /// Rows of the last applied response
    pub fn rows(&self) -> &[PrintingRow] {
        &self.rows
    }

    /// Entities of the last applied response
    pub fn entities(&self) -> &[CardDisplayEntity] {
        &self.entities
    }

    /// Mutable access for the quantity tracker
    pub fn entities_mut(&mut self) -> &mut [CardDisplayEntity] {
        &mut self.entities
    }

    pub fn sets(&self) -> &[String] {
        &self.sets
    }

    /// Error of the last failed store call, until the next success
    pub fn last_error(&self) -> Option<&CatalogError> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<CatalogError> {
        self.last_error.take()
    }

    fn cancel_pending_name(&mut self) -> Vec<Command> {
        match self.pending_name.take() {
            Some(pending) => vec![Command::CancelDebounce {
                ticket: pending.ticket,
            }],
            None => Vec::new(),
        }
    }

    fn dispatch_current(&mut self) -> Vec<Command> {
        let query = CatalogQuery::for_criteria(&self.criteria);
        self.dispatch(query)
    }

    fn dispatch(&mut self, query: CatalogQuery) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        if let Some(previous) = self.in_flight.take() {
            debug!("Generation {previous} superseded");
            commands.push(Command::Abandon {
                generation: previous,
            });
        }

        self.criteria.generation += 1;
        let generation = self.criteria.generation;
        debug!("Dispatching {query:?} as generation {generation}");
        self.in_flight = Some(generation);
        commands.push(Command::Query { generation, query });
        commands
    }

    fn rebuild_entities(&mut self) {
        let mut entities = aggregate(&self.rows, self.settings.mode);
        if let Some(card_type) = &self.criteria.card_type {
            entities.retain(|e| e.card.card_type.to_lowercase().contains(card_type.as_str()));
        }
        self.entities = match self.criteria.rarity {
            Some(group) => filter_by_rarity(entities, &self.rarities, group),
            None => entities,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orchestrator() -> FilterOrchestrator {
        FilterOrchestrator::new(FilterSettings::default(), RarityTable::standard().unwrap())
    }

    fn printing(card_id: i64, set: &str, rarity: &str) -> PrintingRow {
        PrintingRow {
            set_code: Some(format!("{set}-001")),
            set_name: Some(set.to_string()),
            rarity: Some(rarity.to_string()),
            ..PrintingRow::new(card_id, format!("Card {card_id}"), "Spell Card")
        }
    }

    fn queries(commands: &[Command]) -> Vec<(u64, CatalogQuery)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Query { generation, query } => Some((*generation, query.clone())),
                _ => None,
            })
            .collect()
    }

    fn ticket(commands: &[Command]) -> u64 {
        commands
            .iter()
            .find_map(|c| match c {
                Command::StartDebounce { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("no debounce started")
    }

    #[test]
    fn test_activation_loads_catalog_and_sets_once() {
        let mut orch = orchestrator();
        let commands = orch.activate();
        assert_eq!(
            commands,
            vec![
                Command::Query {
                    generation: 1,
                    query: CatalogQuery::All
                },
                Command::FetchSets,
            ]
        );
        assert_eq!(orch.phase(), FilterPhase::Querying);
        assert!(orch.activate().is_empty());
    }

    #[test]
    fn test_name_edit_is_debounced() {
        let mut orch = orchestrator();
        let commands = orch.set_name_filter("  dark ");
        assert_eq!(
            commands,
            vec![Command::StartDebounce {
                ticket: 1,
                delay: DEFAULT_DEBOUNCE
            }]
        );
        assert_eq!(orch.phase(), FilterPhase::PendingDebounce);
        assert_eq!(orch.criteria().name, None);

        let commands = orch.debounce_elapsed(1);
        assert_eq!(
            queries(&commands),
            vec![(1, CatalogQuery::ByName("dark".into()))]
        );
        assert_eq!(orch.criteria().name.as_deref(), Some("dark"));
    }

    #[test]
    fn test_new_edit_restarts_the_window() {
        let mut orch = orchestrator();
        let first = ticket(&orch.set_name_filter("da"));
        let commands = orch.set_name_filter("dar");
        assert_eq!(commands[0], Command::CancelDebounce { ticket: first });
        let second = ticket(&commands);
        assert_ne!(first, second);

        // The superseded timer firing late changes nothing
        assert!(orch.debounce_elapsed(first).is_empty());
        assert_eq!(orch.phase(), FilterPhase::PendingDebounce);

        let commands = orch.debounce_elapsed(second);
        assert_eq!(queries(&commands), vec![(1, CatalogQuery::ByName("dar".into()))]);
    }

    #[test]
    fn test_short_name_after_initial_load_issues_nothing() {
        let mut orch = orchestrator();
        orch.activate();
        orch.apply_response(1, Ok(vec![printing(1, "LOB", "Common")]));

        let pending = ticket(&orch.set_name_filter("dark"));
        let commands = orch.set_name_filter("x");

        assert_eq!(commands, vec![Command::CancelDebounce { ticket: pending }]);
        assert_eq!(orch.phase(), FilterPhase::Idle);
        assert_eq!(orch.criteria().generation, 1);
    }

    #[test]
    fn test_short_name_during_initial_load_issues_nothing() {
        let mut orch = orchestrator();
        orch.activate();

        let commands = orch.set_name_filter("x");

        assert!(commands.is_empty());
        assert_eq!(orch.criteria().generation, 1);
        assert_eq!(orch.phase(), FilterPhase::Querying);
        assert_eq!(
            orch.apply_response(1, Ok(vec![printing(1, "LOB", "Common")])),
            ResponseOutcome::Applied { entities: 1 }
        );
    }

    #[test]
    fn test_short_name_clears_an_active_name_immediately() {
        let mut orch = orchestrator();
        let t = ticket(&orch.set_name_filter("dark"));
        orch.debounce_elapsed(t);
        orch.apply_response(1, Ok(Vec::new()));

        let commands = orch.set_name_filter(" d ");
        assert_eq!(queries(&commands), vec![(2, CatalogQuery::All)]);
        assert_eq!(orch.criteria().name, None);
    }

    #[test]
    fn test_same_name_again_does_not_requery() {
        let mut orch = orchestrator();
        let t = ticket(&orch.set_name_filter("dark"));
        orch.debounce_elapsed(t);
        orch.apply_response(1, Ok(Vec::new()));

        assert!(orch.set_name_filter("dark ").is_empty());
    }

    #[test]
    fn test_name_threshold_counts_characters() {
        let mut orch = orchestrator();
        // One character, two bytes
        assert!(orch.set_name_filter("é").is_empty());
        assert!(!orch.set_name_filter("éé").is_empty());
    }

    #[test]
    fn test_set_change_queries_immediately() {
        let mut orch = orchestrator();
        let commands = orch.set_set_filter("Legend of Blue Eyes White Dragon");
        assert_eq!(
            queries(&commands),
            vec![(
                1,
                CatalogQuery::BySet("Legend of Blue Eyes White Dragon".into())
            )]
        );
        assert!(orch.set_set_filter("Legend of Blue Eyes White Dragon").is_empty());

        let commands = orch.set_set_filter(ALL_SETS);
        assert_eq!(queries(&commands), vec![(2, CatalogQuery::All)]);
        assert_eq!(orch.criteria().set, SetFilter::All);
    }

    #[test]
    fn test_query_variant_follows_active_criteria() {
        let mut criteria = FilterCriteria::default();
        assert_eq!(CatalogQuery::for_criteria(&criteria), CatalogQuery::All);

        criteria.set = SetFilter::Named("MRD".into());
        assert_eq!(
            CatalogQuery::for_criteria(&criteria),
            CatalogQuery::BySet("MRD".into())
        );

        criteria.name = Some("kuri".into());
        assert_eq!(
            CatalogQuery::for_criteria(&criteria),
            CatalogQuery::ByNameAndSet {
                name: "kuri".into(),
                set: "MRD".into()
            }
        );

        criteria.set = SetFilter::All;
        assert_eq!(
            CatalogQuery::for_criteria(&criteria),
            CatalogQuery::ByName("kuri".into())
        );
    }

    #[test]
    fn test_superseding_a_query_abandons_it() {
        let mut orch = orchestrator();
        orch.set_set_filter("A");
        let commands = orch.set_set_filter("B");
        assert_eq!(
            commands,
            vec![
                Command::Abandon { generation: 1 },
                Command::Query {
                    generation: 2,
                    query: CatalogQuery::BySet("B".into())
                },
            ]
        );
    }

    #[test]
    fn test_out_of_order_responses_keep_the_newest() {
        let mut orch = orchestrator();
        orch.set_set_filter("One");
        orch.set_set_filter("Two");
        orch.set_set_filter("Three");
        assert_eq!(orch.criteria().generation, 3);

        let rows_for = |set: &str| Ok(vec![printing(1, set, "Rare")]);

        assert_eq!(
            orch.apply_response(3, rows_for("Three")),
            ResponseOutcome::Applied { entities: 1 }
        );
        assert_eq!(
            orch.apply_response(1, rows_for("One")),
            ResponseOutcome::Stale {
                generation: 1,
                current: 3
            }
        );
        assert_eq!(
            orch.apply_response(2, rows_for("Two")),
            ResponseOutcome::Stale {
                generation: 2,
                current: 3
            }
        );

        assert_eq!(orch.entities().len(), 1);
        assert_eq!(orch.entities()[0].card.set_name.as_deref(), Some("Three"));
        assert_eq!(orch.phase(), FilterPhase::Idle);
    }

    #[test]
    fn test_duplicate_delivery_is_ignored() {
        let mut orch = orchestrator();
        orch.activate();
        orch.apply_response(1, Ok(vec![printing(1, "A", "Rare")]));
        let outcome = orch.apply_response(1, Ok(Vec::new()));
        assert!(matches!(outcome, ResponseOutcome::Stale { .. }));
        assert_eq!(orch.entities().len(), 1);
    }

    #[test]
    fn test_failure_keeps_previous_entities_and_flags_error() {
        let mut orch = orchestrator();
        orch.activate();
        orch.apply_response(1, Ok(vec![printing(1, "A", "Rare"), printing(2, "A", "Rare")]));

        orch.set_set_filter("B");
        let outcome = orch.apply_response(2, Err(StoreError::Unavailable("offline".into())));

        assert_eq!(outcome, ResponseOutcome::Failed);
        assert_eq!(orch.entities().len(), 2);
        assert!(matches!(
            orch.last_error(),
            Some(CatalogError::QueryFailure(StoreError::Unavailable(_)))
        ));
        assert_eq!(orch.phase(), FilterPhase::Idle);

        // The next user change is the retry path and clears the error on success
        orch.set_set_filter("C");
        orch.apply_response(3, Ok(vec![printing(3, "C", "Common")]));
        assert!(orch.last_error().is_none());
        assert_eq!(orch.entities()[0].card_id(), 3);
    }

    #[test]
    fn test_clear_filters_resets_and_reloads() {
        let mut orch = orchestrator();
        orch.set_set_filter("A");
        let pending = ticket(&orch.set_name_filter("kuriboh"));
        orch.set_rarity_filter(Some(RarityGroup::Rare));
        orch.set_type_filter(Some("Spell"));

        let commands = orch.clear_filters();
        assert_eq!(
            commands,
            vec![
                Command::CancelDebounce { ticket: pending },
                Command::Abandon { generation: 1 },
                Command::Query {
                    generation: 2,
                    query: CatalogQuery::All
                },
            ]
        );
        assert_eq!(orch.criteria().rarity, None);
        assert_eq!(orch.criteria().card_type, None);
        assert_eq!(orch.criteria().set, SetFilter::All);
    }

    #[test]
    fn test_type_filter_matches_substrings_locally() {
        let mut orch = orchestrator();
        orch.activate();
        let mut monster = printing(3, "A", "Ultra Rare");
        monster.card_type = "Effect Monster".into();
        orch.apply_response(1, Ok(vec![printing(1, "A", "Common"), monster, printing(2, "B", "Rare")]));

        orch.set_type_filter(Some(" monster "));
        assert_eq!(orch.criteria().card_type.as_deref(), Some("monster"));
        let ids: Vec<i64> = orch.entities().iter().map(|e| e.card_id()).collect();
        assert_eq!(ids, vec![3]);

        // Combined with a rarity group
        orch.set_type_filter(Some("SPELL"));
        orch.set_rarity_filter(Some(RarityGroup::Rare));
        let ids: Vec<i64> = orch.entities().iter().map(|e| e.card_id()).collect();
        assert_eq!(ids, vec![2]);

        orch.set_type_filter(Some("  "));
        orch.set_rarity_filter(None);
        assert_eq!(orch.entities().len(), 3);
        assert_eq!(orch.criteria().generation, 1);
    }

    #[test]
    fn test_rarity_filter_and_mode_work_on_loaded_rows() {
        let mut orch = orchestrator();
        orch.activate();
        orch.apply_response(
            1,
            Ok(vec![
                printing(1, "A", "Common"),
                printing(1, "B", "Ultra Rare"),
                printing(2, "A", "Rare"),
            ]),
        );
        assert_eq!(orch.entities().len(), 3);

        orch.set_mode(AggregationMode::Full);
        assert_eq!(orch.entities().len(), 2);
        assert_eq!(orch.entities()[0].rarities, vec!["Common", "Ultra Rare"]);

        orch.set_rarity_filter(Some(RarityGroup::UltraRare));
        assert_eq!(orch.entities().len(), 1);
        assert_eq!(orch.entities()[0].card_id(), 1);

        orch.set_rarity_filter(None);
        assert_eq!(orch.entities().len(), 2);
        // None of this went to the store
        assert_eq!(orch.criteria().generation, 1);
    }

    #[test]
    fn test_set_list_failure_is_surfaced() {
        let mut orch = orchestrator();
        orch.apply_sets(Ok(vec!["A".into(), "B".into()]));
        assert_eq!(orch.sets(), ["A".to_string(), "B".to_string()]);

        orch.apply_sets(Err(StoreError::Unavailable("offline".into())));
        assert_eq!(orch.sets().len(), 2);
        assert!(orch.take_error().is_some());
        assert!(orch.last_error().is_none());
    }

    #[test]
    fn test_query_runs_the_matching_store_call() {
        use crate::state::library::{CardRecord, Library, SetPrinting};

        let library = Library::open_in_memory().unwrap();
        library
            .upsert_card(&CardRecord {
                id: 40640057,
                name: "Kuriboh".into(),
                card_type: "Effect Monster".into(),
                ..CardRecord::default()
            })
            .unwrap();
        library
            .upsert_printing(
                40640057,
                &SetPrinting {
                    set_code: Some("MRD-071".into()),
                    set_name: Some("Metal Raiders".into()),
                    set_rarity: Some("Common".into()),
                    set_price: None,
                },
            )
            .unwrap();

        let by_both = CatalogQuery::ByNameAndSet {
            name: "kuri".into(),
            set: "Metal Raiders".into(),
        };
        assert_eq!(by_both.run(&library).unwrap().len(), 1);
        assert!(CatalogQuery::BySet("Nope".into()).run(&library).unwrap().is_empty());
        assert_eq!(CatalogQuery::All.run(&library).unwrap().len(), 1);
    }
}
