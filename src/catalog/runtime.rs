//! Async driver for the filter orchestrator
//!
//! Executes the orchestrator's commands on tokio: debounce windows become
//! sleeping tasks, store calls run on the blocking pool under a timeout, and
//! every completion comes back through one channel so state is only ever
//! touched from the caller's task.
//!
//! All methods that dispatch work must be called from inside a tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::filter::{Command, FilterOrchestrator, ResponseOutcome};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, StoreError};
use crate::rarity::RarityGroup;
use crate::state::collection::QuantityTracker;
use crate::state::data::{AggregationMode, CardDisplayEntity, PrintingKey, PrintingRow};
use crate::state::library::CatalogStore;
use crate::ui::grid::{GridLayout, GridViewport};

#[derive(Debug)]
enum RuntimeEvent {
    DebounceElapsed(u64),
    QueryFinished {
        generation: u64,
        result: Result<Vec<PrintingRow>, StoreError>,
    },
    SetsFinished(Result<Vec<String>, StoreError>),
}

/// What one processed event changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeUpdate {
    DebounceElapsed { ticket: u64 },
    Response { generation: u64, outcome: ResponseOutcome },
    SetsLoaded { count: usize },
    SetsFailed,
}

/// Run `f` against the store on the blocking pool, bounded by `timeout`
async fn call_store<S, T, F>(store: Arc<Mutex<S>>, timeout: Duration, f: F) -> Result<T, StoreError>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let guard = store
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        f(&*guard)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StoreError::Unavailable(format!("store worker failed: {e}"))),
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

/// Drives a [`FilterOrchestrator`] and a [`QuantityTracker`] against a shared store.
///
/// Completions are applied only inside [`CatalogRuntime::process_next`], so
/// the visible state changes at well-defined points.
pub struct CatalogRuntime<S> {
    store: Arc<Mutex<S>>,
    filter: FilterOrchestrator,
    tracker: QuantityTracker,
    viewport: GridViewport,
    query_timeout: Duration,
    events_tx: mpsc::UnboundedSender<RuntimeEvent>,
    events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    debounce: Option<(u64, AbortHandle)>,
    /// In-flight queries with the tracker mark taken at dispatch
    queries: HashMap<u64, (AbortHandle, u64)>,
    sets_pending: bool,
}

impl<S> CatalogRuntime<S>
where
    S: CatalogStore + Send + 'static,
{
    /// Build the runtime; an inconsistent rarity table is fatal here
    pub fn new(store: S, config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::with_shared_store(Arc::new(Mutex::new(store)), config)
    }

    pub fn with_shared_store(store: Arc<Mutex<S>>, config: &CatalogConfig) -> Result<Self, CatalogError> {
        let rarities = config.rarity_table()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            store,
            filter: FilterOrchestrator::new(config.filter_settings(), rarities),
            tracker: QuantityTracker::new(),
            viewport: config.viewport(),
            query_timeout: config.query_timeout(),
            events_tx,
            events_rx,
            debounce: None,
            queries: HashMap::new(),
            sets_pending: false,
        })
    }

    pub fn activate(&mut self) {
        let commands = self.filter.activate();
        self.execute(commands);
    }

    pub fn set_name_filter(&mut self, text: &str) {
        let commands = self.filter.set_name_filter(text);
        self.execute(commands);
    }

    pub fn set_set_filter(&mut self, set: &str) {
        let commands = self.filter.set_set_filter(set);
        self.execute(commands);
    }

    pub fn clear_filters(&mut self) {
        let commands = self.filter.clear_filters();
        self.execute(commands);
        self.tracker.sync(self.filter.entities_mut());
    }

    /// Restrict visible entities to a card type substring (local, no query)
    pub fn set_type_filter(&mut self, card_type: Option<&str>) {
        self.filter.set_type_filter(card_type);
        self.tracker.sync(self.filter.entities_mut());
    }

    pub fn set_rarity_filter(&mut self, rarity: Option<RarityGroup>) {
        self.filter.set_rarity_filter(rarity);
        self.tracker.sync(self.filter.entities_mut());
    }

    pub fn set_mode(&mut self, mode: AggregationMode) {
        self.filter.set_mode(mode);
        self.tracker.sync(self.filter.entities_mut());
    }

    pub fn filter(&self) -> &FilterOrchestrator {
        &self.filter
    }

    pub fn tracker(&self) -> &QuantityTracker {
        &self.tracker
    }

    pub fn entities(&self) -> &[CardDisplayEntity] {
        self.filter.entities()
    }

    pub fn viewport(&self) -> &GridViewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut GridViewport {
        &mut self.viewport
    }

    /// Grid layout of the current entity list
    pub fn layout(&self) -> GridLayout<'_, CardDisplayEntity> {
        self.viewport.layout(self.filter.entities())
    }

    /// Rows to render at the current scroll position
    pub fn visible_rows(&self) -> Vec<(usize, &[CardDisplayEntity])> {
        self.viewport.visible(self.filter.entities())
    }

    /// True while a timer, a query or the set list is outstanding
    pub fn is_busy(&self) -> bool {
        self.debounce.is_some() || !self.queries.is_empty() || self.sets_pending
    }

    /// Wait for the next completion and apply it. `None` when nothing is outstanding.
    pub async fn process_next(&mut self) -> Option<RuntimeUpdate> {
        if !self.is_busy() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Process events until no work is outstanding
    pub async fn settle(&mut self) {
        while let Some(update) = self.process_next().await {
            debug!("{update:?}");
        }
    }

    /// Adjust the owned quantity of one printing by `delta`
    ///
    /// The new value is visible before the write completes and stays in
    /// place if the write fails. A printing outside the loaded result starts
    /// from its stored amount.
    pub async fn adjust_quantity(&mut self, key: &PrintingKey, delta: i64) -> Result<i64, CatalogError> {
        if self.tracker.known(key).is_none() {
            let lookup = key.clone();
            let stored = call_store(self.store.clone(), self.query_timeout, move |store: &S| {
                store.quantity_of(lookup.card_id, lookup.set_code.as_deref(), lookup.rarity.as_deref())
            })
            .await
            .map_err(CatalogError::QueryFailure)?;
            self.tracker.learn(key, stored)?;
        }

        let pending = self.tracker.stage(self.filter.entities_mut(), key, delta)?;

        let write = pending.clone();
        let result = call_store(self.store.clone(), self.query_timeout, move |store: &S| {
            store.persist_quantity(
                write.key.card_id,
                write.key.set_code.as_deref(),
                write.key.rarity.as_deref(),
                write.quantity,
            )
        })
        .await;

        self.tracker.finish(pending, result)
    }

    /// Store rarity labels that no synonym covers
    pub async fn audit_rarity_labels(&self) -> Result<Vec<String>, CatalogError> {
        let labels = call_store(self.store.clone(), self.query_timeout, |store: &S| {
            store.list_all_rarity_labels()
        })
        .await
        .map_err(CatalogError::QueryFailure)?;

        let unknown = self.filter.rarities().audit_labels(&labels);
        for label in &unknown {
            warn!("Rarity label {label:?} does not map to any rarity group");
        }
        Ok(unknown)
    }

    fn handle(&mut self, event: RuntimeEvent) -> RuntimeUpdate {
        match event {
            RuntimeEvent::DebounceElapsed(ticket) => {
                if matches!(self.debounce, Some((current, _)) if current == ticket) {
                    self.debounce = None;
                }
                let commands = self.filter.debounce_elapsed(ticket);
                self.execute(commands);
                RuntimeUpdate::DebounceElapsed { ticket }
            }
            RuntimeEvent::QueryFinished { generation, result } => {
                let mark = self.queries.remove(&generation).map_or(0, |(_, mark)| mark);
                let outcome = self.filter.apply_response(generation, result);
                if let ResponseOutcome::Applied { .. } = outcome {
                    self.tracker.seed_since(self.filter.rows(), mark);
                    self.tracker.sync(self.filter.entities_mut());
                }
                RuntimeUpdate::Response { generation, outcome }
            }
            RuntimeEvent::SetsFinished(result) => {
                self.sets_pending = false;
                let update = match &result {
                    Ok(sets) => RuntimeUpdate::SetsLoaded { count: sets.len() },
                    Err(_) => RuntimeUpdate::SetsFailed,
                };
                self.filter.apply_sets(result);
                update
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::StartDebounce { ticket, delay } => {
                    let tx = self.events_tx.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(RuntimeEvent::DebounceElapsed(ticket));
                    });
                    if let Some((_, previous)) = self.debounce.replace((ticket, task.abort_handle())) {
                        previous.abort();
                    }
                }
                Command::CancelDebounce { ticket } => {
                    if matches!(self.debounce, Some((current, _)) if current == ticket) {
                        if let Some((_, timer)) = self.debounce.take() {
                            timer.abort();
                        }
                    }
                }
                Command::Query { generation, query } => {
                    let tx = self.events_tx.clone();
                    let store = self.store.clone();
                    let timeout = self.query_timeout;
                    let task = tokio::spawn(async move {
                        let result = call_store(store, timeout, move |store: &S| query.run(store)).await;
                        let _ = tx.send(RuntimeEvent::QueryFinished { generation, result });
                    });
                    self.queries
                        .insert(generation, (task.abort_handle(), self.tracker.mark()));
                }
                Command::Abandon { generation } => {
                    // The blocking call itself runs to completion; only its delivery is dropped
                    if let Some((task, _)) = self.queries.remove(&generation) {
                        task.abort();
                    }
                }
                Command::FetchSets => {
                    let tx = self.events_tx.clone();
                    let store = self.store.clone();
                    let timeout = self.query_timeout;
                    tokio::spawn(async move {
                        let result = call_store(store, timeout, |store: &S| store.list_all_sets()).await;
                        let _ = tx.send(RuntimeEvent::SetsFinished(result));
                    });
                    self.sets_pending = true;
                }
            }
        }
    }
}

impl<S> std::fmt::Debug for CatalogRuntime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRuntime")
            .field("filter", &self.filter)
            .field("viewport", &self.viewport)
            .field("query_timeout", &self.query_timeout)
            .field("in_flight", &self.queries.len())
            .finish()
    }
}
