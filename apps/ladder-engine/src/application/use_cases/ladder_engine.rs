//! Ladder Engine
//!
//! Owns the instrument book and reconciles it against the broker. One call
//! to [`LadderEngine::reconcile`] is one tick:
//!
//! 1. resolve the entry price of every active instrument
//! 2. recompute its level schedule and re-price pending levels
//! 3. adopt open broker orders matching a pending price
//! 4. submit the remaining pending levels
//! 5. save the book and publish a snapshot
//!
//! Ticks are serialized. Within a tick every symbol is an independent unit;
//! a failing symbol never blocks the others.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::application::dto::{
    InstrumentDiagnostics, InstrumentView, LadderSnapshot, SymbolOutcome, TickReport,
};
use crate::application::ports::{
    BrokerError, BrokerGateway, InstrumentBook, InstrumentStore, load_or_empty,
};
use crate::domain::ladder::{
    InstrumentRecord, InstrumentStatus, LadderError, PositionState, compute_levels,
};
use crate::domain::shared::Symbol;

/// Snapshot channel capacity. Lagging receivers skip older snapshots.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

const RECORD_REMOVED: &str = "record removed";

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderEngineConfig {
    /// Quantity of every entry and level order.
    pub order_quantity: Decimal,
    /// Pause after an entry market buy before reading its fill.
    pub entry_fill_wait: Duration,
    /// Deadline for every broker call.
    pub broker_call_timeout: Duration,
}

impl Default for LadderEngineConfig {
    fn default() -> Self {
        Self {
            order_quantity: Decimal::ONE,
            entry_fill_wait: Duration::from_secs(2),
            broker_call_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of [`LadderEngine::place_level_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Order submitted and the level marked placed.
    Placed {
        /// Broker-assigned order ID.
        broker_order_id: String,
    },
    /// The level already has an order. Nothing was sent.
    AlreadyPlaced,
    /// Another submission for the same level is in progress. Nothing was sent.
    InFlight,
    /// The record is gone. If the broker accepted an order, it is left alone.
    RecordRemoved,
    /// The ladder has no such level.
    UnknownLevel,
    /// The price is not positive. Nothing was sent.
    InvalidPrice,
    /// The broker call failed. The level stays pending.
    Failed(BrokerError),
}

enum LevelCheck {
    Submittable,
    AlreadyPlaced,
    Missing,
    UnknownLevel,
}

/// Ladder reconciliation engine.
pub struct LadderEngine<B, S>
where
    B: BrokerGateway,
    S: InstrumentStore,
{
    broker: Arc<B>,
    store: Arc<S>,
    config: LadderEngineConfig,
    book: RwLock<InstrumentBook>,
    diagnostics: RwLock<HashMap<Symbol, InstrumentDiagnostics>>,
    in_flight: Mutex<HashSet<(Symbol, u32)>>,
    tick_lock: tokio::sync::Mutex<()>,
    save_lock: tokio::sync::Mutex<()>,
    ticks: AtomicU64,
    snapshots: broadcast::Sender<Arc<LadderSnapshot>>,
}

impl<B, S> LadderEngine<B, S>
where
    B: BrokerGateway,
    S: InstrumentStore,
{
    /// Create an engine over an already loaded book.
    pub fn new(
        broker: Arc<B>,
        store: Arc<S>,
        config: LadderEngineConfig,
        book: InstrumentBook,
    ) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            broker,
            store,
            config,
            book: RwLock::new(book),
            diagnostics: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            tick_lock: tokio::sync::Mutex::new(()),
            save_lock: tokio::sync::Mutex::new(()),
            ticks: AtomicU64::new(0),
            snapshots,
        }
    }

    /// Create an engine from whatever the store holds. Load failures start empty.
    pub async fn bootstrap(broker: Arc<B>, store: Arc<S>, config: LadderEngineConfig) -> Self {
        let book = load_or_empty(store.as_ref()).await;
        tracing::info!(instruments = book.len(), "Instrument book loaded");
        Self::new(broker, store, config, book)
    }

    /// Engine configuration.
    pub const fn config(&self) -> &LadderEngineConfig {
        &self.config
    }

    /// Subscribe to snapshots published after every tick or book change.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LadderSnapshot>> {
        self.snapshots.subscribe()
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Copy of the whole book.
    pub fn book(&self) -> InstrumentBook {
        self.book.read().clone()
    }

    /// Copy of one record.
    pub fn record(&self, symbol: &Symbol) -> Option<InstrumentRecord> {
        self.book.read().get(symbol).cloned()
    }

    /// Whether `symbol` is tracked.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.book.read().contains_key(symbol)
    }

    /// Build an immutable view of the book.
    pub fn snapshot(&self, now: DateTime<Utc>) -> LadderSnapshot {
        let book = self.book.read();
        let diagnostics = self.diagnostics.read();
        LadderSnapshot {
            tick: self.tick_count(),
            generated_at: now,
            instruments: book
                .values()
                .map(|record| InstrumentView::from_record(record, diagnostics.get(record.symbol())))
                .collect(),
        }
    }

    /// View of one instrument.
    pub fn view(&self, symbol: &Symbol) -> Option<InstrumentView> {
        let book = self.book.read();
        let record = book.get(symbol)?;
        Some(InstrumentView::from_record(
            record,
            self.diagnostics.read().get(symbol),
        ))
    }

    // =========================================================================
    // Book mutations
    // =========================================================================

    /// Track a new record.
    ///
    /// # Errors
    ///
    /// Returns `LadderError::Validation` if the symbol is already tracked.
    pub fn insert(&self, record: InstrumentRecord) -> Result<(), LadderError> {
        let mut book = self.book.write();
        if book.contains_key(record.symbol()) {
            return Err(LadderError::validation(
                "symbol",
                format!("{} is already tracked", record.symbol()),
            ));
        }
        tracing::info!(
            symbol = %record.symbol(),
            levels = record.level_count(),
            drawdown = %record.drawdown_fraction(),
            "Instrument added"
        );
        book.insert(record.symbol().clone(), record);
        Ok(())
    }

    /// Flip a record between active and inactive. Returns the new status.
    pub fn toggle(&self, symbol: &Symbol) -> Option<InstrumentStatus> {
        let status = self.mutate(symbol, InstrumentRecord::toggle_status)?;
        tracing::info!(symbol = %symbol, status = %status, "Instrument status changed");
        Some(status)
    }

    /// Stop tracking a record. Broker orders are left alone.
    pub fn remove(&self, symbol: &Symbol) -> bool {
        let removed = self.book.write().remove(symbol).is_some();
        self.diagnostics.write().remove(symbol);
        if removed {
            tracing::info!(symbol = %symbol, "Instrument removed");
        }
        removed
    }

    // =========================================================================
    // Persistence and notification
    // =========================================================================

    /// Save the book. Failures are logged and retried with the next save.
    ///
    /// Saves are serialized and each one copies the book under the lock, so
    /// an older copy never lands after a newer one.
    pub async fn persist(&self) -> bool {
        let _save_guard = self.save_lock.lock().await;
        let book = self.book();
        match self.store.save(&book).await {
            Ok(()) => {
                tracing::debug!(instruments = book.len(), "Instrument book saved");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save instrument book");
                false
            }
        }
    }

    /// Publish a snapshot to subscribers. Nobody listening is fine.
    pub fn publish(&self, now: DateTime<Utc>) -> Arc<LadderSnapshot> {
        let snapshot = Arc::new(self.snapshot(now));
        let _ = self.snapshots.send(Arc::clone(&snapshot));
        snapshot
    }

    /// Save the book, then publish a snapshot.
    pub async fn persist_and_publish(&self, now: DateTime<Utc>) -> bool {
        let persisted = self.persist().await;
        self.publish(now);
        persisted
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Run one reconciliation tick.
    ///
    /// Overlapping calls wait for the running tick to finish.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> TickReport {
        let _tick_guard = self.tick_lock.lock().await;
        let tick = self.tick_count() + 1;

        let active: Vec<Symbol> = self
            .book
            .read()
            .values()
            .filter(|record| record.is_active())
            .map(|record| record.symbol().clone())
            .collect();
        tracing::debug!(tick, active = active.len(), "Reconciliation tick started");

        let outcomes = join_all(
            active
                .into_iter()
                .map(|symbol| self.reconcile_symbol(symbol, now)),
        )
        .await;

        self.ticks.store(tick, Ordering::SeqCst);
        let persisted = self.persist().await;
        let finished_at = Utc::now();
        self.publish(finished_at);

        let report = TickReport {
            tick,
            started_at: now,
            finished_at,
            persisted,
            outcomes,
        };
        tracing::debug!(
            tick,
            submitted = report.submitted_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            persisted,
            "Reconciliation tick finished"
        );
        report
    }

    async fn reconcile_symbol(&self, symbol: Symbol, now: DateTime<Utc>) -> SymbolOutcome {
        let mut outcome = SymbolOutcome::new(symbol.clone());
        let Some(record) = self.record(&symbol) else {
            outcome.skip(RECORD_REMOVED);
            return outcome;
        };

        match self
            .call("get_current_price", self.broker.get_current_price(&symbol))
            .await
        {
            Ok(price) => self.update_diagnostics(&symbol, |d| d.last_price = Some(price)),
            Err(e) => tracing::debug!(symbol = %symbol, error = %e, "Quote unavailable"),
        }

        if let Some(entry_price) = self.resolve_entry_price(&record, &mut outcome).await {
            outcome.entry_price = Some(entry_price);
            self.advance_ladder(&record, entry_price, &mut outcome).await;
        }

        self.update_diagnostics(&symbol, |d| {
            d.updated_at = Some(now);
            d.last_error.clone_from(&outcome.error);
        });
        outcome
    }

    /// Entry price to build the ladder from, or `None` to skip this tick.
    async fn resolve_entry_price(
        &self,
        record: &InstrumentRecord,
        outcome: &mut SymbolOutcome,
    ) -> Option<Decimal> {
        let symbol = record.symbol();

        if record.position_state() == PositionState::Entered {
            if let Some(price) = self.max_filled_price(symbol, outcome).await {
                return Some(price);
            }
            if record.entry_price() > Decimal::ZERO {
                tracing::debug!(symbol = %symbol, entry_price = %record.entry_price(), "Using stored entry price");
                return Some(record.entry_price());
            }
            outcome.skip("entry price unavailable");
            return None;
        }

        let position = match self
            .call("get_position", self.broker.get_position(symbol))
            .await
        {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Position lookup failed, treating as no position");
                outcome.record_error(&e);
                None
            }
        };

        if position.is_none() {
            self.open_entry_position(symbol, outcome).await?;
        }

        let Some(price) = self.max_filled_price(symbol, outcome).await else {
            tracing::info!(symbol = %symbol, "Entry fill not visible yet, retrying next tick");
            outcome.skip("entry fill unavailable");
            return None;
        };
        if self.mutate(symbol, InstrumentRecord::mark_entered).is_none() {
            outcome.skip(RECORD_REMOVED);
            return None;
        }
        Some(price)
    }

    async fn open_entry_position(&self, symbol: &Symbol, outcome: &mut SymbolOutcome) -> Option<()> {
        let quantity = self.config.order_quantity;
        match self
            .call(
                "submit_market_buy",
                self.broker.submit_market_buy(symbol, quantity),
            )
            .await
        {
            Ok(ack) => tracing::info!(
                symbol = %symbol,
                quantity = %quantity,
                broker_order_id = %ack.broker_order_id,
                "Entry market buy submitted"
            ),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Entry market buy failed, retrying next tick");
                outcome.record_error(&e);
                outcome.skip("entry order failed");
                return None;
            }
        }

        if self.mutate(symbol, InstrumentRecord::mark_entered).is_none() {
            outcome.skip(RECORD_REMOVED);
            return None;
        }
        if !self.config.entry_fill_wait.is_zero() {
            tokio::time::sleep(self.config.entry_fill_wait).await;
        }
        Some(())
    }

    async fn max_filled_price(&self, symbol: &Symbol, outcome: &mut SymbolOutcome) -> Option<Decimal> {
        match self
            .call(
                "get_max_filled_price",
                self.broker.get_max_filled_price(symbol),
            )
            .await
        {
            Ok(price) => price.filter(|p| *p > Decimal::ZERO),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Filled price lookup failed");
                outcome.record_error(&e);
                None
            }
        }
    }

    async fn advance_ladder(
        &self,
        record: &InstrumentRecord,
        entry_price: Decimal,
        outcome: &mut SymbolOutcome,
    ) {
        let symbol = record.symbol();
        let schedule = match compute_levels(
            entry_price,
            record.drawdown_fraction(),
            record.level_count(),
        ) {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Level computation rejected a tracked instrument");
                outcome.record_error(&e);
                outcome.skip("invalid ladder parameters");
                return;
            }
        };

        let Some((pending, placed)) = self.mutate(symbol, |record| {
            let repriced = record.apply_schedule(entry_price, &schedule);
            if repriced > 0 {
                tracing::debug!(symbol = %symbol, entry_price = %entry_price, repriced, "Pending levels re-priced");
            }
            (
                record.pending_levels().collect::<Vec<_>>(),
                record.placed_levels().map(|(_, price)| price).collect::<Vec<_>>(),
            )
        }) else {
            outcome.skip(RECORD_REMOVED);
            return;
        };
        if pending.is_empty() {
            return;
        }

        let mut open_prices = match self
            .call("list_open_orders", self.broker.list_open_orders(symbol))
            .await
        {
            Ok(prices) => prices,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Open order listing failed, skipping adoption");
                outcome.record_error(&e);
                Vec::new()
            }
        };
        // Orders already owned by placed levels are not adoptable.
        for owned in placed {
            if let Some(position) = open_prices.iter().position(|open| *open == owned) {
                open_prices.swap_remove(position);
            }
        }

        for (index, price) in pending {
            if let Some(position) = open_prices.iter().position(|open| *open == price) {
                open_prices.swap_remove(position);
                match self.mutate(symbol, |record| record.mark_placed(index, price)) {
                    Some(true) => {
                        tracing::info!(symbol = %symbol, level = index, price = %price, "Adopted open broker order for level");
                        outcome.adopted.push(index);
                    }
                    Some(false) => {}
                    None => {
                        outcome.skip(RECORD_REMOVED);
                        return;
                    }
                }
                continue;
            }

            match self.place_level_order(symbol, price, index).await {
                PlaceOutcome::Placed { .. } => outcome.submitted.push(index),
                PlaceOutcome::AlreadyPlaced | PlaceOutcome::InFlight => {}
                PlaceOutcome::RecordRemoved => {
                    outcome.skip(RECORD_REMOVED);
                    return;
                }
                PlaceOutcome::UnknownLevel | PlaceOutcome::InvalidPrice => outcome.failed.push(index),
                PlaceOutcome::Failed(e) => {
                    outcome.record_error(&e);
                    outcome.failed.push(index);
                }
            }
        }
    }

    /// Submit a GTC limit buy for one pending level and mark it placed.
    ///
    /// Refuses without contacting the broker when the level is already
    /// placed, being submitted, unknown, or priced at or below zero.
    pub async fn place_level_order(&self, symbol: &Symbol, price: Decimal, index: u32) -> PlaceOutcome {
        match self.check_level(symbol, index) {
            LevelCheck::Submittable => {}
            LevelCheck::AlreadyPlaced => return PlaceOutcome::AlreadyPlaced,
            LevelCheck::Missing => return PlaceOutcome::RecordRemoved,
            LevelCheck::UnknownLevel => return PlaceOutcome::UnknownLevel,
        }
        if price <= Decimal::ZERO {
            tracing::warn!(symbol = %symbol, level = index, price = %price, "Level price is not positive, leaving level pending");
            return PlaceOutcome::InvalidPrice;
        }
        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight, symbol, index) else {
            return PlaceOutcome::InFlight;
        };

        let quantity = self.config.order_quantity;
        let ack = match self
            .call(
                "submit_limit_buy",
                self.broker.submit_limit_buy(symbol, quantity, price, index),
            )
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(symbol = %symbol, level = index, price = %price, error = %e, "Level order failed, level stays pending");
                return PlaceOutcome::Failed(e);
            }
        };

        match self.mutate(symbol, |record| record.mark_placed(index, price)) {
            Some(true) => {
                tracing::info!(
                    symbol = %symbol,
                    level = index,
                    price = %price,
                    quantity = %quantity,
                    broker_order_id = %ack.broker_order_id,
                    "Level order placed"
                );
                PlaceOutcome::Placed {
                    broker_order_id: ack.broker_order_id,
                }
            }
            Some(false) => PlaceOutcome::AlreadyPlaced,
            None => {
                tracing::warn!(
                    symbol = %symbol,
                    level = index,
                    broker_order_id = %ack.broker_order_id,
                    "Instrument removed while its order was in flight, order left at broker"
                );
                PlaceOutcome::RecordRemoved
            }
        }
    }

    fn check_level(&self, symbol: &Symbol, index: u32) -> LevelCheck {
        let book = self.book.read();
        let Some(record) = book.get(symbol) else {
            return LevelCheck::Missing;
        };
        match record.slot(index) {
            None => LevelCheck::UnknownLevel,
            Some(slot) if slot.is_placed() => LevelCheck::AlreadyPlaced,
            Some(_) => LevelCheck::Submittable,
        }
    }

    /// Apply `f` to a record under the write lock. `None` if it was removed.
    fn mutate<R>(&self, symbol: &Symbol, f: impl FnOnce(&mut InstrumentRecord) -> R) -> Option<R> {
        self.book.write().get_mut(symbol).map(f)
    }

    fn update_diagnostics(&self, symbol: &Symbol, f: impl FnOnce(&mut InstrumentDiagnostics)) {
        let book = self.book.read();
        if !book.contains_key(symbol) {
            return;
        }
        f(self.diagnostics.write().entry(symbol.clone()).or_default());
    }

    /// Run a broker call under the configured deadline.
    async fn call<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, BrokerError>>,
    ) -> Result<T, BrokerError> {
        let deadline = self.config.broker_call_timeout;
        tokio::time::timeout(deadline, future)
            .await
            .unwrap_or_else(|_| {
                Err(BrokerError::Timeout {
                    operation: operation.to_string(),
                    after_ms: deadline.as_millis() as u64,
                })
            })
    }
}

/// Marks one level as being submitted until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<(Symbol, u32)>>,
    key: (Symbol, u32),
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<(Symbol, u32)>>, symbol: &Symbol, index: u32) -> Option<Self> {
        let key = (symbol.clone(), index);
        set.lock().insert(key.clone()).then_some(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
