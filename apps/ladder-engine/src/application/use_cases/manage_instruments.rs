//! Manage Instruments Use Case
//!
//! Add, toggle and remove tracked instruments. Every change is saved and
//! published right away instead of waiting for the next tick.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::application::dto::{
    AddInstrumentDto, InstrumentView, LadderSnapshot, SelectionItem, SelectionResult,
};
use crate::application::ports::{BrokerGateway, InstrumentStore};
use crate::application::use_cases::LadderEngine;
use crate::domain::ladder::{InstrumentRecord, LadderError};
use crate::domain::shared::Symbol;

const EMPTY_SELECTION: &str = "No instruments selected";
const NOT_TRACKED: &str = "not tracked";

/// Use case for instrument management.
pub struct ManageInstrumentsUseCase<B, S>
where
    B: BrokerGateway,
    S: InstrumentStore,
{
    engine: Arc<LadderEngine<B, S>>,
}

impl<B, S> ManageInstrumentsUseCase<B, S>
where
    B: BrokerGateway,
    S: InstrumentStore,
{
    /// Create a new ManageInstrumentsUseCase.
    pub const fn new(engine: Arc<LadderEngine<B, S>>) -> Self {
        Self { engine }
    }

    /// Current view of every instrument.
    pub fn list(&self) -> LadderSnapshot {
        self.engine.snapshot(Utc::now())
    }

    /// Start tracking a new instrument.
    ///
    /// # Errors
    ///
    /// Returns `LadderError::Validation` for malformed input or a duplicate
    /// symbol. Nothing is changed in that case.
    pub async fn add(&self, request: &AddInstrumentDto) -> Result<InstrumentView, LadderError> {
        let new = request.validate()?;
        let record = InstrumentRecord::new(new.symbol.clone(), new.level_count, new.drawdown_fraction)?;
        self.engine.insert(record)?;
        self.engine.persist_and_publish(Utc::now()).await;

        self.engine
            .view(&new.symbol)
            .ok_or_else(|| LadderError::validation("symbol", format!("{} was removed", new.symbol)))
    }

    /// Flip each selected instrument between active and inactive.
    ///
    /// Deactivating never cancels broker orders.
    pub async fn toggle(&self, symbols: &[String]) -> SelectionResult {
        self.apply(symbols, |symbol| {
            self.engine
                .toggle(symbol)
                .map(|status| SelectionItem::applied(symbol, Some(status)))
        })
        .await
    }

    /// Stop tracking each selected instrument.
    ///
    /// Broker orders are left alone. A tick already running for a removed
    /// symbol finishes, but its results are discarded.
    pub async fn remove(&self, symbols: &[String]) -> SelectionResult {
        self.apply(symbols, |symbol| {
            self.engine
                .remove(symbol)
                .then(|| SelectionItem::applied(symbol, None))
        })
        .await
    }

    async fn apply(
        &self,
        symbols: &[String],
        action: impl Fn(&Symbol) -> Option<SelectionItem>,
    ) -> SelectionResult {
        let mut seen = HashSet::new();
        let selected: Vec<Symbol> = symbols
            .iter()
            .map(|raw| Symbol::new(raw.as_str()))
            .filter(|symbol| !symbol.as_str().is_empty() && seen.insert(symbol.clone()))
            .collect();
        if selected.is_empty() {
            return SelectionResult::warning(EMPTY_SELECTION);
        }

        let results: Vec<SelectionItem> = selected
            .iter()
            .map(|symbol| {
                action(symbol).unwrap_or_else(|| {
                    tracing::warn!(symbol = %symbol, "Selected instrument is not tracked");
                    SelectionItem::skipped(symbol.as_str(), NOT_TRACKED)
                })
            })
            .collect();

        let result = SelectionResult {
            warning: None,
            results,
        };
        if result.applied_count() > 0 {
            self.engine.persist_and_publish(Utc::now()).await;
        }
        result
    }
}
