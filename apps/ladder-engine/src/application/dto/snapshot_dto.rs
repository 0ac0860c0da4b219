//! Read-side DTOs: ladder snapshots and tick reports

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ladder::{
    InstrumentRecord, InstrumentStatus, LadderPhase, LevelState, PositionState,
};
use crate::domain::shared::Symbol;

/// Broker-side observations kept next to a record. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDiagnostics {
    /// Last observed market price.
    pub last_price: Option<Decimal>,
    /// Last failure seen while reconciling, cleared on a clean pass.
    pub last_error: Option<String>,
    /// When the instrument was last reconciled.
    pub updated_at: Option<DateTime<Utc>>,
}

/// One ladder level as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    /// Level index, starting at 1.
    pub index: u32,
    /// Pending or placed.
    pub state: LevelState,
    /// Target price (pending) or submitted limit price (placed).
    pub price: Decimal,
}

/// One instrument as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentView {
    /// Symbol.
    pub symbol: String,
    /// Reconciliation status.
    pub status: InstrumentStatus,
    /// Entry position state.
    pub position_state: PositionState,
    /// Derived ladder phase.
    pub phase: LadderPhase,
    /// Entry price, zero until known.
    pub entry_price: Decimal,
    /// Level spacing in percent.
    pub drawdown_percent: Decimal,
    /// Number of levels.
    pub level_count: u32,
    /// Levels in index order.
    pub levels: Vec<LevelView>,
    /// Last observed market price.
    pub last_price: Option<Decimal>,
    /// Last reconciliation failure.
    pub last_error: Option<String>,
}

impl InstrumentView {
    /// Build a view from a record and its diagnostics.
    #[must_use]
    pub fn from_record(record: &InstrumentRecord, diagnostics: Option<&InstrumentDiagnostics>) -> Self {
        let levels = record
            .levels()
            .iter()
            .map(|(index, slot)| LevelView {
                index: *index,
                state: slot.state(),
                price: slot.price(),
            })
            .collect();

        Self {
            symbol: record.symbol().to_string(),
            status: record.status(),
            position_state: record.position_state(),
            phase: record.phase(),
            entry_price: record.entry_price(),
            drawdown_percent: (record.drawdown_fraction() * Decimal::ONE_HUNDRED).normalize(),
            level_count: record.level_count(),
            levels,
            last_price: diagnostics.and_then(|d| d.last_price),
            last_error: diagnostics.and_then(|d| d.last_error.clone()),
        }
    }
}

/// Immutable view of the whole book, published after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderSnapshot {
    /// Number of completed reconciliation ticks.
    pub tick: u64,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Instruments in symbol order.
    pub instruments: Vec<InstrumentView>,
}

impl LadderSnapshot {
    /// Find an instrument by symbol.
    #[must_use]
    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentView> {
        self.instruments.iter().find(|view| view.symbol == symbol)
    }
}

/// What one reconciliation unit did for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolOutcome {
    /// Symbol.
    pub symbol: Symbol,
    /// Entry price the ladder was computed from.
    pub entry_price: Option<Decimal>,
    /// Levels submitted this tick.
    pub submitted: Vec<u32>,
    /// Levels matched to an already open broker order.
    pub adopted: Vec<u32>,
    /// Levels whose submission failed or was not attempted.
    pub failed: Vec<u32>,
    /// Why the unit stopped early.
    pub skipped: Option<String>,
    /// Last failure seen during the unit.
    pub error: Option<String>,
}

impl SymbolOutcome {
    /// An empty outcome for `symbol`.
    #[must_use]
    pub const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            entry_price: None,
            submitted: Vec::new(),
            adopted: Vec::new(),
            failed: Vec::new(),
            skipped: None,
            error: None,
        }
    }

    /// Mark the unit as stopped early.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skipped = Some(reason.into());
    }

    /// Remember a failure. The latest one wins.
    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }

    /// Whether the unit ran to completion without failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_none() && self.error.is_none() && self.failed.is_empty()
    }
}

/// Summary of one reconciliation tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick sequence number, starting at 1.
    pub tick: u64,
    /// When the tick started.
    pub started_at: DateTime<Utc>,
    /// When the tick finished.
    pub finished_at: DateTime<Utc>,
    /// Whether the book was saved.
    pub persisted: bool,
    /// One entry per active instrument.
    pub outcomes: Vec<SymbolOutcome>,
}

impl TickReport {
    /// Total orders submitted.
    #[must_use]
    pub fn submitted_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.submitted.len()).sum()
    }

    /// Total levels that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed.len()).sum()
    }

    /// Number of units that stopped early.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped.is_some()).count()
    }

    /// Outcome for `symbol`.
    #[must_use]
    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.outcomes.iter().find(|o| o.symbol.as_str() == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn view_reports_percent_and_levels() {
        let mut record = InstrumentRecord::new(Symbol::new("AAPL"), 2, dec!(0.05)).unwrap();
        record.apply_schedule(dec!(100), &[(1, dec!(95)), (2, dec!(90))]);
        record.mark_placed(1, dec!(95));
        let diagnostics = InstrumentDiagnostics {
            last_price: Some(dec!(101.5)),
            last_error: None,
            updated_at: None,
        };

        let view = InstrumentView::from_record(&record, Some(&diagnostics));

        assert_eq!(view.drawdown_percent, dec!(5));
        assert_eq!(view.phase, LadderPhase::Laddering);
        assert_eq!(view.levels[0].state, LevelState::Placed);
        assert_eq!(view.levels[1].state, LevelState::Pending);
        assert_eq!(view.last_price, Some(dec!(101.5)));
    }

    #[test]
    fn report_counts() {
        let mut a = SymbolOutcome::new(Symbol::new("AAPL"));
        a.submitted = vec![1, 2];
        let mut b = SymbolOutcome::new(Symbol::new("MSFT"));
        b.failed = vec![3];
        b.skip("broker unavailable");
        let now = Utc::now();
        let report = TickReport {
            tick: 1,
            started_at: now,
            finished_at: now,
            persisted: true,
            outcomes: vec![a, b],
        };

        assert_eq!(report.submitted_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.outcome("AAPL").is_some_and(SymbolOutcome::is_clean));
    }
}
