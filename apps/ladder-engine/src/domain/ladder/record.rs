//! Instrument record aggregate.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::LadderError;
use super::level::LevelSlot;
use crate::domain::shared::Symbol;

/// Widest ladder a record may hold.
pub const MAX_LEVELS: u32 = 1_000;

/// Whether an instrument takes part in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    /// Reconciled every tick.
    Active,
    /// Skipped by reconciliation. Existing broker orders are left alone.
    Inactive,
}

impl InstrumentStatus {
    /// The opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

impl fmt::Display for InstrumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Whether the initial position was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    /// No entry order has gone through yet.
    NoPosition,
    /// An entry position exists (found at the broker or bought by the engine).
    Entered,
}

/// Derived progress of a ladder. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderPhase {
    /// No entry price and no position.
    Uninitialized,
    /// Position entered, entry price not yet known.
    Entering,
    /// Entry price known, at least one level still pending.
    Laddering,
    /// Every level placed.
    Idle,
}

/// Ladder state for one symbol.
///
/// Every index in `1..=level_count` holds exactly one [`LevelSlot`]; placed
/// slots are never re-priced or reverted. The drawdown fraction and the
/// number of levels are fixed once the record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRecord {
    symbol: Symbol,
    status: InstrumentStatus,
    position_state: PositionState,
    entry_price: Decimal,
    drawdown_fraction: Decimal,
    levels: BTreeMap<u32, LevelSlot>,
}

impl InstrumentRecord {
    /// Create an active record with `level_count` pending levels and no entry price.
    ///
    /// # Errors
    ///
    /// Returns `LadderError::Validation` if the count is zero or the fraction
    /// is outside (0, 1).
    pub fn new(
        symbol: Symbol,
        level_count: u32,
        drawdown_fraction: Decimal,
    ) -> Result<Self, LadderError> {
        validate_level_count(level_count)?;
        validate_fraction(drawdown_fraction)?;

        let levels = (1..=level_count)
            .map(|index| (index, LevelSlot::pending(Decimal::ZERO)))
            .collect();

        Ok(Self {
            symbol,
            status: InstrumentStatus::Active,
            position_state: PositionState::NoPosition,
            entry_price: Decimal::ZERO,
            drawdown_fraction,
            levels,
        })
    }

    /// Rebuild a record from persisted parts.
    ///
    /// Missing indices below the highest stored index are filled in as pending
    /// so that every index of the ladder has a slot.
    ///
    /// # Errors
    ///
    /// Returns `LadderError::Validation` if the parts cannot form a ladder.
    pub fn restore(
        symbol: Symbol,
        status: InstrumentStatus,
        position_state: PositionState,
        entry_price: Decimal,
        drawdown_fraction: Decimal,
        mut levels: BTreeMap<u32, LevelSlot>,
    ) -> Result<Self, LadderError> {
        validate_fraction(drawdown_fraction)?;
        if entry_price < Decimal::ZERO {
            return Err(LadderError::validation(
                "entry_price",
                "must not be negative",
            ));
        }
        if levels.contains_key(&0) {
            return Err(LadderError::validation("levels", "indices start at 1"));
        }
        let Some(&highest) = levels.keys().next_back() else {
            return Err(LadderError::validation(
                "levels",
                "at least one level is required",
            ));
        };
        validate_level_count(highest)?;
        for index in 1..highest {
            levels
                .entry(index)
                .or_insert_with(|| LevelSlot::pending(Decimal::ZERO));
        }

        Ok(Self {
            symbol,
            status,
            position_state,
            entry_price,
            drawdown_fraction,
            levels,
        })
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Reconciliation status.
    #[must_use]
    pub const fn status(&self) -> InstrumentStatus {
        self.status
    }

    /// Whether the record is reconciled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, InstrumentStatus::Active)
    }

    /// Whether an entry position was opened.
    #[must_use]
    pub const fn position_state(&self) -> PositionState {
        self.position_state
    }

    /// Last resolved entry price. Zero until established.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Spacing between levels as a fraction of the entry price.
    #[must_use]
    pub const fn drawdown_fraction(&self) -> Decimal {
        self.drawdown_fraction
    }

    /// Number of levels in the ladder.
    #[must_use]
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// All slots keyed by level index.
    #[must_use]
    pub const fn levels(&self) -> &BTreeMap<u32, LevelSlot> {
        &self.levels
    }

    /// Slot at `index`, if the ladder has one.
    #[must_use]
    pub fn slot(&self, index: u32) -> Option<&LevelSlot> {
        self.levels.get(&index)
    }

    /// Whether `index` already has an order.
    #[must_use]
    pub fn is_placed(&self, index: u32) -> bool {
        self.slot(index).is_some_and(LevelSlot::is_placed)
    }

    /// Pending levels as `(index, price)` in ascending index order.
    pub fn pending_levels(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.levels
            .iter()
            .filter(|(_, slot)| !slot.is_placed())
            .map(|(index, slot)| (*index, slot.price()))
    }

    /// Placed levels as `(index, price)` in ascending index order.
    pub fn placed_levels(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.levels
            .iter()
            .filter(|(_, slot)| slot.is_placed())
            .map(|(index, slot)| (*index, slot.price()))
    }

    /// Derived ladder phase.
    #[must_use]
    pub fn phase(&self) -> LadderPhase {
        if self.entry_price.is_zero() {
            return match self.position_state {
                PositionState::NoPosition => LadderPhase::Uninitialized,
                PositionState::Entered => LadderPhase::Entering,
            };
        }
        if self.levels.values().any(|slot| !slot.is_placed()) {
            LadderPhase::Laddering
        } else {
            LadderPhase::Idle
        }
    }

    /// Change the reconciliation status.
    pub const fn set_status(&mut self, status: InstrumentStatus) {
        self.status = status;
    }

    /// Flip the reconciliation status and return the new one.
    pub const fn toggle_status(&mut self) -> InstrumentStatus {
        self.status = self.status.toggled();
        self.status
    }

    /// Record that the entry position exists.
    pub const fn mark_entered(&mut self) {
        self.position_state = PositionState::Entered;
    }

    /// Store a freshly resolved entry price and re-price pending levels.
    ///
    /// Placed levels and indices outside the ladder are ignored. Returns the
    /// number of pending slots whose price changed.
    pub fn apply_schedule(&mut self, entry_price: Decimal, schedule: &[(u32, Decimal)]) -> usize {
        self.entry_price = entry_price;
        let mut repriced = 0;
        for &(index, price) in schedule {
            if let Some(slot) = self.levels.get_mut(&index)
                && !slot.is_placed()
                && slot.price() != price
            {
                *slot = LevelSlot::pending(price);
                repriced += 1;
            }
        }
        repriced
    }

    /// Move a pending level to placed at the submitted price.
    ///
    /// Returns `false` when the index is unknown or already placed.
    pub fn mark_placed(&mut self, index: u32, price: Decimal) -> bool {
        match self.levels.get_mut(&index) {
            Some(slot) if !slot.is_placed() => {
                *slot = LevelSlot::placed(price);
                true
            }
            _ => false,
        }
    }
}

fn validate_level_count(count: u32) -> Result<(), LadderError> {
    if count == 0 || count > MAX_LEVELS {
        return Err(LadderError::validation(
            "levels",
            format!("must be a positive integer no greater than {MAX_LEVELS}"),
        ));
    }
    Ok(())
}

fn validate_fraction(fraction: Decimal) -> Result<(), LadderError> {
    if fraction <= Decimal::ZERO || fraction >= Decimal::ONE {
        return Err(LadderError::validation(
            "drawdown",
            "must be between 0 and 100 percent (exclusive)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ladder::LevelState;
    use rust_decimal_macros::dec;

    fn record(count: u32) -> InstrumentRecord {
        InstrumentRecord::new(Symbol::new("AAPL"), count, dec!(0.05)).unwrap()
    }

    #[test]
    fn new_seeds_every_level_as_pending() {
        let record = record(3);
        assert_eq!(record.level_count(), 3);
        assert!(
            record
                .levels()
                .values()
                .all(|slot| slot.state() == LevelState::Pending)
        );
        assert_eq!(record.phase(), LadderPhase::Uninitialized);
        assert!(record.is_active());
    }

    #[test]
    fn new_rejects_zero_levels() {
        let err = InstrumentRecord::new(Symbol::new("AAPL"), 0, dec!(0.05)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn new_rejects_ladders_wider_than_max() {
        let err = InstrumentRecord::new(Symbol::new("AAPL"), MAX_LEVELS + 1, dec!(0.0001)).unwrap_err();
        assert!(err.is_validation());
        assert!(InstrumentRecord::new(Symbol::new("AAPL"), MAX_LEVELS, dec!(0.0001)).is_ok());
    }

    #[test]
    fn restore_rejects_index_beyond_max() {
        let mut levels = BTreeMap::new();
        levels.insert(999_999_999, LevelSlot::placed(dec!(1)));

        let err = InstrumentRecord::restore(
            Symbol::new("AAPL"),
            InstrumentStatus::Active,
            PositionState::Entered,
            dec!(100),
            dec!(0.05),
            levels,
        )
        .unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn new_rejects_fraction_out_of_range() {
        assert!(InstrumentRecord::new(Symbol::new("AAPL"), 3, dec!(0)).is_err());
        assert!(InstrumentRecord::new(Symbol::new("AAPL"), 3, dec!(1)).is_err());
        assert!(InstrumentRecord::new(Symbol::new("AAPL"), 3, dec!(-0.1)).is_err());
    }

    #[test]
    fn apply_schedule_skips_placed_levels() {
        let mut record = record(3);
        record.apply_schedule(dec!(100), &[(1, dec!(95)), (2, dec!(90)), (3, dec!(85))]);
        assert!(record.mark_placed(1, dec!(95)));

        let repriced =
            record.apply_schedule(dec!(110), &[(1, dec!(104.5)), (2, dec!(99)), (3, dec!(93.5))]);

        assert_eq!(repriced, 2);
        assert_eq!(record.entry_price(), dec!(110));
        assert_eq!(record.slot(1), Some(&LevelSlot::placed(dec!(95))));
        assert_eq!(record.slot(2), Some(&LevelSlot::pending(dec!(99))));
    }

    #[test]
    fn apply_schedule_ignores_unknown_indices() {
        let mut record = record(2);
        record.apply_schedule(dec!(100), &[(1, dec!(95)), (7, dec!(65))]);
        assert_eq!(record.level_count(), 2);
        assert!(record.slot(7).is_none());
    }

    #[test]
    fn mark_placed_is_one_way() {
        let mut record = record(2);
        assert!(record.mark_placed(2, dec!(90)));
        assert!(!record.mark_placed(2, dec!(80)));
        assert!(!record.mark_placed(9, dec!(80)));
        assert_eq!(record.slot(2).map(LevelSlot::price), Some(dec!(90)));
    }

    #[test]
    fn no_index_is_both_pending_and_placed() {
        let mut record = record(4);
        record.apply_schedule(dec!(100), &[(1, dec!(95)), (2, dec!(90)), (3, dec!(85)), (4, dec!(80))]);
        record.mark_placed(1, dec!(95));
        record.mark_placed(3, dec!(85));

        let pending: Vec<u32> = record.pending_levels().map(|(index, _)| index).collect();
        let placed: Vec<u32> = record.placed_levels().map(|(index, _)| index).collect();

        assert_eq!(pending, vec![2, 4]);
        assert_eq!(placed, vec![1, 3]);
        assert!(pending.iter().all(|index| !placed.contains(index)));
    }

    #[test]
    fn phase_follows_progress() {
        let mut record = record(2);
        assert_eq!(record.phase(), LadderPhase::Uninitialized);

        record.mark_entered();
        assert_eq!(record.phase(), LadderPhase::Entering);

        record.apply_schedule(dec!(100), &[(1, dec!(95)), (2, dec!(90))]);
        assert_eq!(record.phase(), LadderPhase::Laddering);

        record.mark_placed(1, dec!(95));
        record.mark_placed(2, dec!(90));
        assert_eq!(record.phase(), LadderPhase::Idle);
    }

    #[test]
    fn toggle_status_flips() {
        let mut record = record(1);
        assert_eq!(record.toggle_status(), InstrumentStatus::Inactive);
        assert!(!record.is_active());
        assert_eq!(record.toggle_status(), InstrumentStatus::Active);
    }

    #[test]
    fn restore_fills_gaps_with_pending() {
        let levels = BTreeMap::from([(1, LevelSlot::placed(dec!(95))), (3, LevelSlot::pending(dec!(85)))]);
        let record = InstrumentRecord::restore(
            Symbol::new("AAPL"),
            InstrumentStatus::Active,
            PositionState::Entered,
            dec!(100),
            dec!(0.05),
            levels,
        )
        .unwrap();

        assert_eq!(record.level_count(), 3);
        assert_eq!(record.slot(2), Some(&LevelSlot::pending(Decimal::ZERO)));
        assert!(record.is_placed(1));
    }

    #[test]
    fn restore_rejects_empty_ladder() {
        let result = InstrumentRecord::restore(
            Symbol::new("AAPL"),
            InstrumentStatus::Active,
            PositionState::NoPosition,
            Decimal::ZERO,
            dec!(0.05),
            BTreeMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn restore_rejects_index_zero() {
        let result = InstrumentRecord::restore(
            Symbol::new("AAPL"),
            InstrumentStatus::Active,
            PositionState::NoPosition,
            Decimal::ZERO,
            dec!(0.05),
            BTreeMap::from([(0, LevelSlot::pending(dec!(100)))]),
        );
        assert!(result.is_err());
    }
}
