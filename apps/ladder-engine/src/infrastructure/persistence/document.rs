//! On-disk document format.
//!
//! ```json
//! {
//!   "AAPL": {
//!     "position": 1,
//!     "entry_price": 100.0,
//!     "levels": { "-1": 95.0, "2": 90.0, "3": 85.0 },
//!     "drawdown": 0.05,
//!     "status": "on"
//!   }
//! }
//! ```
//!
//! Level keys carry the state in their sign: `n` is pending, `-n` is placed.
//! When both appear for the same index the placed entry wins.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::InstrumentBook;
use crate::domain::ladder::{
    InstrumentRecord, InstrumentStatus, LadderError, LevelSlot, PositionState,
};
use crate::domain::shared::Symbol;

const STATUS_ON: &str = "on";
const STATUS_OFF: &str = "off";

/// Whole document keyed by symbol.
pub type StoredBook = BTreeMap<String, StoredInstrument>;

/// One instrument as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredInstrument {
    /// 0 = no position, 1 = entered.
    pub position: u8,
    /// Entry price, 0 until known.
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_price: Decimal,
    /// Sign-keyed level prices.
    pub levels: BTreeMap<String, StoredPrice>,
    /// Drawdown fraction.
    #[serde(with = "rust_decimal::serde::float")]
    pub drawdown: Decimal,
    /// "on" or "off".
    pub status: String,
}

/// A price written as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredPrice(#[serde(with = "rust_decimal::serde::float")] pub Decimal);

impl StoredInstrument {
    /// Encode a record.
    #[must_use]
    pub fn from_record(record: &InstrumentRecord) -> Self {
        let levels = record
            .levels()
            .iter()
            .map(|(index, slot)| {
                let key = if slot.is_placed() {
                    format!("-{index}")
                } else {
                    index.to_string()
                };
                (key, StoredPrice(slot.price()))
            })
            .collect();

        Self {
            position: match record.position_state() {
                PositionState::NoPosition => 0,
                PositionState::Entered => 1,
            },
            entry_price: record.entry_price(),
            levels,
            drawdown: record.drawdown_fraction(),
            status: match record.status() {
                InstrumentStatus::Active => STATUS_ON,
                InstrumentStatus::Inactive => STATUS_OFF,
            }
            .to_string(),
        }
    }

    /// Decode into a record for `symbol`.
    ///
    /// Any status other than "on" decodes as inactive.
    pub fn into_record(self, symbol: &str) -> Result<InstrumentRecord, LadderError> {
        let symbol = Symbol::parse(symbol)?;

        let mut pending = BTreeMap::new();
        let mut placed = BTreeMap::new();
        for (key, StoredPrice(price)) in self.levels {
            let signed: i64 = key
                .trim()
                .parse()
                .map_err(|_| LadderError::validation("levels", format!("bad level key '{key}'")))?;
            let index = u32::try_from(signed.unsigned_abs())
                .ok()
                .filter(|index| *index > 0)
                .ok_or_else(|| LadderError::validation("levels", format!("bad level key '{key}'")))?;
            if signed < 0 {
                placed.insert(index, LevelSlot::placed(price));
            } else {
                pending.insert(index, LevelSlot::pending(price));
            }
        }
        pending.extend(placed);

        let status = if self.status.trim().eq_ignore_ascii_case(STATUS_ON) {
            InstrumentStatus::Active
        } else {
            InstrumentStatus::Inactive
        };
        let position_state = if self.position == 0 {
            PositionState::NoPosition
        } else {
            PositionState::Entered
        };

        InstrumentRecord::restore(
            symbol,
            status,
            position_state,
            self.entry_price,
            self.drawdown,
            pending,
        )
    }
}

/// Encode the whole book.
#[must_use]
pub fn encode_book(book: &InstrumentBook) -> StoredBook {
    book.iter()
        .map(|(symbol, record)| (symbol.to_string(), StoredInstrument::from_record(record)))
        .collect()
}

/// Decode the whole book, dropping entries that cannot form a ladder.
#[must_use]
pub fn decode_book(stored: StoredBook) -> InstrumentBook {
    let mut book = InstrumentBook::new();
    for (key, instrument) in stored {
        match instrument.into_record(&key) {
            Ok(record) => {
                if book.contains_key(record.symbol()) {
                    tracing::warn!(symbol = %key, "Duplicate stored instrument ignored");
                    continue;
                }
                book.insert(record.symbol().clone(), record);
            }
            Err(e) => tracing::warn!(symbol = %key, error = %e, "Stored instrument ignored"),
        }
    }
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ladder::LevelState;
    use rust_decimal_macros::dec;

    const DOCUMENT: &str = r#"{
        "AAPL": {
            "position": 1,
            "entry_price": 100.0,
            "levels": { "-1": 95.0, "2": 90.0, "3": 85.0 },
            "drawdown": 0.05,
            "status": "on"
        }
    }"#;

    #[test]
    fn decodes_sign_keyed_levels() {
        let stored: StoredBook = serde_json::from_str(DOCUMENT).unwrap();
        let book = decode_book(stored);

        let record = book.get(&Symbol::new("AAPL")).unwrap();
        assert_eq!(record.position_state(), PositionState::Entered);
        assert_eq!(record.entry_price(), dec!(100));
        assert_eq!(record.drawdown_fraction(), dec!(0.05));
        assert!(record.is_active());
        assert_eq!(record.slot(1), Some(&LevelSlot::placed(dec!(95))));
        assert_eq!(record.slot(2).map(LevelSlot::state), Some(LevelState::Pending));
        assert_eq!(record.level_count(), 3);
    }

    #[test]
    fn encodes_placed_levels_with_negative_keys() {
        let mut record = InstrumentRecord::new(Symbol::new("AAPL"), 2, dec!(0.05)).unwrap();
        record.mark_entered();
        record.apply_schedule(dec!(100), &[(1, dec!(95)), (2, dec!(90))]);
        record.mark_placed(1, dec!(95));

        let stored = StoredInstrument::from_record(&record);
        let json = serde_json::to_value(&stored).unwrap();

        assert_eq!(json["levels"]["-1"], serde_json::json!(95.0));
        assert_eq!(json["levels"]["2"], serde_json::json!(90.0));
        assert_eq!(json["status"], "on");
        assert_eq!(json["position"], 1);
        assert_eq!(stored.into_record("AAPL").unwrap(), record);
    }

    #[test]
    fn placed_wins_over_pending_for_same_index() {
        let json = r#"{"position":1,"entry_price":100,"levels":{"1":95.5,"-1":95.0},"drawdown":0.05,"status":"on"}"#;
        let stored: StoredInstrument = serde_json::from_str(json).unwrap();

        let record = stored.into_record("AAPL").unwrap();

        assert_eq!(record.slot(1), Some(&LevelSlot::placed(dec!(95))));
        assert_eq!(record.level_count(), 1);
    }

    #[test]
    fn unknown_status_is_inactive() {
        let json = r#"{"position":0,"entry_price":0,"levels":{"1":0},"drawdown":0.1,"status":"paused"}"#;
        let stored: StoredInstrument = serde_json::from_str(json).unwrap();

        let record = stored.into_record("msft").unwrap();

        assert!(!record.is_active());
        assert_eq!(record.symbol().as_str(), "MSFT");
    }

    #[test]
    fn oversized_level_index_drops_only_that_entry() {
        let json = r#"{
            "AAPL": {"position":1,"entry_price":100,"levels":{"-999999999":95.0},"drawdown":0.05,"status":"on"},
            "MSFT": {"position":0,"entry_price":0,"levels":{"1":0,"2":0},"drawdown":0.1,"status":"on"}
        }"#;
        let stored: StoredBook = serde_json::from_str(json).unwrap();

        let book = decode_book(stored);

        assert!(!book.contains_key(&Symbol::new("AAPL")));
        assert_eq!(book.get(&Symbol::new("MSFT")).unwrap().level_count(), 2);
    }

    #[test]
    fn invalid_entries_are_dropped() {
        let json = r#"{
            "GOOD": {"position":0,"entry_price":0,"levels":{"1":0},"drawdown":0.1,"status":"on"},
            "ZERO": {"position":0,"entry_price":0,"levels":{"0":0},"drawdown":0.1,"status":"on"},
            "WIDE": {"position":0,"entry_price":0,"levels":{"1":0},"drawdown":1.5,"status":"on"},
            "KEYS": {"position":0,"entry_price":0,"levels":{"one":0},"drawdown":0.1,"status":"on"}
        }"#;
        let stored: StoredBook = serde_json::from_str(json).unwrap();

        let book = decode_book(stored);

        assert_eq!(book.len(), 1);
        assert!(book.contains_key(&Symbol::new("GOOD")));
    }
}
