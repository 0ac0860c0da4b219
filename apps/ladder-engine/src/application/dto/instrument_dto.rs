//! Instrument management DTOs

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ladder::scheduler::ladder_stays_positive;
use crate::domain::ladder::{InstrumentStatus, LadderError, MAX_LEVELS};
use crate::domain::shared::Symbol;

/// Add-instrument input as typed by a user. Numbers arrive as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddInstrumentDto {
    /// Ticker.
    pub symbol: String,
    /// Number of ladder levels.
    pub levels: String,
    /// Spacing between levels in percent.
    pub drawdown: String,
}

/// A validated add-instrument request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstrument {
    /// Normalized symbol.
    pub symbol: Symbol,
    /// Number of ladder levels.
    pub level_count: u32,
    /// Spacing as a fraction in (0, 1).
    pub drawdown_fraction: Decimal,
}

impl AddInstrumentDto {
    /// Create a DTO from raw field values.
    pub fn new(
        symbol: impl Into<String>,
        levels: impl Into<String>,
        drawdown: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            levels: levels.into(),
            drawdown: drawdown.into(),
        }
    }

    /// Validate and convert to domain values.
    ///
    /// Duplicate detection needs the book and happens in the use case.
    pub fn validate(&self) -> Result<NewInstrument, LadderError> {
        let symbol = Symbol::parse(self.symbol.as_str())?;

        let level_count = self
            .levels
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|count| (1..=MAX_LEVELS).contains(count))
            .ok_or_else(|| {
                LadderError::validation(
                    "levels",
                    format!("must be a positive integer no greater than {MAX_LEVELS}"),
                )
            })?;

        let percent = Decimal::from_str(self.drawdown.trim().trim_end_matches('%').trim())
            .map_err(|_| LadderError::validation("drawdown", "must be a number"))?;
        if percent <= Decimal::ZERO || percent >= Decimal::ONE_HUNDRED {
            return Err(LadderError::validation(
                "drawdown",
                "must be greater than 0 and less than 100 percent",
            ));
        }
        let drawdown_fraction = percent / Decimal::ONE_HUNDRED;

        if !ladder_stays_positive(drawdown_fraction, level_count) {
            return Err(LadderError::validation(
                "levels",
                format!("{level_count} levels at {percent}% would reach a zero price"),
            ));
        }

        Ok(NewInstrument {
            symbol,
            level_count,
            drawdown_fraction,
        })
    }
}

/// Result of a toggle or remove request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Set when the request could not do anything, e.g. an empty selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// One entry per requested symbol.
    pub results: Vec<SelectionItem>,
}

impl SelectionResult {
    /// A no-op result carrying a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            warning: Some(message.into()),
            results: Vec::new(),
        }
    }

    /// Number of symbols the request applied to.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|item| item.applied).count()
    }
}

/// Per-symbol entry of a [`SelectionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    /// Requested symbol, normalized.
    pub symbol: String,
    /// Whether the request changed anything for this symbol.
    pub applied: bool,
    /// Status after a toggle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InstrumentStatus>,
    /// Reason when not applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SelectionItem {
    /// An applied entry.
    #[must_use]
    pub fn applied(symbol: &Symbol, status: Option<InstrumentStatus>) -> Self {
        Self {
            symbol: symbol.to_string(),
            applied: true,
            status,
            message: None,
        }
    }

    /// A skipped entry with a reason.
    pub fn skipped(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            applied: false,
            status: None,
            message: Some(message.into()),
        }
    }
}
