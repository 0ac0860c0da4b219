//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::ladder::LadderError;

/// Maximum accepted symbol length.
pub const MAX_SYMBOL_LEN: usize = 21;

/// A tradable instrument ticker, e.g. "AAPL" or "BRK.B".
///
/// Symbols are the unique key of the instrument book, so they are normalized
/// to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Create a Symbol and validate it in one step.
    ///
    /// # Errors
    ///
    /// Returns `LadderError::Validation` if the symbol is malformed.
    pub fn parse(value: impl Into<String>) -> Result<Self, LadderError> {
        let symbol = Self::new(value);
        symbol.validate()?;
        Ok(symbol)
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate the symbol for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if symbol is empty, too long or contains invalid characters.
    pub fn validate(&self) -> Result<(), LadderError> {
        if self.0.is_empty() {
            return Err(LadderError::validation("symbol", "Symbol cannot be empty"));
        }

        if self.0.len() > MAX_SYMBOL_LEN {
            return Err(LadderError::validation(
                "symbol",
                "Symbol exceeds maximum length",
            ));
        }

        // Share classes use '.' or '-' (BRK.B, BF-B)
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(LadderError::validation(
                "symbol",
                "Symbol contains invalid characters",
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
