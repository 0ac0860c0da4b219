//! Ladder domain errors.

use thiserror::Error;

/// Errors raised by ladder validation and level computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderError {
    /// User input was rejected. Nothing was mutated.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending input field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// A computation received parameters outside its domain.
    ///
    /// Reaching this from the engine indicates a defect, since records are
    /// validated on creation.
    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter {
        /// Offending parameter name.
        parameter: String,
        /// Human-readable reason.
        message: String,
    },
}

impl LadderError {
    /// Build a `Validation` error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an `InvalidParameter` error.
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from rejected user input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
