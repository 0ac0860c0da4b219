//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

use crate::application::dto::AddInstrumentDto;

/// A form field that may arrive as a JSON number or as typed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Typed text, kept verbatim for validation.
    Text(String),
    /// A JSON number.
    Number(serde_json::Number),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Request to start tracking an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddInstrumentRequest {
    /// Ticker.
    pub symbol: String,
    /// Number of ladder levels.
    #[serde(default)]
    pub levels: FieldValue,
    /// Spacing between levels in percent.
    #[serde(default)]
    pub drawdown: FieldValue,
}

impl From<AddInstrumentRequest> for AddInstrumentDto {
    fn from(request: AddInstrumentRequest) -> Self {
        Self::new(
            request.symbol,
            request.levels.into_text(),
            request.drawdown.into_text(),
        )
    }
}

/// Request naming a set of instruments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Selected symbols.
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// Question for the advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorRequest {
    /// Free-text message.
    #[serde(default)]
    pub message: String,
}
