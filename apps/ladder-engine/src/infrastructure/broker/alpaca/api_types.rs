//! Alpaca API request and response types.
//!
//! These types map directly to Alpaca's REST API format. Unused response
//! fields are left out; serde ignores them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::OrderAck;

// ============================================================================
// Order Types
// ============================================================================

/// Order request for Alpaca API.
#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    /// Stock symbol.
    pub symbol: String,
    /// Quantity (shares).
    pub qty: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force.
    pub time_in_force: String,
    /// Limit price (for limit orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    /// Client order ID.
    pub client_order_id: String,
}

/// Order as returned by Alpaca.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    /// Broker order ID.
    pub id: String,
    /// Client order ID.
    pub client_order_id: String,
    /// Filled quantity (as string).
    #[serde(default)]
    pub filled_qty: Option<String>,
    /// Average fill price (as string).
    #[serde(default)]
    pub filled_avg_price: Option<String>,
    /// Order status.
    pub status: String,
    /// Limit price.
    #[serde(default)]
    pub limit_price: Option<String>,
}

impl AlpacaOrderResponse {
    /// Convert to `OrderAck`.
    #[must_use]
    pub fn to_order_ack(&self) -> OrderAck {
        OrderAck {
            broker_order_id: self.id.clone(),
            client_order_id: self.client_order_id.clone(),
            status: self.status.to_lowercase(),
            filled_qty: parse_decimal(self.filled_qty.as_deref()).unwrap_or(Decimal::ZERO),
            avg_fill_price: self.fill_price(),
        }
    }

    /// Whether the order is completely filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status.eq_ignore_ascii_case("filled")
    }

    /// Average fill price, if any.
    #[must_use]
    pub fn fill_price(&self) -> Option<Decimal> {
        parse_decimal(self.filled_avg_price.as_deref())
    }

    /// Limit price, if any.
    #[must_use]
    pub fn limit(&self) -> Option<Decimal> {
        parse_decimal(self.limit_price.as_deref())
    }
}

/// Query for `GET /v2/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderListQuery<'a> {
    /// "open", "closed" or "all".
    pub status: &'static str,
    /// Comma separated symbols.
    pub symbols: &'a str,
    /// Page size.
    pub limit: u32,
    /// "asc" or "desc".
    pub direction: &'static str,
}

// ============================================================================
// Position Types
// ============================================================================

/// Position response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    /// Quantity.
    pub qty: String,
}

// ============================================================================
// Market Data Types
// ============================================================================

/// Response of `GET /v2/stocks/{symbol}/trades/latest`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaLatestTradeResponse {
    /// The trade.
    pub trade: AlpacaTrade,
}

/// One trade print.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaTrade {
    /// Trade price.
    #[serde(rename = "p")]
    pub price: Decimal,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code, numeric in practice.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    /// Error message.
    pub message: String,
}

impl AlpacaErrorResponse {
    /// Error code rendered as text.
    #[must_use]
    pub fn code_text(&self) -> Option<String> {
        self.code.as_ref().map(|code| match code {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    value.and_then(|v| v.trim().parse().ok())
}
