//! Broker Gateway Port (Driven Port)
//!
//! Market data and order entry for one brokerage account. The engine only
//! ever buys, and never cancels or modifies an order it submitted.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::Symbol;

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Fill at the prevailing price.
    Market,
    /// Fill at `limit_price` or better.
    Limit,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    /// Expires at the end of the session.
    Day,
    /// Good until cancelled.
    Gtc,
}

/// Request to submit a buy order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// Client order ID.
    pub client_order_id: String,
    /// Symbol to buy.
    pub symbol: Symbol,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price (for limit orders).
    pub limit_price: Option<Decimal>,
    /// Time in force.
    pub time_in_force: TimeInForce,
}

impl SubmitOrderRequest {
    /// Create a market buy request.
    #[must_use]
    pub fn market(symbol: Symbol, quantity: Decimal) -> Self {
        Self {
            client_order_id: client_order_id(&symbol, "entry"),
            symbol,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            time_in_force: TimeInForce::Day,
        }
    }

    /// Create a GTC limit buy request for ladder level `index`.
    #[must_use]
    pub fn limit(symbol: Symbol, quantity: Decimal, limit_price: Decimal, index: u32) -> Self {
        Self {
            client_order_id: client_order_id(&symbol, &format!("l{index}")),
            symbol,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
            time_in_force: TimeInForce::Gtc,
        }
    }
}

fn client_order_id(symbol: &Symbol, tag: &str) -> String {
    format!("ladder-{}-{tag}-{}", symbol.as_str().to_lowercase(), Uuid::new_v4().simple())
}

/// Acknowledgment from broker after order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker-assigned order ID.
    pub broker_order_id: String,
    /// Client order ID echoed back.
    pub client_order_id: String,
    /// Broker-reported status, e.g. "new" or "filled".
    pub status: String,
    /// Filled quantity (if any).
    pub filled_qty: Decimal,
    /// Average fill price (if any).
    pub avg_fill_price: Option<Decimal>,
}

/// Broker port error.
///
/// Every variant means the broker could not be used right now; the engine
/// skips the affected unit and retries on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// The call did not finish within the configured deadline.
    #[error("Broker call {operation} timed out after {after_ms}ms")]
    Timeout {
        /// Gateway operation that timed out.
        operation: String,
        /// Deadline in milliseconds.
        after_ms: u64,
    },

    /// Order rejected by broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Insufficient funds.
    #[error("Insufficient buying power")]
    InsufficientFunds,

    /// Rate limited.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Latest trade price.
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Decimal, BrokerError>;

    /// Position quantity, or `None` when no position exists.
    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError>;

    /// Highest average fill price among filled orders, or `None` when nothing filled.
    async fn get_max_filled_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError>;

    /// Limit prices of currently open orders.
    async fn list_open_orders(&self, symbol: &Symbol) -> Result<Vec<Decimal>, BrokerError>;

    /// Submit an order to the broker.
    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderAck, BrokerError>;

    /// Submit a market buy.
    async fn submit_market_buy(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
    ) -> Result<OrderAck, BrokerError> {
        self.submit_order(SubmitOrderRequest::market(symbol.clone(), quantity))
            .await
    }

    /// Submit a GTC limit buy for ladder level `index`.
    async fn submit_limit_buy(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
        limit_price: Decimal,
        index: u32,
    ) -> Result<OrderAck, BrokerError> {
        self.submit_order(SubmitOrderRequest::limit(
            symbol.clone(),
            quantity,
            limit_price,
            index,
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_request_is_day_order() {
        let request = SubmitOrderRequest::market(Symbol::new("AAPL"), dec!(1));
        assert_eq!(request.order_type, OrderType::Market);
        assert_eq!(request.time_in_force, TimeInForce::Day);
        assert!(request.limit_price.is_none());
        assert!(request.client_order_id.starts_with("ladder-aapl-entry-"));
    }

    #[test]
    fn limit_request_is_gtc() {
        let request = SubmitOrderRequest::limit(Symbol::new("AAPL"), dec!(1), dec!(95), 1);
        assert_eq!(request.order_type, OrderType::Limit);
        assert_eq!(request.time_in_force, TimeInForce::Gtc);
        assert_eq!(request.limit_price, Some(dec!(95)));
        assert!(request.client_order_id.starts_with("ladder-aapl-l1-"));
    }

    #[test]
    fn client_order_ids_are_unique() {
        let a = SubmitOrderRequest::limit(Symbol::new("AAPL"), dec!(1), dec!(95), 1);
        let b = SubmitOrderRequest::limit(Symbol::new("AAPL"), dec!(1), dec!(95), 1);
        assert_ne!(a.client_order_id, b.client_order_id);
    }

    #[test]
    fn timeout_display() {
        let err = BrokerError::Timeout {
            operation: "get_position".to_string(),
            after_ms: 10_000,
        };
        assert_eq!(err.to_string(), "Broker call get_position timed out after 10000ms");
    }
}
