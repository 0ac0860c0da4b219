//! Paper broker.
//!
//! In-process simulated account. Market buys fill immediately at the quote;
//! limit buys rest until the quote drops to their price. Quotes default to
//! 100 until set.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::application::ports::{
    BrokerError, BrokerGateway, OrderAck, OrderType, SubmitOrderRequest,
};
use crate::domain::shared::Symbol;

/// Quote used for symbols without an explicit one.
pub const DEFAULT_QUOTE: Decimal = dec!(100);

#[derive(Debug, Clone)]
struct RestingOrder {
    quantity: Decimal,
    limit_price: Decimal,
}

#[derive(Debug, Default)]
struct PaperAccount {
    quote: Option<Decimal>,
    position: Decimal,
    fill_prices: Vec<Decimal>,
    resting: Vec<RestingOrder>,
}

impl PaperAccount {
    fn fill(&mut self, quantity: Decimal, price: Decimal) {
        self.position += quantity;
        self.fill_prices.push(price);
    }

    /// Fill every resting order the current quote has reached.
    fn cross(&mut self, quote: Decimal) {
        let (filled, resting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.resting)
            .into_iter()
            .partition(|order| order.limit_price >= quote);
        self.resting = resting;
        for order in filled {
            self.fill(order.quantity, order.limit_price);
        }
    }
}

/// Simulated broker for paper mode and tests.
#[derive(Debug, Default)]
pub struct PaperBroker {
    accounts: Mutex<HashMap<Symbol, PaperAccount>>,
}

impl PaperBroker {
    /// Create a paper broker with no positions or orders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the quote for `symbol`, filling any resting orders it reaches.
    pub fn set_quote(&self, symbol: &Symbol, quote: Decimal) {
        let mut accounts = self.accounts.lock();
        let account = accounts.entry(symbol.clone()).or_default();
        account.quote = Some(quote);
        account.cross(quote);
    }

    /// Quantity held for `symbol`.
    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Decimal {
        self.accounts
            .lock()
            .get(symbol)
            .map_or(Decimal::ZERO, |account| account.position)
    }

    /// Limit prices of resting orders for `symbol`, in submission order.
    #[must_use]
    pub fn resting_orders(&self, symbol: &Symbol) -> Vec<Decimal> {
        self.accounts.lock().get(symbol).map_or_else(Vec::new, |account| {
            account.resting.iter().map(|order| order.limit_price).collect()
        })
    }

    fn quote_of(account: &PaperAccount) -> Decimal {
        account.quote.unwrap_or(DEFAULT_QUOTE)
    }
}

#[async_trait]
impl BrokerGateway for PaperBroker {
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Decimal, BrokerError> {
        Ok(self
            .accounts
            .lock()
            .get(symbol)
            .map_or(DEFAULT_QUOTE, Self::quote_of))
    }

    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        let position = self.position(symbol);
        Ok((position > Decimal::ZERO).then_some(position))
    }

    async fn get_max_filled_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        Ok(self
            .accounts
            .lock()
            .get(symbol)
            .and_then(|account| account.fill_prices.iter().copied().max()))
    }

    async fn list_open_orders(&self, symbol: &Symbol) -> Result<Vec<Decimal>, BrokerError> {
        Ok(self.resting_orders(symbol))
    }

    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderAck, BrokerError> {
        if request.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected {
                reason: format!("quantity must be positive, got {}", request.quantity),
            });
        }

        let broker_order_id = Uuid::new_v4().to_string();
        let mut accounts = self.accounts.lock();
        let account = accounts.entry(request.symbol.clone()).or_default();
        let quote = Self::quote_of(account);

        let fill_price = match (request.order_type, request.limit_price) {
            (OrderType::Market, _) => Some(quote),
            (OrderType::Limit, Some(limit)) if limit >= quote => Some(limit),
            (OrderType::Limit, Some(limit)) => {
                account.resting.push(RestingOrder {
                    quantity: request.quantity,
                    limit_price: limit,
                });
                None
            }
            (OrderType::Limit, None) => {
                return Err(BrokerError::OrderRejected {
                    reason: "limit order without limit price".to_string(),
                });
            }
        };

        if let Some(price) = fill_price {
            account.fill(request.quantity, price);
        }
        tracing::debug!(
            symbol = %request.symbol,
            broker_order_id = %broker_order_id,
            filled = fill_price.is_some(),
            "Paper order accepted"
        );

        Ok(OrderAck {
            broker_order_id,
            client_order_id: request.client_order_id,
            status: if fill_price.is_some() { "filled" } else { "new" }.to_string(),
            filled_qty: if fill_price.is_some() {
                request.quantity
            } else {
                Decimal::ZERO
            },
            avg_fill_price: fill_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> Symbol {
        Symbol::new("AAPL")
    }

    #[tokio::test]
    async fn default_quote_is_one_hundred() {
        let broker = PaperBroker::new();
        assert_eq!(broker.get_current_price(&aapl()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn market_buy_fills_at_quote() {
        let broker = PaperBroker::new();
        broker.set_quote(&aapl(), dec!(42.5));

        let ack = broker.submit_market_buy(&aapl(), dec!(2)).await.unwrap();

        assert_eq!(ack.status, "filled");
        assert_eq!(ack.avg_fill_price, Some(dec!(42.5)));
        assert_eq!(broker.get_position(&aapl()).await.unwrap(), Some(dec!(2)));
        assert_eq!(
            broker.get_max_filled_price(&aapl()).await.unwrap(),
            Some(dec!(42.5))
        );
    }

    #[tokio::test]
    async fn limit_below_quote_rests_until_crossed() {
        let broker = PaperBroker::new();

        let ack = broker
            .submit_limit_buy(&aapl(), dec!(1), dec!(95), 1)
            .await
            .unwrap();

        assert_eq!(ack.status, "new");
        assert_eq!(broker.list_open_orders(&aapl()).await.unwrap(), vec![dec!(95)]);
        assert_eq!(broker.get_position(&aapl()).await.unwrap(), None);

        broker.set_quote(&aapl(), dec!(94));

        assert!(broker.list_open_orders(&aapl()).await.unwrap().is_empty());
        assert_eq!(broker.position(&aapl()), dec!(1));
        assert_eq!(
            broker.get_max_filled_price(&aapl()).await.unwrap(),
            Some(dec!(95))
        );
    }

    #[tokio::test]
    async fn no_fills_means_no_filled_price() {
        let broker = PaperBroker::new();
        assert_eq!(broker.get_max_filled_price(&aapl()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_non_positive_quantity() {
        let broker = PaperBroker::new();
        let err = broker
            .submit_market_buy(&aapl(), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::OrderRejected { .. }));
    }
}
