//! Alpaca broker adapter implementing `BrokerGateway`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::ports::{
    BrokerError, BrokerGateway, OrderAck, OrderType, SubmitOrderRequest, TimeInForce,
};
use crate::domain::shared::Symbol;

use super::api_types::{
    AlpacaLatestTradeResponse, AlpacaOrderRequest, AlpacaOrderResponse, AlpacaPositionResponse,
    OrderListQuery,
};
use super::config::{AlpacaConfig, AlpacaEnvironment};
use super::error::AlpacaError;
use super::http_client::AlpacaHttpClient;

/// Orders fetched per history or open-order listing.
const ORDER_PAGE_LIMIT: u32 = 500;

/// Alpaca Markets broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaBrokerAdapter {
    client: AlpacaHttpClient,
    environment: AlpacaEnvironment,
}

impl AlpacaBrokerAdapter {
    /// Create a new Alpaca broker adapter.
    pub fn new(config: AlpacaConfig) -> Result<Self, AlpacaError> {
        let client = AlpacaHttpClient::new(&config)?;
        Ok(Self {
            client,
            environment: config.environment,
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    /// Convert `SubmitOrderRequest` to Alpaca API format.
    fn to_alpaca_order_request(request: &SubmitOrderRequest) -> AlpacaOrderRequest {
        let order_type = match request.order_type {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        };

        let time_in_force = match request.time_in_force {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
        };

        AlpacaOrderRequest {
            symbol: request.symbol.as_str().to_string(),
            qty: request.quantity.to_string(),
            side: "buy".to_string(),
            order_type: order_type.to_string(),
            time_in_force: time_in_force.to_string(),
            limit_price: request.limit_price.map(|p| p.to_string()),
            client_order_id: request.client_order_id.clone(),
        }
    }

    async fn list_orders(
        &self,
        symbol: &Symbol,
        status: &'static str,
    ) -> Result<Vec<AlpacaOrderResponse>, BrokerError> {
        let query = OrderListQuery {
            status,
            symbols: symbol.as_str(),
            limit: ORDER_PAGE_LIMIT,
            direction: "desc",
        };
        self.client
            .get("/v2/orders", &query)
            .await
            .map_err(BrokerError::from)
    }
}

#[async_trait]
impl BrokerGateway for AlpacaBrokerAdapter {
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Decimal, BrokerError> {
        let response: AlpacaLatestTradeResponse = self
            .client
            .data_get(&format!("/v2/stocks/{}/trades/latest", symbol.as_str()))
            .await
            .map_err(BrokerError::from)?;

        Ok(response.trade.price)
    }

    async fn get_position(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        let result: Result<AlpacaPositionResponse, AlpacaError> = self
            .client
            .get(&format!("/v2/positions/{}", symbol.as_str()), &[] as &[(&str, &str)])
            .await;

        match result {
            Ok(position) => {
                let qty: Decimal = position.qty.trim().parse().map_err(|_| BrokerError::Unknown {
                    message: format!("Failed to parse position quantity '{}'", position.qty),
                })?;
                Ok((!qty.is_zero()).then_some(qty))
            }
            Err(AlpacaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(BrokerError::from(e)),
        }
    }

    async fn get_max_filled_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, BrokerError> {
        let orders = self.list_orders(symbol, "closed").await?;
        Ok(orders
            .iter()
            .filter(|order| order.is_filled())
            .filter_map(AlpacaOrderResponse::fill_price)
            .max())
    }

    async fn list_open_orders(&self, symbol: &Symbol) -> Result<Vec<Decimal>, BrokerError> {
        let orders = self.list_orders(symbol, "open").await?;
        Ok(orders.iter().filter_map(AlpacaOrderResponse::limit).collect())
    }

    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderAck, BrokerError> {
        if self.is_live() {
            tracing::warn!(
                client_order_id = %request.client_order_id,
                symbol = %request.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        let alpaca_request = Self::to_alpaca_order_request(&request);

        tracing::info!(
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            order_type = %alpaca_request.order_type,
            qty = %alpaca_request.qty,
            limit_price = ?alpaca_request.limit_price,
            "Submitting order to Alpaca"
        );

        let response: AlpacaOrderResponse = self
            .client
            .post("/v2/orders", &alpaca_request)
            .await
            .map_err(BrokerError::from)?;

        tracing::info!(
            client_order_id = %request.client_order_id,
            broker_order_id = %response.id,
            status = %response.status,
            "Order submitted successfully"
        );

        Ok(response.to_order_ack())
    }
}
