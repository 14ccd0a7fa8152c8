//! One-shot order placement
//!
//! Validates the inputs, submits a single order and hands back whatever the
//! gateway reported. Nothing is tracked afterwards.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::OrderGateway;
use crate::core::types::{OrderRecord, OrderRequest, OrderSide};
use crate::error::TradingResult;
use crate::validation::{validate_price, validate_quantity, validate_symbol};

/// Limit more than this fraction away from the stop on the unfavourable side
const WIDE_STOP_LIMIT_RATIO: f64 = 0.1;

/// Warning text when a stop-limit's limit price sits far past its trigger
pub fn stop_limit_spread_warning(side: OrderSide, price: f64, stop_price: f64) -> Option<String> {
    match side {
        OrderSide::Buy if price > stop_price * (1.0 + WIDE_STOP_LIMIT_RATIO) => Some(format!(
            "BUY limit {} is more than 10% above stop {}",
            price, stop_price
        )),
        OrderSide::Sell if price < stop_price * (1.0 - WIDE_STOP_LIMIT_RATIO) => Some(format!(
            "SELL limit {} is more than 10% below stop {}",
            price, stop_price
        )),
        _ => None,
    }
}

pub struct OrderPlacer {
    gateway: Arc<dyn OrderGateway>,
}

impl OrderPlacer {
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self { gateway }
    }

    pub async fn place_market(&self, symbol: &str, side: OrderSide, quantity: f64) -> TradingResult<OrderRecord> {
        validate_symbol(symbol)?;
        validate_quantity("quantity", quantity)?;
        self.submit(OrderRequest::market(symbol, side, quantity)).await
    }

    pub async fn place_limit(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
    ) -> TradingResult<OrderRecord> {
        validate_symbol(symbol)?;
        validate_quantity("quantity", quantity)?;
        validate_price("price", price)?;
        self.submit(OrderRequest::limit(symbol, side, quantity, price)).await
    }

    pub async fn place_stop_limit(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
        stop_price: f64,
    ) -> TradingResult<OrderRecord> {
        validate_symbol(symbol)?;
        validate_quantity("quantity", quantity)?;
        validate_price("price", price)?;
        validate_price("stop_price", stop_price)?;
        if let Some(message) = stop_limit_spread_warning(side, price, stop_price) {
            warn!("⚠️  {}", message);
        }
        self.submit(OrderRequest::stop_limit(symbol, side, quantity, price, stop_price))
            .await
    }

    /// Stop-market for `quantity`, or for the whole position when `None`
    pub async fn place_stop_market(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Option<f64>,
        stop_price: f64,
    ) -> TradingResult<OrderRecord> {
        validate_symbol(symbol)?;
        validate_price("stop_price", stop_price)?;
        let request = match quantity {
            Some(quantity) => {
                validate_quantity("quantity", quantity)?;
                OrderRequest::stop_market(symbol, side, quantity, stop_price)
            }
            None => OrderRequest::close_position_stop(symbol, side, stop_price),
        };
        self.submit(request).await
    }

    pub async fn place_take_profit_market(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        stop_price: f64,
    ) -> TradingResult<OrderRecord> {
        validate_symbol(symbol)?;
        validate_quantity("quantity", quantity)?;
        validate_price("stop_price", stop_price)?;
        self.submit(OrderRequest::take_profit_market(symbol, side, quantity, stop_price))
            .await
    }

    async fn submit(&self, request: OrderRequest) -> TradingResult<OrderRecord> {
        let client_id = format!("order-{}", &Uuid::new_v4().simple().to_string()[..12]);
        let request = request.with_client_order_id(client_id);

        info!(
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            "📤 Submitting {} order via {}",
            request.order_type,
            self.gateway.name()
        );
        let record = self.gateway.create_order(&request).await?;
        info!(
            order_id = %record.order_id,
            status = ?record.status,
            "✅ Order accepted"
        );
        Ok(record)
    }
}
