// Paper exchange
// In-memory futures venue that rests limit and stop orders against a mark price

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rand::{thread_rng, Rng};
use tokio::time::Instant;
use tracing::debug;

use crate::clients::{GatewayResult, OrderGateway};
use crate::core::types::{OrderId, OrderRecord, OrderRequest, OrderSide, OrderStatus, OrderType};
use crate::error::GatewayError;

/// Binance codes reused so paper failures read like real ones
const UNKNOWN_ORDER: i64 = -2011;
const QUANTITY_NOT_POSITIVE: i64 = -4003;
const MANDATORY_PARAM_MISSING: i64 = -1102;
const NO_REFERENCE_PRICE: i64 = -1;
const WOULD_TRIGGER: i64 = -2021;

#[derive(Debug, Clone)]
pub struct PaperExchangeConfig {
    /// Starting mark price; `None` means limit orders only rest and market orders fail
    pub mark_price: Option<f64>,
    /// Market-order slippage against the mark, in basis points
    pub slippage_bps: f64,
    /// Random-walk step per open-order poll, as a fraction of price
    pub volatility: f64,
}

impl Default for PaperExchangeConfig {
    fn default() -> Self {
        Self {
            mark_price: None,
            slippage_bps: 0.0,
            volatility: 0.0,
        }
    }
}

impl From<&crate::config::PaperConfig> for PaperExchangeConfig {
    fn from(config: &crate::config::PaperConfig) -> Self {
        Self {
            mark_price: Some(config.mark_price),
            slippage_bps: config.slippage_bps,
            volatility: config.volatility,
        }
    }
}

/// Every create call the exchange saw, accepted or not
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: OrderRequest,
    pub at: Instant,
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct PaperBook {
    next_id: u64,
    mark_price: Option<f64>,
    resting: BTreeMap<OrderId, OrderRecord>,
    closed: HashMap<OrderId, OrderRecord>,
    submissions: Vec<Submission>,
    cancelled_ids: Vec<OrderId>,
    create_failures: VecDeque<GatewayError>,
    open_orders_failures: VecDeque<GatewayError>,
    cancel_failures: VecDeque<GatewayError>,
    rejected_prices: Vec<(f64, GatewayError)>,
    reject_all: Option<GatewayError>,
    scripted_market_fills: VecDeque<(f64, f64)>,
    /// Stop-limit orders whose trigger fired; they now behave as plain limits
    triggered_stops: HashSet<OrderId>,
}

impl PaperBook {
    fn next_order_id(&mut self) -> OrderId {
        self.next_id += 1;
        OrderId(self.next_id)
    }

    /// Fire triggers and fill every resting order the mark has crossed
    fn sweep(&mut self) {
        let Some(mark) = self.mark_price else { return };
        let mut fills = Vec::new();
        let mut armed = Vec::new();

        for order in self.resting.values() {
            match order.order_type {
                OrderType::Limit => {
                    if crosses(order.side, order.price, mark) {
                        fills.push((order.order_id, order.price));
                    }
                }
                OrderType::Stop => {
                    let live = self.triggered_stops.contains(&order.order_id)
                        || triggers(order.order_type, order.side, order.stop_price, mark);
                    if live {
                        armed.push(order.order_id);
                        if crosses(order.side, order.price, mark) {
                            fills.push((order.order_id, order.price));
                        }
                    }
                }
                OrderType::StopMarket | OrderType::TakeProfitMarket => {
                    if triggers(order.order_type, order.side, order.stop_price, mark) {
                        fills.push((order.order_id, mark));
                    }
                }
                OrderType::Market => {}
            }
        }

        self.triggered_stops.extend(armed);
        for (id, price) in fills {
            self.triggered_stops.remove(&id);
            if let Some(order) = self.resting.remove(&id) {
                debug!(order_id = %id, order_type = %order.order_type, price, mark, "paper fill");
                self.closed.insert(id, filled_at(order, price));
            }
        }
    }

    fn check_injected_failure(&mut self, request: &OrderRequest) -> GatewayResult<()> {
        if let Some(err) = &self.reject_all {
            return Err(err.clone());
        }
        if let Some(err) = self.create_failures.pop_front() {
            return Err(err);
        }
        if let Some(price) = request.price {
            if let Some((_, err)) = self
                .rejected_prices
                .iter()
                .find(|(p, _)| (p - price).abs() < 1e-9)
            {
                return Err(err.clone());
            }
        }
        Ok(())
    }

    fn create(&mut self, request: &OrderRequest, slippage_bps: f64) -> GatewayResult<OrderRecord> {
        self.check_injected_failure(request)?;

        let closes_position = request.close_position == Some(true);
        if request.quantity <= 0.0 && !closes_position {
            return Err(GatewayError::api(QUANTITY_NOT_POSITIVE, "Quantity less than or equal to zero."));
        }

        match request.order_type {
            OrderType::Market => self.fill_market(request, slippage_bps),
            OrderType::Limit => self.rest_limit(request),
            OrderType::Stop | OrderType::StopMarket | OrderType::TakeProfitMarket => {
                self.rest_conditional(request)
            }
        }
    }

    fn fill_market(&mut self, request: &OrderRequest, slippage_bps: f64) -> GatewayResult<OrderRecord> {
        let (executed_qty, avg_price) = match self.scripted_market_fills.pop_front() {
            Some(fill) => fill,
            None => {
                let mark = self.mark_price.ok_or_else(|| {
                    GatewayError::api(NO_REFERENCE_PRICE, "paper exchange has no mark price")
                })?;
                let slip = slippage_bps / 10_000.0;
                let price = match request.side {
                    OrderSide::Buy => mark * (1.0 + slip),
                    OrderSide::Sell => mark * (1.0 - slip),
                };
                (request.quantity, price)
            }
        };

        let order_id = self.next_order_id();
        let record = OrderRecord {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            status: OrderStatus::Filled,
            side: request.side,
            order_type: request.order_type,
            price: 0.0,
            stop_price: 0.0,
            orig_qty: request.quantity,
            executed_qty,
            avg_price,
        };
        self.closed.insert(order_id, record.clone());
        Ok(record)
    }

    fn rest_limit(&mut self, request: &OrderRequest) -> GatewayResult<OrderRecord> {
        let price = request.price.ok_or_else(|| {
            GatewayError::api(MANDATORY_PARAM_MISSING, "Mandatory parameter 'price' was not sent.")
        })?;

        let order_id = self.next_order_id();
        let record = OrderRecord {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            status: OrderStatus::New,
            side: request.side,
            order_type: request.order_type,
            price,
            stop_price: request.stop_price.unwrap_or(0.0),
            orig_qty: request.quantity,
            executed_qty: 0.0,
            avg_price: 0.0,
        };

        // A limit that already crosses the mark executes immediately
        let crossing = self.mark_price.map(|mark| crosses(request.side, price, mark)).unwrap_or(false);
        if crossing {
            let record = filled(record);
            self.closed.insert(order_id, record.clone());
            Ok(record)
        } else {
            self.resting.insert(order_id, record.clone());
            Ok(record)
        }
    }

    fn rest_conditional(&mut self, request: &OrderRequest) -> GatewayResult<OrderRecord> {
        let stop_price = request.stop_price.ok_or_else(|| {
            GatewayError::api(MANDATORY_PARAM_MISSING, "Mandatory parameter 'stopPrice' was not sent.")
        })?;
        let price = match (request.order_type, request.price) {
            (OrderType::Stop, None) => {
                return Err(GatewayError::api(
                    MANDATORY_PARAM_MISSING,
                    "Mandatory parameter 'price' was not sent.",
                ))
            }
            (_, price) => price.unwrap_or(0.0),
        };

        if let Some(mark) = self.mark_price {
            if triggers(request.order_type, request.side, stop_price, mark) {
                return Err(GatewayError::api(WOULD_TRIGGER, "Order would immediately trigger."));
            }
        }

        let order_id = self.next_order_id();
        let record = OrderRecord {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            status: OrderStatus::New,
            side: request.side,
            order_type: request.order_type,
            price,
            stop_price,
            orig_qty: request.quantity,
            executed_qty: 0.0,
            avg_price: 0.0,
        };
        self.resting.insert(order_id, record.clone());
        Ok(record)
    }

    fn random_walk(&mut self, volatility: f64) {
        if volatility <= 0.0 {
            return;
        }
        if let Some(mark) = self.mark_price {
            let step = thread_rng().gen_range(-volatility..volatility);
            self.mark_price = Some(mark * (1.0 + step));
            self.sweep();
        }
    }
}

fn crosses(side: OrderSide, price: f64, mark: f64) -> bool {
    match side {
        OrderSide::Buy => mark <= price,
        OrderSide::Sell => mark >= price,
    }
}

/// Whether `mark` has reached a conditional order's stop price
fn triggers(order_type: OrderType, side: OrderSide, stop_price: f64, mark: f64) -> bool {
    match (order_type, side) {
        (OrderType::Stop | OrderType::StopMarket, OrderSide::Buy) => mark >= stop_price,
        (OrderType::Stop | OrderType::StopMarket, OrderSide::Sell) => mark <= stop_price,
        (OrderType::TakeProfitMarket, OrderSide::Buy) => mark <= stop_price,
        (OrderType::TakeProfitMarket, OrderSide::Sell) => mark >= stop_price,
        _ => false,
    }
}

fn filled(order: OrderRecord) -> OrderRecord {
    let price = if order.price > 0.0 { order.price } else { order.stop_price };
    filled_at(order, price)
}

fn filled_at(mut order: OrderRecord, price: f64) -> OrderRecord {
    order.status = OrderStatus::Filled;
    order.executed_qty = order.orig_qty;
    order.avg_price = price;
    order
}

/// Simulated exchange implementing `OrderGateway`.
///
/// Besides the gateway calls it exposes hooks to move the market and to
/// inject failures, which is what the engine tests drive it with.
#[derive(Debug, Default)]
pub struct PaperExchange {
    config: PaperExchangeConfig,
    book: Mutex<PaperBook>,
}

impl PaperExchange {
    pub fn new(config: PaperExchangeConfig) -> Self {
        let book = PaperBook {
            mark_price: config.mark_price,
            ..PaperBook::default()
        };
        Self {
            config,
            book: Mutex::new(book),
        }
    }

    /// Exchange without a mark price: limits rest until filled by hand
    pub fn idle() -> Self {
        Self::new(PaperExchangeConfig::default())
    }

    fn book(&self) -> MutexGuard<'_, PaperBook> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mark_price(&self) -> Option<f64> {
        self.book().mark_price
    }

    /// Move the market; resting orders crossed by the new mark fill at their price
    pub fn set_mark_price(&self, price: f64) {
        let mut book = self.book();
        book.mark_price = Some(price);
        book.sweep();
    }

    /// Fill one resting order at its limit price (stop price for stop-market orders)
    pub fn fill_order(&self, order_id: OrderId) -> bool {
        let mut book = self.book();
        book.triggered_stops.remove(&order_id);
        match book.resting.remove(&order_id) {
            Some(order) => {
                book.closed.insert(order_id, filled(order));
                true
            }
            None => false,
        }
    }

    /// Cancel an order behind the engine's back, as another client would
    pub fn cancel_externally(&self, order_id: OrderId) -> bool {
        let mut book = self.book();
        book.triggered_stops.remove(&order_id);
        match book.resting.remove(&order_id) {
            Some(mut order) => {
                order.status = OrderStatus::Canceled;
                book.closed.insert(order_id, order);
                true
            }
            None => false,
        }
    }

    /// Fail the next create call
    pub fn queue_create_failure(&self, err: GatewayError) {
        self.book().create_failures.push_back(err);
    }

    /// Reject every limit order at this price
    pub fn reject_price(&self, price: f64, err: GatewayError) {
        self.book().rejected_prices.push((price, err));
    }

    /// Reject every create call until cleared with `None`
    pub fn reject_all_creates(&self, err: Option<GatewayError>) {
        self.book().reject_all = err;
    }

    pub fn queue_open_orders_failure(&self, err: GatewayError) {
        self.book().open_orders_failures.push_back(err);
    }

    pub fn queue_cancel_failure(&self, err: GatewayError) {
        self.book().cancel_failures.push_back(err);
    }

    /// Next market order executes exactly this (quantity, average price)
    pub fn script_market_fill(&self, executed_qty: f64, avg_price: f64) {
        self.book().scripted_market_fills.push_back((executed_qty, avg_price));
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.book().submissions.clone()
    }

    pub fn resting_orders(&self) -> Vec<OrderRecord> {
        self.book().resting.values().cloned().collect()
    }

    pub fn order(&self, order_id: OrderId) -> Option<OrderRecord> {
        let book = self.book();
        book.resting.get(&order_id).or_else(|| book.closed.get(&order_id)).cloned()
    }

    /// Orders cancelled through the gateway, in call order
    pub fn cancelled_ids(&self) -> Vec<OrderId> {
        self.book().cancelled_ids.clone()
    }
}

#[async_trait]
impl OrderGateway for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<OrderRecord> {
        let mut book = self.book();
        let result = book.create(request, self.config.slippage_bps);
        book.submissions.push(Submission {
            request: request.clone(),
            at: Instant::now(),
            accepted: result.is_ok(),
        });
        result
    }

    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderRecord>> {
        let mut book = self.book();
        if let Some(err) = book.open_orders_failures.pop_front() {
            return Err(err);
        }
        book.random_walk(self.config.volatility);
        Ok(book
            .resting
            .values()
            .filter(|o| o.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .collect())
    }

    async fn cancel_order(&self, _symbol: &str, order_id: OrderId) -> GatewayResult<OrderRecord> {
        let mut book = self.book();
        if let Some(err) = book.cancel_failures.pop_front() {
            return Err(err);
        }
        book.triggered_stops.remove(&order_id);
        match book.resting.remove(&order_id) {
            Some(mut order) => {
                order.status = OrderStatus::Canceled;
                book.closed.insert(order_id, order.clone());
                book.cancelled_ids.push(order_id);
                Ok(order)
            }
            None => Err(GatewayError::api(UNKNOWN_ORDER, "Unknown order sent.")),
        }
    }
}
