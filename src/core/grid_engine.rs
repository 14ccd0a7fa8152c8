//! Grid maintenance engine
//!
//! Lays a ladder of resting limit orders between two bounds, then polls the
//! gateway and replaces every order that left the book with its mirror: a
//! filled BUY becomes a SELL one step higher, a filled SELL a BUY one step
//! lower, on the same grid level. Mirrors that would land outside the bounds
//! are not placed and their level stays empty for the rest of the session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::OrderGateway;
use crate::config::GridConfig;
use crate::core::order_tracker::{OrderTracker, TrackedOrder};
use crate::core::shutdown::GracefulShutdown;
use crate::core::summary::{GridSessionStats, GridSummary};
use crate::core::types::{OrderId, OrderRequest, OrderSide};
use crate::error::{GatewayError, TradingResult};
use crate::invalid_param;
use crate::validation::{validate_positive_count, validate_price, validate_quantity, validate_symbol};

/// Round a price to the nearest multiple of `tick_size`.
///
/// The result is also snapped to the tick's decimal places so that
/// 0.01 ticks give the same values as rounding to two decimals.
pub fn round_to_tick(price: f64, tick_size: f64) -> f64 {
    snap_to_tick(price, tick_size, f64::round)
}

/// Largest tick multiple not above `price`
fn floor_to_tick(price: f64, tick_size: f64) -> f64 {
    snap_to_tick(price, tick_size, |ticks| (ticks + 1e-9).floor())
}

/// Smallest tick multiple not below `price`
fn ceil_to_tick(price: f64, tick_size: f64) -> f64 {
    snap_to_tick(price, tick_size, |ticks| (ticks - 1e-9).ceil())
}

fn snap_to_tick(price: f64, tick_size: f64, to_whole: fn(f64) -> f64) -> f64 {
    let ticks = to_whole(price / tick_size);
    let factor = 10f64.powi(tick_decimals(tick_size) as i32);
    (ticks * tick_size * factor).round() / factor
}

fn tick_decimals(tick_size: f64) -> u32 {
    let mut decimals = 0;
    let mut scaled = tick_size;
    while decimals < 12 && (scaled - scaled.round()).abs() > 1e-9 {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

/// Caller-supplied ladder definition
#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    pub symbol: String,
    pub quantity_per_level: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub num_grids: u32,
}

impl GridParams {
    pub fn validate(&self) -> TradingResult<()> {
        validate_symbol(&self.symbol)?;
        validate_quantity("quantity_per_level", self.quantity_per_level)?;
        validate_price("lower_bound", self.lower_bound)?;
        validate_price("upper_bound", self.upper_bound)?;
        if self.upper_bound <= self.lower_bound {
            return Err(invalid_param!(
                "upper_bound",
                "upper_bound ({}) must be greater than lower_bound ({})",
                self.upper_bound,
                self.lower_bound
            ));
        }
        validate_positive_count("num_grids", self.num_grids as u64)?;
        Ok(())
    }

    pub fn step(&self) -> f64 {
        (self.upper_bound - self.lower_bound) / self.num_grids as f64
    }
}

/// How the engine paces and prices a session
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub monitor_interval: Duration,
    pub tick_size: f64,
    /// Stop after this many monitoring cycles; `None` runs until shutdown
    pub max_cycles: Option<u64>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_secs(60),
            tick_size: 0.01,
            max_cycles: None,
        }
    }
}

impl From<&GridConfig> for GridSettings {
    fn from(config: &GridConfig) -> Self {
        Self {
            monitor_interval: config.monitor_interval(),
            tick_size: config.tick_size,
            max_cycles: config.max_cycles,
        }
    }
}

impl GridSettings {
    pub fn validate(&self) -> TradingResult<()> {
        if self.monitor_interval.is_zero() {
            return Err(invalid_param!("monitor_interval", "must be greater than zero"));
        }
        if !self.tick_size.is_finite() || self.tick_size <= 0.0 {
            return Err(invalid_param!("tick_size", "must be positive, got {}", self.tick_size));
        }
        if self.max_cycles == Some(0) {
            return Err(invalid_param!("max_cycles", "must be positive when set"));
        }
        Ok(())
    }
}

/// Live state of one grid session
#[derive(Debug, Clone)]
pub struct GridState {
    pub session_id: String,
    pub symbol: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub step: f64,
    pub quantity_per_level: f64,
    pub num_grids: u32,
    pub orders: OrderTracker,
    pub stats: GridSessionStats,
    pub started_at: DateTime<Utc>,
    submissions: u64,
}

impl GridState {
    fn new(params: &GridParams) -> Self {
        Self {
            session_id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            symbol: params.symbol.to_uppercase(),
            lower_bound: params.lower_bound,
            upper_bound: params.upper_bound,
            step: params.step(),
            quantity_per_level: params.quantity_per_level,
            num_grids: params.num_grids,
            orders: OrderTracker::new(),
            stats: GridSessionStats::default(),
            started_at: Utc::now(),
            submissions: 0,
        }
    }

    /// Inside `[lower_bound, upper_bound]`, allowing for float noise
    pub fn contains_price(&self, price: f64) -> bool {
        let tolerance = 1e-9 * self.upper_bound.abs().max(1.0);
        price >= self.lower_bound - tolerance && price <= self.upper_bound + tolerance
    }

    /// Nearest tick to `raw`, pulled inward when rounding crosses a bound
    pub fn ladder_price(&self, raw: f64, tick_size: f64) -> f64 {
        let price = round_to_tick(raw, tick_size);
        if self.contains_price(price) {
            price
        } else if price > self.upper_bound {
            floor_to_tick(self.upper_bound, tick_size)
        } else {
            ceil_to_tick(self.lower_bound, tick_size)
        }
    }

    /// Opposite-side order one step away, on the same level
    pub fn mirror_of(&self, order: &TrackedOrder, tick_size: f64) -> MirrorOrder {
        let raw = match order.side {
            OrderSide::Buy => order.price + self.step,
            OrderSide::Sell => order.price - self.step,
        };
        MirrorOrder {
            side: order.side.opposite(),
            price: round_to_tick(raw, tick_size),
            grid_level: order.grid_level,
            quantity: order.quantity,
        }
    }

    pub fn summary(&self) -> GridSummary {
        GridSummary::from_stats(&self.symbol, &self.stats, self.started_at, Utc::now())
    }

    fn next_client_order_id(&mut self, grid_level: usize) -> String {
        self.submissions += 1;
        format!("grid-{}-{}-{}", self.session_id, grid_level, self.submissions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorOrder {
    pub side: OrderSide,
    pub price: f64,
    pub grid_level: usize,
    pub quantity: f64,
}

/// What one monitoring cycle observed and did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub open_orders_error: Option<GatewayError>,
    pub fills: Vec<TrackedOrder>,
    pub replacements: Vec<TrackedOrder>,
    pub vacated_levels: Vec<usize>,
    pub failed_replacements: Vec<(usize, GatewayError)>,
    pub active_buys: usize,
    pub active_sells: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub cancelled: Vec<OrderId>,
    pub failed: Vec<(OrderId, GatewayError)>,
}

pub struct GridEngine {
    gateway: Arc<dyn OrderGateway>,
    settings: GridSettings,
}

impl GridEngine {
    pub fn new(gateway: Arc<dyn OrderGateway>, settings: GridSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// Validate parameters and place the initial ladder.
    ///
    /// Individual placement failures are logged and counted; the call only
    /// fails if the parameters are invalid or no order at all was accepted.
    pub async fn initialize_grid(&self, params: GridParams) -> TradingResult<GridState> {
        params.validate()?;
        self.settings.validate()?;

        let mut state = GridState::new(&params);
        let n = params.num_grids;
        let tick_size = self.settings.tick_size;

        if !state.contains_price(ceil_to_tick(state.lower_bound, tick_size)) {
            return Err(invalid_param!(
                "tick_size",
                "no multiple of {} lies between {} and {}",
                tick_size,
                state.lower_bound,
                state.upper_bound
            ));
        }

        info!("════════════════════════════════════════");
        info!("🎯 GRID TRADING STRATEGY STARTED ({} via {})", state.symbol, self.gateway.name());
        info!("════════════════════════════════════════");
        info!("  Quantity/Grid:    {}", state.quantity_per_level);
        info!("  Lower Bound:      {}", state.lower_bound);
        info!("  Upper Bound:      {}", state.upper_bound);
        info!("  Number of Grids:  {}", n);
        info!("  Grid Step:        {}", state.step);
        info!("  Monitor Interval: {:?}", self.settings.monitor_interval);

        info!("📉 Placing {} BUY limit orders", n);
        let mut accepted = 0;
        for i in 0..n {
            let price = state.ladder_price(state.lower_bound + i as f64 * state.step, tick_size);
            let quantity = state.quantity_per_level;
            if self
                .place_grid_order(&mut state, OrderSide::Buy, price, i as usize, quantity)
                .await
                .is_ok()
            {
                accepted += 1;
            }
        }
        debug!("{} of {} BUY orders accepted", accepted, n);

        info!("📈 Placing {} SELL limit orders", n);
        let mut accepted = 0;
        for i in 0..n {
            let price = state.ladder_price(state.upper_bound - i as f64 * state.step, tick_size);
            let quantity = state.quantity_per_level;
            if self
                .place_grid_order(&mut state, OrderSide::Sell, price, (n + i) as usize, quantity)
                .await
                .is_ok()
            {
                accepted += 1;
            }
        }
        debug!("{} of {} SELL orders accepted", accepted, n);

        info!(
            buys = state.stats.buy_orders_placed,
            sells = state.stats.sell_orders_placed,
            failures = state.stats.placement_failures,
            "Initial grid setup complete"
        );

        if state.orders.is_empty() {
            error!("❌ No grid orders were placed successfully");
            return Err(crate::error::TradingError::NoOrdersPlaced(state.symbol));
        }

        Ok(state)
    }

    async fn place_grid_order(
        &self,
        state: &mut GridState,
        side: OrderSide,
        price: f64,
        grid_level: usize,
        quantity: f64,
    ) -> Result<TrackedOrder, GatewayError> {
        let request = OrderRequest::limit(&state.symbol, side, quantity, price)
            .with_client_order_id(state.next_client_order_id(grid_level));

        match self.gateway.create_order(&request).await {
            Ok(record) => {
                let tracked = TrackedOrder {
                    order_id: record.order_id,
                    side,
                    price,
                    grid_level,
                    quantity,
                };
                info!(grid_level, order_id = %record.order_id, "✓ {} {} @ {}", side, quantity, price);
                state.orders.insert(tracked.clone());
                state.stats.record_placed(side);
                Ok(tracked)
            }
            Err(e) => {
                error!(grid_level, "✗ Failed to place {} order at {}: {}", side, price, e);
                state.stats.placement_failures += 1;
                Err(e)
            }
        }
    }

    /// One reconciliation pass: detect orders that left the book and mirror them
    pub async fn monitor_cycle(&self, state: &mut GridState) -> CycleReport {
        state.stats.cycles += 1;
        let mut report = CycleReport {
            cycle: state.stats.cycles,
            ..CycleReport::default()
        };
        info!(cycle = report.cycle, "--- Monitoring Cycle {} ---", report.cycle);

        let open_orders = match self.gateway.get_open_orders(&state.symbol).await {
            Ok(orders) => orders,
            Err(e) => {
                // Without a reliable open set nothing can be inferred this cycle
                error!(cycle = report.cycle, "API error in monitoring cycle: {}", e);
                report.open_orders_error = Some(e);
                report.active_buys = state.orders.count_by_side(OrderSide::Buy);
                report.active_sells = state.orders.count_by_side(OrderSide::Sell);
                return report;
            }
        };

        let open_ids: HashSet<OrderId> = open_orders.iter().map(|o| o.order_id).collect();
        debug!(count = open_ids.len(), "Found open orders for {}", state.symbol);

        let gone = state.orders.missing_from(&open_ids);
        if gone.is_empty() {
            info!("   No filled orders detected. Grid stable.");
        } else {
            info!("🎯 Detected {} filled order(s)", gone.len());
        }

        for order_id in gone {
            let Some(order) = state.orders.remove(order_id) else { continue };
            state.stats.record_fill(order.side);
            info!(
                order_id = %order.order_id,
                grid_level = order.grid_level,
                "Order filled: {} {} @ {}",
                order.side,
                order.quantity,
                order.price
            );

            let mirror = state.mirror_of(&order, self.settings.tick_size);
            report.fills.push(order);

            if !state.contains_price(mirror.price) {
                warn!(
                    grid_level = mirror.grid_level,
                    "⚠️  New price {} outside grid bounds [{}, {}]. Skipping replacement.",
                    mirror.price,
                    state.lower_bound,
                    state.upper_bound
                );
                state.stats.vacated_levels += 1;
                report.vacated_levels.push(mirror.grid_level);
                continue;
            }

            info!("   → Placing {} order at {}", mirror.side, mirror.price);
            match self
                .place_grid_order(state, mirror.side, mirror.price, mirror.grid_level, mirror.quantity)
                .await
            {
                Ok(tracked) => report.replacements.push(tracked),
                Err(e) => report.failed_replacements.push((mirror.grid_level, e)),
            }
        }

        report.active_buys = state.orders.count_by_side(OrderSide::Buy);
        report.active_sells = state.orders.count_by_side(OrderSide::Sell);
        info!(
            "   Active orders: {} (BUY: {}, SELL: {})",
            state.orders.len(),
            report.active_buys,
            report.active_sells
        );
        report
    }

    /// Cancel everything still tracked. Safe to call more than once.
    pub async fn shutdown(&self, state: &mut GridState) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let remaining = state.orders.drain();
        if remaining.is_empty() {
            debug!("No grid orders left to cancel");
            return report;
        }

        info!("Cancelling {} remaining grid order(s)...", remaining.len());
        for order in remaining {
            match self.gateway.cancel_order(&state.symbol, order.order_id).await {
                Ok(_) => {
                    info!(order_id = %order.order_id, "   ✓ Cancelled order");
                    state.stats.orders_cancelled_at_shutdown += 1;
                    report.cancelled.push(order.order_id);
                }
                Err(e) => {
                    error!(order_id = %order.order_id, "   ✗ Failed to cancel order: {}", e);
                    state.stats.cancel_failures += 1;
                    report.failed.push((order.order_id, e));
                }
            }
        }
        report
    }

    /// Full session: place the ladder, monitor until shutdown or `max_cycles`,
    /// cancel what is left and report.
    pub async fn run(&self, params: GridParams, shutdown: &GracefulShutdown) -> TradingResult<GridSummary> {
        self.run_with_observer(params, shutdown, |_| {}).await
    }

    pub async fn run_with_observer<F>(
        &self,
        params: GridParams,
        shutdown: &GracefulShutdown,
        mut on_cycle: F,
    ) -> TradingResult<GridSummary>
    where
        F: FnMut(&CycleReport),
    {
        let mut state = self.initialize_grid(params).await?;

        info!("🔄 Starting grid monitoring loop");
        loop {
            if shutdown.is_shutting_down() {
                info!("Stop signal observed, leaving monitoring loop");
                break;
            }

            let report = self.monitor_cycle(&mut state).await;
            on_cycle(&report);

            if let Some(max) = self.settings.max_cycles {
                if state.stats.cycles >= max {
                    info!("Reached {} monitoring cycles", max);
                    break;
                }
            }

            debug!("Sleeping for {:?}", self.settings.monitor_interval);
            if shutdown.sleep(self.settings.monitor_interval).await {
                info!("Stop signal observed, leaving monitoring loop");
                break;
            }
        }

        info!("GRID TRADING STOPPED");
        self.shutdown(&mut state).await;

        let summary = state.summary();
        summary.log_report();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GridParams {
        GridParams {
            symbol: "BTCUSDT".to_string(),
            quantity_per_level: 0.001,
            lower_bound: 40_000.0,
            upper_bound: 50_000.0,
            num_grids: 5,
        }
    }

    #[test]
    fn test_round_to_tick() {
        assert_eq!(round_to_tick(43_333.333_3, 0.01), 43_333.33);
        assert_eq!(round_to_tick(106.666, 1.0), 107.0);
        assert_eq!(round_to_tick(0.123_456, 0.0001), 0.1235);
        assert_eq!(round_to_tick(42_000.0, 0.5), 42_000.0);
        assert_eq!(round_to_tick(101.3, 5.0), 100.0);
    }

    #[test]
    fn test_directed_tick_snapping() {
        assert_eq!(floor_to_tick(101.5, 1.0), 101.0);
        assert_eq!(ceil_to_tick(101.2, 5.0), 105.0);
        assert_eq!(floor_to_tick(0.3, 0.1), 0.3);
        assert_eq!(ceil_to_tick(0.3, 0.1), 0.3);
    }

    #[test]
    fn test_ladder_price_stays_inside_bounds() {
        let mut p = params();
        p.lower_bound = 100.0;
        p.upper_bound = 101.5;
        p.num_grids = 1;
        let state = GridState::new(&p);

        assert_eq!(state.ladder_price(101.5, 1.0), 101.0);
        assert_eq!(state.ladder_price(100.0, 1.0), 100.0);

        p.lower_bound = 100.4;
        let state = GridState::new(&p);
        assert_eq!(state.ladder_price(100.4, 1.0), 101.0);
        assert_eq!(state.ladder_price(100.7, 0.01), 100.7);
    }

    #[test]
    fn test_step() {
        assert_eq!(params().step(), 2_000.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.upper_bound = p.lower_bound;
        assert!(p.validate().is_err());

        let mut p = params();
        p.num_grids = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.quantity_per_level = 0.0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.symbol = "btc".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_settings_validation() {
        assert!(GridSettings::default().validate().is_ok());
        let settings = GridSettings {
            monitor_interval: Duration::ZERO,
            ..GridSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = GridSettings {
            tick_size: 0.0,
            ..GridSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_mirror_of_buy_and_sell() {
        let state = GridState::new(&params());
        let buy = TrackedOrder {
            order_id: OrderId(1),
            side: OrderSide::Buy,
            price: 44_000.0,
            grid_level: 2,
            quantity: 0.001,
        };
        let mirror = state.mirror_of(&buy, 0.01);
        assert_eq!(mirror.side, OrderSide::Sell);
        assert_eq!(mirror.price, 46_000.0);
        assert_eq!(mirror.grid_level, 2);

        let sell = TrackedOrder {
            side: OrderSide::Sell,
            price: 42_000.0,
            grid_level: 9,
            ..buy
        };
        let mirror = state.mirror_of(&sell, 0.01);
        assert_eq!(mirror.side, OrderSide::Buy);
        assert_eq!(mirror.price, 40_000.0);
        assert!(state.contains_price(mirror.price));
        assert!(!state.contains_price(52_000.0));
        assert!(!state.contains_price(39_999.99));
    }
}
