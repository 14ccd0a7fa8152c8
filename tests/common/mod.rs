// Common test utilities and helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_exec_bot::clients::{OrderGateway, PaperExchange, PaperExchangeConfig};
use futures_exec_bot::config::Config;
use futures_exec_bot::core::{GridEngine, GridParams, GridSettings, OrderSide, TwapEngine, TwapParams};

/// Grid from the worked example: 40000..50000 in 5 steps of 2000
pub fn btc_grid_params() -> GridParams {
    GridParams {
        symbol: "BTCUSDT".to_string(),
        quantity_per_level: 0.001,
        lower_bound: 40_000.0,
        upper_bound: 50_000.0,
        num_grids: 5,
    }
}

pub fn twap_params(total: f64, chunks: u32, interval_secs: u64) -> TwapParams {
    TwapParams {
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Buy,
        total_quantity: total,
        num_chunks: chunks,
        interval_secs,
    }
}

pub fn fast_settings(max_cycles: Option<u64>) -> GridSettings {
    GridSettings {
        monitor_interval: Duration::from_secs(60),
        tick_size: 0.01,
        max_cycles,
    }
}

/// Paper exchange with no mark price, so limits rest until filled by hand
pub fn idle_exchange() -> Arc<PaperExchange> {
    Arc::new(PaperExchange::idle())
}

/// Paper exchange that fills market orders at `mark` with no slippage
pub fn exchange_at(mark: f64) -> Arc<PaperExchange> {
    Arc::new(PaperExchange::new(PaperExchangeConfig {
        mark_price: Some(mark),
        slippage_bps: 0.0,
        volatility: 0.0,
    }))
}

pub fn grid_engine(exchange: &Arc<PaperExchange>, settings: GridSettings) -> GridEngine {
    let gateway: Arc<dyn OrderGateway> = exchange.clone();
    GridEngine::new(gateway, settings)
}

pub fn twap_engine(exchange: &Arc<PaperExchange>) -> TwapEngine {
    let gateway: Arc<dyn OrderGateway> = exchange.clone();
    TwapEngine::new(gateway)
}

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.grid.monitor_interval_secs = 1;
    config.grid.max_cycles = Some(3);
    config.paper.mark_price = 45_000.0;
    config
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
