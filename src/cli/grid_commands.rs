// Grid command implementation
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use futures_exec_bot::config::Config;
use futures_exec_bot::progress::GridSpinner;
use futures_exec_bot::{GracefulShutdown, GridEngine, GridParams, GridSettings, OrderGateway, TradingResult};

pub struct GridArgs {
    pub symbol: String,
    pub quantity: f64,
    pub lower: f64,
    pub upper: f64,
    pub grids: u32,
    pub interval: Option<u64>,
    pub max_cycles: Option<u64>,
    pub json: bool,
}

pub async fn run_grid(
    args: GridArgs,
    gateway: Arc<dyn OrderGateway>,
    config: &Config,
    shutdown: &GracefulShutdown,
) -> TradingResult<()> {
    let mut settings = GridSettings::from(&config.grid);
    if let Some(secs) = args.interval {
        settings.monitor_interval = Duration::from_secs(secs);
    }
    if args.max_cycles.is_some() {
        settings.max_cycles = args.max_cycles;
    }
    if settings.max_cycles.is_none() {
        info!("💡 Press Ctrl-C to stop the grid and cancel its orders");
    }

    let params = GridParams {
        symbol: args.symbol.to_uppercase(),
        quantity_per_level: args.quantity,
        lower_bound: args.lower,
        upper_bound: args.upper,
        num_grids: args.grids,
    };

    let engine = GridEngine::new(gateway, settings);
    let spinner = (!args.json).then(|| GridSpinner::new(&params.symbol));

    let mut total_fills = 0u64;
    let result = engine
        .run_with_observer(params, shutdown, |report| {
            total_fills += report.fills.len() as u64;
            if let Some(spinner) = &spinner {
                spinner.update(report, total_fills);
            }
        })
        .await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish_with_error(&e.to_string());
            }
            return Err(e);
        }
    };

    if let Some(spinner) = &spinner {
        spinner.finish(&format!(
            "Grid stopped after {} cycle(s), {} trade(s)",
            summary.cycles, summary.total_trades
        ));
    }
    if summary.cancel_failures > 0 {
        warn!("⚠️  {} order(s) could not be cancelled; check the exchange", summary.cancel_failures);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
