// TWAP command implementation
use std::sync::Arc;

use tracing::warn;

use futures_exec_bot::config::Config;
use futures_exec_bot::progress::TwapProgress;
use futures_exec_bot::validation::parse_side;
use futures_exec_bot::{GracefulShutdown, OrderGateway, TradingResult, TwapEngine, TwapParams};

pub struct TwapArgs {
    pub symbol: String,
    pub side: String,
    pub quantity: f64,
    pub chunks: u32,
    pub interval: Option<u64>,
    pub json: bool,
}

pub async fn run_twap(
    args: TwapArgs,
    gateway: Arc<dyn OrderGateway>,
    config: &Config,
    shutdown: &GracefulShutdown,
) -> TradingResult<()> {
    let params = TwapParams {
        symbol: args.symbol.to_uppercase(),
        side: parse_side(&args.side)?,
        total_quantity: args.quantity,
        num_chunks: args.chunks,
        interval_secs: args.interval.unwrap_or(config.twap.default_interval_secs),
    };
    params.validate()?;

    let engine = TwapEngine::new(gateway);
    let mut progress = (!args.json).then(|| TwapProgress::new(params.num_chunks));

    let summary = engine
        .execute_with_progress(params, shutdown, |chunk| {
            if let Some(progress) = progress.as_mut() {
                progress.record(chunk);
            }
        })
        .await?;

    if let Some(progress) = &progress {
        progress.finish(summary.executed_quantity, summary.avg_execution_price);
    }
    if summary.cancelled {
        warn!(
            "⚠️  Stopped early: {} of {} chunk(s) submitted",
            summary.executed_chunks + summary.failed_chunks,
            summary.total_chunks
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
