// Single-order command implementations
use std::sync::Arc;

use tracing::info;

use futures_exec_bot::core::{OrderRecord, OrderType};
use futures_exec_bot::validation::parse_side;
use futures_exec_bot::{OrderGateway, OrderPlacer, TradingResult};

/// One order as given on the command line
pub enum OrderArgs {
    Market {
        symbol: String,
        side: String,
        quantity: f64,
    },
    Limit {
        symbol: String,
        side: String,
        quantity: f64,
        price: f64,
    },
    StopLimit {
        symbol: String,
        side: String,
        quantity: f64,
        price: f64,
        stop_price: f64,
    },
    StopMarket {
        symbol: String,
        side: String,
        stop_price: f64,
        quantity: Option<f64>,
    },
    TakeProfit {
        symbol: String,
        side: String,
        quantity: f64,
        stop_price: f64,
    },
}

pub async fn run_order(args: OrderArgs, gateway: Arc<dyn OrderGateway>, json: bool) -> TradingResult<()> {
    let placer = OrderPlacer::new(gateway);

    let record = match args {
        OrderArgs::Market { symbol, side, quantity } => {
            placer
                .place_market(&symbol.to_uppercase(), parse_side(&side)?, quantity)
                .await?
        }
        OrderArgs::Limit { symbol, side, quantity, price } => {
            placer
                .place_limit(&symbol.to_uppercase(), parse_side(&side)?, quantity, price)
                .await?
        }
        OrderArgs::StopLimit { symbol, side, quantity, price, stop_price } => {
            placer
                .place_stop_limit(&symbol.to_uppercase(), parse_side(&side)?, quantity, price, stop_price)
                .await?
        }
        OrderArgs::StopMarket { symbol, side, stop_price, quantity } => {
            placer
                .place_stop_market(&symbol.to_uppercase(), parse_side(&side)?, quantity, stop_price)
                .await?
        }
        OrderArgs::TakeProfit { symbol, side, quantity, stop_price } => {
            placer
                .place_take_profit_market(&symbol.to_uppercase(), parse_side(&side)?, quantity, stop_price)
                .await?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        log_record(&record);
    }
    Ok(())
}

fn log_record(record: &OrderRecord) {
    info!("════════════════════════════════════════");
    info!("📋 ORDER {}", record.order_id);
    info!("════════════════════════════════════════");
    info!("  Symbol:       {}", record.symbol);
    info!("  Side:         {}", record.side);
    info!("  Type:         {}", record.order_type);
    info!("  Status:       {:?}", record.status);
    if record.order_type != OrderType::Market && record.price > 0.0 {
        info!("  Price:        {}", record.price);
    }
    if record.order_type.is_conditional() {
        info!("  Stop Price:   {}", record.stop_price);
    }
    info!("  Quantity:     {}", record.orig_qty);
    if record.executed_qty > 0.0 {
        info!("  Executed:     {} @ {}", record.executed_qty, record.avg_price);
    }
}
