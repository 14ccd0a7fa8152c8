// Futures Execution Bot - CLI
// Grid maintenance, TWAP execution and single orders from the command line

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use futures_exec_bot::clients::gateway_from_config;
use futures_exec_bot::config::{Config, LoggingConfig};
use futures_exec_bot::{logging, GracefulShutdown, TradingError, TradingResult};

// Load command modules from cli directory
#[path = "../cli/grid_commands.rs"]
mod grid_commands;
#[path = "../cli/twap_commands.rs"]
mod twap_commands;
#[path = "../cli/order_commands.rs"]
mod order_commands;

#[derive(Parser)]
#[command(name = "exec-bot")]
#[command(version)]
#[command(about = "Grid and TWAP execution for USDⓈ-M futures", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file from the bundled template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Place a limit-order grid and keep it replenished
    Grid {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// Quantity per grid level
        quantity: f64,

        /// Lowest grid price
        lower: f64,

        /// Highest grid price
        upper: f64,

        /// Number of grid steps per side
        grids: u32,

        /// Seconds between monitoring cycles
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many monitoring cycles
        #[arg(short, long)]
        max_cycles: Option<u64>,

        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split an order into equal market slices over time
    Twap {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        /// Total quantity
        quantity: f64,

        /// Number of slices
        chunks: u32,

        /// Seconds between slices (defaults to the config value)
        interval: Option<u64>,

        /// Print the execution summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place one market order
    Market {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        quantity: f64,

        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place one good-till-cancel limit order
    Limit {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        quantity: f64,

        price: f64,

        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place a limit order that activates when the stop price is reached
    StopLimit {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        quantity: f64,

        /// Limit price once triggered
        price: f64,

        /// Trigger price
        stop_price: f64,

        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place a market order that fires when the stop price is reached
    StopMarket {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        /// Trigger price
        stop_price: f64,

        /// Order quantity
        #[arg(short, long, required_unless_present = "close_position", conflicts_with = "close_position")]
        quantity: Option<f64>,

        /// Close the whole position instead of a fixed quantity
        #[arg(long)]
        close_position: bool,

        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place a take-profit market order
    TakeProfit {
        /// Trading pair (e.g., BTCUSDT)
        symbol: String,

        /// BUY or SELL
        side: String,

        quantity: f64,

        /// Trigger price
        stop_price: f64,

        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("❌ [{}] {}", e.category(), e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> TradingResult<()> {
    if let Commands::Init { force } = cli.command {
        logging::init(&LoggingConfig::default(), cli.verbose)?;
        return init_config(&cli.config, force);
    }

    let config = load_config_or_exit(&cli.config, cli.verbose);
    logging::init(&config.logging, cli.verbose)?;

    info!("🚀 Futures Execution Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📁 Config: {}", cli.config);

    let gateway = gateway_from_config(&config)?;
    let shutdown = GracefulShutdown::new();
    shutdown.listen_for_ctrl_c();

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Grid { symbol, quantity, lower, upper, grids, interval, max_cycles, json } => {
            let args = grid_commands::GridArgs {
                symbol,
                quantity,
                lower,
                upper,
                grids,
                interval,
                max_cycles,
                json,
            };
            grid_commands::run_grid(args, gateway, &config, &shutdown).await
        }
        Commands::Twap { symbol, side, quantity, chunks, interval, json } => {
            let args = twap_commands::TwapArgs {
                symbol,
                side,
                quantity,
                chunks,
                interval,
                json,
            };
            twap_commands::run_twap(args, gateway, &config, &shutdown).await
        }
        Commands::Market { symbol, side, quantity, json } => {
            let args = order_commands::OrderArgs::Market { symbol, side, quantity };
            order_commands::run_order(args, gateway, json).await
        }
        Commands::Limit { symbol, side, quantity, price, json } => {
            let args = order_commands::OrderArgs::Limit { symbol, side, quantity, price };
            order_commands::run_order(args, gateway, json).await
        }
        Commands::StopLimit { symbol, side, quantity, price, stop_price, json } => {
            let args = order_commands::OrderArgs::StopLimit {
                symbol,
                side,
                quantity,
                price,
                stop_price,
            };
            order_commands::run_order(args, gateway, json).await
        }
        Commands::StopMarket { symbol, side, stop_price, quantity, close_position, json } => {
            // clap guarantees exactly one of the two
            let quantity = if close_position { None } else { quantity };
            let args = order_commands::OrderArgs::StopMarket {
                symbol,
                side,
                stop_price,
                quantity,
            };
            order_commands::run_order(args, gateway, json).await
        }
        Commands::TakeProfit { symbol, side, quantity, stop_price, json } => {
            let args = order_commands::OrderArgs::TakeProfit {
                symbol,
                side,
                quantity,
                stop_price,
            };
            order_commands::run_order(args, gateway, json).await
        }
    }
}

/// Load config or exit with helpful error message
fn load_config_or_exit(path: &str, verbose: bool) -> Config {
    match Config::load_or_default(path) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not configured yet; fall back to defaults to report the problem
            let _ = logging::init(&LoggingConfig::default(), verbose);
            let err = TradingError::from(e);
            error!("❌ Configuration Error");
            error!("{}", err.user_message());
            error!("💡 Run: exec-bot init --force to regenerate {}", path);
            std::process::exit(1);
        }
    }
}

fn init_config(config_path: &str, force: bool) -> TradingResult<()> {
    info!("🔧 Initializing configuration...");

    if Path::new(config_path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", config_path);
        return Ok(());
    }

    let template = include_str!("../../config.toml.example");
    std::fs::write(config_path, template)?;
    info!("📝 Created {}", config_path);

    info!("✅ Configuration initialized successfully!");
    info!("💡 Next steps:");
    info!("   1. Review {} (paper mode is the default)", config_path);
    info!("   2. Run: exec-bot twap BTCUSDT BUY 0.005 5 5");
    info!("   3. Run: exec-bot grid BTCUSDT 0.001 40000 50000 5 --max-cycles 3");
    info!("   4. Run: exec-bot stop-limit BTCUSDT SELL 0.01 43900 44000");

    Ok(())
}
