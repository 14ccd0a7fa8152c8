// Futures Execution Bot Library
//
// Grid maintenance and TWAP execution against a futures order gateway

pub mod core;
pub mod clients;
pub mod config;
pub mod error;       // Unified error handling
pub mod validation;  // Parameter validation
pub mod logging;
pub mod progress;

// Re-export engine types
pub use core::{
    GracefulShutdown, GridEngine, GridParams, GridSettings, GridState, GridSummary, OrderPlacer,
    TwapEngine, TwapParams, TwapSummary,
};

// Re-export error types
pub use error::{GatewayError, TradingError, TradingResult};

// Re-export client types
pub use clients::{
    BinanceFuturesGateway, HmacSigner, OrderGateway, PaperExchange, PaperExchangeConfig, RequestSigner,
};

// Re-export configuration
pub use config::{Config, ConfigError, GatewayMode};
