// Exchange order gateways

pub mod binance;
pub mod paper;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{Config, GatewayMode};
use crate::core::types::{OrderId, OrderRecord, OrderRequest};
use crate::error::{GatewayError, TradingResult};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Create, query and cancel orders on one exchange account.
///
/// Calls are awaited one at a time by the engines. Implementations own their
/// timeouts; nothing above this trait retries.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<OrderRecord>;

    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderRecord>>;

    async fn cancel_order(&self, symbol: &str, order_id: OrderId) -> GatewayResult<OrderRecord>;
}

/// Gateway selected by `[gateway] mode`
pub fn gateway_from_config(config: &Config) -> TradingResult<Arc<dyn OrderGateway>> {
    match config.gateway.mode {
        GatewayMode::Paper => {
            info!(
                "🧪 PAPER mode: mark {:.2}, slippage {} bps, volatility {}",
                config.paper.mark_price, config.paper.slippage_bps, config.paper.volatility
            );
            Ok(Arc::new(PaperExchange::new(PaperExchangeConfig::from(&config.paper))))
        }
        GatewayMode::Binance => {
            let signer = HmacSigner::new(&config.gateway.api_secret)?;
            let gateway = BinanceFuturesGateway::from_config(&config.gateway, Arc::new(signer))?;
            Ok(Arc::new(gateway))
        }
    }
}

// Re-export client types
pub use binance::{BinanceFuturesGateway, HmacSigner, RequestSigner};
pub use paper::{PaperExchange, PaperExchangeConfig, Submission};
