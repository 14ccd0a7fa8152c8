// Binance USDⓈ-M futures REST gateway

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::clients::{GatewayResult, OrderGateway};
use crate::config::GatewayConfig;
use crate::core::types::{OrderId, OrderRecord, OrderRequest, OrderSide, OrderStatus, OrderType};
use crate::error::GatewayError;

const ORDER_PATH: &str = "/fapi/v1/order";
const OPEN_ORDERS_PATH: &str = "/fapi/v1/openOrders";

/// Produces the `signature` parameter for a signed request.
///
/// The gateway hands over the exact query string that will be sent.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, query: &str) -> String;
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of the query string keyed by the API secret, hex encoded
pub struct HmacSigner {
    mac: HmacSha256,
}

impl HmacSigner {
    pub fn new(api_secret: &str) -> GatewayResult<Self> {
        if api_secret.is_empty() {
            return Err(GatewayError::transport("API secret is empty"));
        }
        let mac = HmacSha256::new_from_slice(api_secret.as_bytes())
            .map_err(|e| GatewayError::transport(format!("invalid API secret: {}", e)))?;
        Ok(Self { mac })
    }
}

impl RequestSigner for HmacSigner {
    fn sign(&self, query: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Error body returned by Binance on rejected requests
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Order as Binance serializes it; decimals arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    order_id: u64,
    #[serde(default)]
    client_order_id: Option<String>,
    symbol: String,
    status: OrderStatus,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: OrderType,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    stop_price: Option<String>,
    #[serde(default)]
    orig_qty: Option<String>,
    #[serde(default)]
    executed_qty: Option<String>,
    #[serde(default)]
    avg_price: Option<String>,
}

fn parse_decimal(field: &str, value: Option<String>) -> GatewayResult<f64> {
    match value {
        None => Ok(0.0),
        Some(raw) if raw.is_empty() => Ok(0.0),
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| GatewayError::transport(format!("invalid {} '{}' in order response", field, raw))),
    }
}

impl TryFrom<WireOrder> for OrderRecord {
    type Error = GatewayError;

    fn try_from(wire: WireOrder) -> Result<Self, Self::Error> {
        Ok(OrderRecord {
            order_id: OrderId(wire.order_id),
            client_order_id: wire.client_order_id,
            symbol: wire.symbol,
            status: wire.status,
            side: wire.side,
            order_type: wire.order_type,
            price: parse_decimal("price", wire.price)?,
            stop_price: parse_decimal("stopPrice", wire.stop_price)?,
            orig_qty: parse_decimal("origQty", wire.orig_qty)?,
            executed_qty: parse_decimal("executedQty", wire.executed_qty)?,
            avg_price: parse_decimal("avgPrice", wire.avg_price)?,
        })
    }
}

/// Format a decimal without exponent or trailing zeros
fn format_decimal(value: f64) -> String {
    let text = format!("{:.8}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Query parameters for `POST /fapi/v1/order`
fn order_params(request: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", request.symbol.to_uppercase()),
        ("side", request.side.as_str().to_string()),
        ("type", request.order_type.as_str().to_string()),
    ];
    if request.close_position != Some(true) {
        params.push(("quantity", format_decimal(request.quantity)));
    }
    if let Some(price) = request.price {
        params.push(("price", format_decimal(price)));
    }
    if let Some(stop_price) = request.stop_price {
        params.push(("stopPrice", format_decimal(stop_price)));
    }
    if let Some(tif) = request.time_in_force {
        params.push(("timeInForce", tif.as_str().to_string()));
    }
    if let Some(close) = request.close_position {
        params.push(("closePosition", close.to_string()));
    }
    if let Some(client_id) = &request.client_order_id {
        params.push(("newClientOrderId", client_id.clone()));
    }
    // ACK responses carry no executedQty or avgPrice
    if request.order_type == OrderType::Market {
        params.push(("newOrderRespType", "RESULT".to_string()));
    }
    params
}

pub struct BinanceFuturesGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    recv_window_ms: u64,
    signer: Arc<dyn RequestSigner>,
}

impl BinanceFuturesGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        recv_window_ms: u64,
        signer: Arc<dyn RequestSigner>,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            recv_window_ms,
            signer,
        })
    }

    pub fn from_config(config: &GatewayConfig, signer: Arc<dyn RequestSigner>) -> GatewayResult<Self> {
        let gateway = Self::new(
            config.effective_rest_url(),
            config.api_key.clone(),
            config.recv_window_ms,
            signer,
        )?;
        if config.testnet {
            info!("Binance futures gateway initialized in TESTNET mode ({})", gateway.base_url);
        } else {
            warn!("Binance futures gateway initialized in PRODUCTION mode ({})", gateway.base_url);
        }
        Ok(gateway)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append timestamp, recvWindow and signature to the parameters
    fn signed_query(&self, params: Vec<(&'static str, String)>) -> String {
        let mut query = params
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>();
        query.push(format!("recvWindow={}", self.recv_window_ms));
        query.push(format!("timestamp={}", Utc::now().timestamp_millis()));

        let query = query.join("&");
        let signature = self.signer.sign(&query);
        format!("{}&signature={}", query, signature)
    }

    async fn send_signed<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> GatewayResult<T> {
        let url = format!("{}{}?{}", self.base_url, path, self.signed_query(params));
        debug!(%method, path, "Binance request");

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(decode_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::transport(format!("unexpected response from {}: {}", path, e)))
    }
}

fn decode_error(status: StatusCode, body: &str) -> GatewayError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => GatewayError::api(err.code, err.msg),
        Err(_) if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 => {
            GatewayError::api(GatewayError::RATE_LIMIT_CODE, format!("HTTP {}: rate limited", status.as_u16()))
        }
        Err(_) => GatewayError::transport(format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl OrderGateway for BinanceFuturesGateway {
    fn name(&self) -> &str {
        "binance-futures"
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<OrderRecord> {
        let wire: WireOrder = self
            .send_signed(Method::POST, ORDER_PATH, order_params(request))
            .await?;
        OrderRecord::try_from(wire)
    }

    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderRecord>> {
        let wire: Vec<WireOrder> = self
            .send_signed(
                Method::GET,
                OPEN_ORDERS_PATH,
                vec![("symbol", symbol.to_uppercase())],
            )
            .await?;
        debug!(symbol, count = wire.len(), "Retrieved open orders");
        wire.into_iter().map(OrderRecord::try_from).collect()
    }

    async fn cancel_order(&self, symbol: &str, order_id: OrderId) -> GatewayResult<OrderRecord> {
        let wire: WireOrder = self
            .send_signed(
                Method::DELETE,
                ORDER_PATH,
                vec![
                    ("symbol", symbol.to_uppercase()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        OrderRecord::try_from(wire)
    }
}
