// Integration tests for the Binance futures REST gateway against a mock server

use std::sync::Arc;

use mockito::Matcher;

use futures_exec_bot::clients::{gateway_from_config, BinanceFuturesGateway, HmacSigner, OrderGateway, RequestSigner};
use futures_exec_bot::config::{Config, GatewayConfig, GatewayMode};
use futures_exec_bot::core::{OrderId, OrderRequest, OrderSide, OrderStatus, OrderType};

struct FixedSigner;

impl RequestSigner for FixedSigner {
    fn sign(&self, _query: &str) -> String {
        "deadbeef".to_string()
    }
}

fn gateway(url: &str) -> BinanceFuturesGateway {
    BinanceFuturesGateway::new(url, "test-key", 60_000, Arc::new(FixedSigner)).unwrap()
}

const NEW_LIMIT_ORDER: &str = r#"{
    "orderId": 4242,
    "clientOrderId": "grid-abc-2-3",
    "symbol": "BTCUSDT",
    "status": "NEW",
    "side": "BUY",
    "type": "LIMIT",
    "price": "44000.00",
    "stopPrice": "0",
    "origQty": "0.001",
    "executedQty": "0",
    "avgPrice": "0.00000",
    "timeInForce": "GTC",
    "updateTime": 1700000000000
}"#;

#[tokio::test]
async fn test_create_limit_order_sends_signed_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/fapi/v1/order")
        .match_header("X-MBX-APIKEY", "test-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("side".into(), "BUY".into()),
            Matcher::UrlEncoded("type".into(), "LIMIT".into()),
            Matcher::UrlEncoded("quantity".into(), "0.001".into()),
            Matcher::UrlEncoded("price".into(), "44000".into()),
            Matcher::UrlEncoded("timeInForce".into(), "GTC".into()),
            Matcher::UrlEncoded("recvWindow".into(), "60000".into()),
            Matcher::UrlEncoded("signature".into(), "deadbeef".into()),
            Matcher::Regex("timestamp=\\d+".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(NEW_LIMIT_ORDER)
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let request = OrderRequest::limit("BTCUSDT", OrderSide::Buy, 0.001, 44_000.0);
    let record = gateway.create_order(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.order_id, OrderId(4242));
    assert_eq!(record.status, OrderStatus::New);
    assert_eq!(record.order_type, OrderType::Limit);
    assert_eq!(record.price, 44_000.0);
    assert_eq!(record.orig_qty, 0.001);
    assert_eq!(record.client_order_id.as_deref(), Some("grid-abc-2-3"));
}

#[tokio::test]
async fn test_market_order_reports_execution() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/fapi/v1/order")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("type".into(), "MARKET".into()),
            Matcher::UrlEncoded("side".into(), "SELL".into()),
            Matcher::UrlEncoded("newOrderRespType".into(), "RESULT".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"orderId":7,"symbol":"ETHUSDT","status":"FILLED","side":"SELL","type":"MARKET",
                "price":"0","origQty":"0.5","executedQty":"0.5","avgPrice":"3012.45"}"#,
        )
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let record = gateway
        .create_order(&OrderRequest::market("ETHUSDT", OrderSide::Sell, 0.5))
        .await
        .unwrap();

    assert_eq!(record.status, OrderStatus::Filled);
    assert_eq!(record.executed_qty, 0.5);
    assert_eq!(record.avg_price, 3_012.45);
}

#[tokio::test]
async fn test_api_error_keeps_exchange_code() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/fapi/v1/order")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"code":-2019,"msg":"Margin is insufficient."}"#)
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let err = gateway
        .create_order(&OrderRequest::market("BTCUSDT", OrderSide::Buy, 0.001))
        .await
        .unwrap_err();

    assert_eq!(err.code, Some(-2019));
    assert_eq!(err.message, "Margin is insufficient.");
    assert_eq!(err.to_string(), "Code -2019 - Margin is insufficient.");
}

#[tokio::test]
async fn test_rate_limit_without_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/fapi/v1/openOrders")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("")
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let err = gateway.get_open_orders("BTCUSDT").await.unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_non_json_failure_has_no_code() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/fapi/v1/openOrders")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let err = gateway.get_open_orders("BTCUSDT").await.unwrap_err();

    assert_eq!(err.code, None);
    assert!(err.to_string().starts_with("UNKNOWN"));
}

#[tokio::test]
async fn test_get_open_orders_for_symbol() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/fapi/v1/openOrders")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("signature".into(), "deadbeef".into()),
        ]))
        .with_status(200)
        .with_body(format!("[{}]", NEW_LIMIT_ORDER))
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let open = gateway.get_open_orders("btcusdt").await.unwrap();

    mock.assert_async().await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order_id, OrderId(4242));
    assert!(open[0].status.is_open());
}

#[tokio::test]
async fn test_cancel_order_by_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/fapi/v1/order")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("orderId".into(), "4242".into()),
        ]))
        .with_status(200)
        .with_body(NEW_LIMIT_ORDER.replace("\"NEW\"", "\"CANCELED\""))
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let record = gateway.cancel_order("BTCUSDT", OrderId(4242)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.status, OrderStatus::Canceled);
}

#[tokio::test]
async fn test_from_config_uses_override_url() {
    let server = mockito::Server::new_async().await;
    let config = GatewayConfig {
        rest_url: Some(format!("{}/", server.url())),
        api_key: "k".to_string(),
        api_secret: "s".to_string(),
        ..GatewayConfig::default()
    };

    let gateway = BinanceFuturesGateway::from_config(&config, Arc::new(FixedSigner)).unwrap();
    assert_eq!(gateway.base_url(), server.url());
    assert_eq!(gateway.name(), "binance-futures");
}

#[tokio::test]
async fn test_hmac_signed_request_reaches_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/fapi/v1/openOrders")
        .match_header("X-MBX-APIKEY", "live-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::Regex("signature=[0-9a-f]{64}$".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let signer = HmacSigner::new("live-secret").unwrap();
    let gateway = BinanceFuturesGateway::new(server.url(), "live-key", 5_000, Arc::new(signer)).unwrap();
    let open = gateway.get_open_orders("BTCUSDT").await.unwrap();

    mock.assert_async().await;
    assert!(open.is_empty());
}

#[tokio::test]
async fn test_binance_mode_builds_signed_gateway() {
    let server = mockito::Server::new_async().await;
    let mut config = Config::default();
    config.gateway = GatewayConfig {
        mode: GatewayMode::Binance,
        rest_url: Some(server.url()),
        api_key: "k".to_string(),
        api_secret: "s".to_string(),
        ..GatewayConfig::default()
    };

    let gateway = gateway_from_config(&config).unwrap();
    assert_eq!(gateway.name(), "binance-futures");

    config.gateway.api_secret.clear();
    assert!(gateway_from_config(&config).is_err());
}

#[tokio::test]
async fn test_paper_mode_builds_paper_exchange() {
    let gateway = gateway_from_config(&Config::default()).unwrap();
    assert_eq!(gateway.name(), "paper");
}
