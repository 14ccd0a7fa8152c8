// Integration tests for the TWAP execution engine

mod common;

use std::time::Duration;

use common::{approx_eq, exchange_at, idle_exchange, twap_engine, twap_params};
use futures_exec_bot::core::{ChunkOutcome, GracefulShutdown, OrderSide, OrderType};
use futures_exec_bot::error::{GatewayError, TradingError};

#[tokio::test(start_paused = true)]
async fn test_even_slices_on_schedule() {
    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);

    let started = tokio::time::Instant::now();
    let summary = engine
        .execute(twap_params(0.005, 5, 5), &GracefulShutdown::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    let submissions = exchange.submissions();
    assert_eq!(submissions.len(), 5);
    for (i, submission) in submissions.iter().enumerate() {
        assert_eq!(submission.request.order_type, OrderType::Market);
        assert_eq!(submission.request.side, OrderSide::Buy);
        assert!(approx_eq(submission.request.quantity, 0.001));
        let offset = submission.at - submissions[0].at;
        assert!(offset >= Duration::from_secs(5 * i as u64));
        assert!(offset < Duration::from_secs(5 * i as u64 + 1));
    }

    // No wait after the last slice
    assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));

    assert!(summary.success);
    assert!(!summary.cancelled);
    assert_eq!(summary.total_chunks, 5);
    assert_eq!(summary.executed_chunks, 5);
    assert_eq!(summary.failed_chunks, 0);
    assert!(approx_eq(summary.chunk_quantity, 0.001));
    assert!(approx_eq(summary.executed_quantity, 0.005));
    assert!(approx_eq(summary.avg_execution_price, 50_000.0));
    assert!(approx_eq(summary.execution_rate(), 100.0));
}

#[tokio::test(start_paused = true)]
async fn test_every_slice_failing() {
    let exchange = exchange_at(50_000.0);
    exchange.reject_all_creates(Some(GatewayError::api(-2019, "Margin is insufficient.")));
    let engine = twap_engine(&exchange);

    let started = tokio::time::Instant::now();
    let summary = engine
        .execute(twap_params(0.005, 5, 5), &GracefulShutdown::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(20));
    assert_eq!(exchange.submissions().len(), 5);
    assert!(!summary.success);
    assert_eq!(summary.executed_chunks, 0);
    assert_eq!(summary.failed_chunks, 5);
    assert_eq!(summary.executed_quantity, 0.0);
    assert_eq!(summary.avg_execution_price, 0.0);

    let numbers: Vec<u32> = summary.failed_orders.iter().map(|c| c.chunk_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    match &summary.failed_orders[0].outcome {
        ChunkOutcome::Failure { code, message } => {
            assert_eq!(*code, Some(-2019));
            assert_eq!(message, "Margin is insufficient.");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_weighted_average_execution_price() {
    let exchange = idle_exchange();
    exchange.script_market_fill(1.0, 100.0);
    exchange.script_market_fill(3.0, 200.0);
    let engine = twap_engine(&exchange);

    let summary = engine
        .execute(twap_params(4.0, 2, 1), &GracefulShutdown::new())
        .await
        .unwrap();

    assert!(summary.success);
    assert!(approx_eq(summary.executed_quantity, 4.0));
    assert!(approx_eq(summary.avg_execution_price, 175.0));
}

#[tokio::test(start_paused = true)]
async fn test_failed_slice_does_not_stop_schedule() {
    let exchange = exchange_at(3_000.0);
    exchange.queue_create_failure(GatewayError::transport("connection reset"));
    let engine = twap_engine(&exchange);

    let summary = engine
        .execute(twap_params(0.3, 3, 2), &GracefulShutdown::new())
        .await
        .unwrap();

    assert_eq!(exchange.submissions().len(), 3);
    assert!(!summary.success);
    assert_eq!(summary.failed_chunks, 1);
    assert_eq!(summary.executed_chunks, 2);
    assert_eq!(summary.failed_orders[0].chunk_number, 1);
    assert!(matches!(
        summary.failed_orders[0].outcome,
        ChunkOutcome::Failure { code: None, .. }
    ));
    assert!(approx_eq(summary.executed_quantity, 0.2));
    assert!(approx_eq(summary.avg_execution_price, 3_000.0));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_between_slices() {
    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);
    let shutdown = GracefulShutdown::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        trigger.initiate_shutdown();
    });

    let started = tokio::time::Instant::now();
    let summary = engine.execute(twap_params(0.005, 5, 5), &shutdown).await.unwrap();

    // Slices at 0s and 5s; the wait for the third is cut short at 7s
    assert_eq!(exchange.submissions().len(), 2);
    assert!(started.elapsed() < Duration::from_secs(8));
    assert!(summary.cancelled);
    assert!(summary.success);
    assert_eq!(summary.total_chunks, 5);
    assert_eq!(summary.executed_chunks, 2);
    assert!(approx_eq(summary.executed_quantity, 0.002));
}

#[tokio::test]
async fn test_shutdown_before_start_submits_nothing() {
    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);
    let shutdown = GracefulShutdown::new();
    shutdown.initiate_shutdown();

    let summary = engine.execute(twap_params(0.005, 5, 5), &shutdown).await.unwrap();

    assert!(exchange.submissions().is_empty());
    assert!(summary.cancelled);
    assert_eq!(summary.executed_chunks + summary.failed_chunks, 0);
}

#[tokio::test]
async fn test_invalid_params_submit_nothing() {
    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);
    let shutdown = GracefulShutdown::new();

    let result = engine.execute(twap_params(0.0, 5, 5), &shutdown).await;
    assert!(matches!(result, Err(TradingError::InvalidParameter(_, _))));

    let result = engine.execute(twap_params(0.005, 0, 5), &shutdown).await;
    assert!(result.is_err());

    let result = engine.execute(twap_params(0.005, 5, 0), &shutdown).await;
    assert!(result.is_err());

    let mut params = twap_params(0.005, 5, 5);
    params.symbol = "btcusdt".to_string();
    assert!(engine.execute(params, &shutdown).await.is_err());

    assert!(exchange.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_progress_callback_and_client_ids() {
    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);

    let mut seen = Vec::new();
    let summary = engine
        .execute_with_progress(twap_params(0.003, 3, 1), &GracefulShutdown::new(), |chunk| {
            seen.push(chunk.chunk_number)
        })
        .await
        .unwrap();

    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(summary.executed_orders.len(), 3);

    let ids: Vec<String> = exchange
        .submissions()
        .iter()
        .map(|s| s.request.client_order_id.clone().unwrap())
        .collect();
    assert!(ids[0].starts_with("twap-") && ids[0].ends_with("-1"));
    assert!(ids[2].ends_with("-3"));
    let session = |id: &str| id.split('-').nth(1).map(str::to_string);
    assert_eq!(session(&ids[0]), session(&ids[2]));
}

#[tokio::test(start_paused = true)]
async fn test_sell_side_slippage() {
    let exchange = std::sync::Arc::new(futures_exec_bot::clients::PaperExchange::new(
        futures_exec_bot::clients::PaperExchangeConfig {
            mark_price: Some(10_000.0),
            slippage_bps: 10.0,
            volatility: 0.0,
        },
    ));
    let engine = twap_engine(&exchange);
    let mut params = twap_params(2.0, 2, 1);
    params.side = OrderSide::Sell;

    let summary = engine.execute(params, &GracefulShutdown::new()).await.unwrap();

    assert_eq!(summary.side, OrderSide::Sell);
    assert!(approx_eq(summary.avg_execution_price, 9_990.0));
}

#[tokio::test(start_paused = true)]
async fn test_huge_interval_is_logged_without_overflow() {
    let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let exchange = exchange_at(50_000.0);
    let engine = twap_engine(&exchange);
    let shutdown = GracefulShutdown::new();
    let trigger = shutdown.clone();

    let summary = engine
        .execute_with_progress(twap_params(0.004, 4, u64::MAX / 2), &shutdown, |_| {
            trigger.initiate_shutdown()
        })
        .await
        .unwrap();

    assert_eq!(exchange.submissions().len(), 1);
    assert!(summary.cancelled);
    assert_eq!(summary.executed_chunks, 1);
}
