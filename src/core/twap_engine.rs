//! TWAP execution engine
//!
//! Splits a quantity into equal market-order slices submitted at a fixed
//! interval. A failed slice is recorded and the schedule carries on.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::OrderGateway;
use crate::core::shutdown::GracefulShutdown;
use crate::core::summary::{ChunkOutcome, TwapChunk, TwapSummary};
use crate::core::types::{OrderRequest, OrderSide};
use crate::error::TradingResult;
use crate::validation::{validate_positive_count, validate_quantity, validate_symbol};

#[derive(Debug, Clone, PartialEq)]
pub struct TwapParams {
    pub symbol: String,
    pub side: OrderSide,
    pub total_quantity: f64,
    pub num_chunks: u32,
    pub interval_secs: u64,
}

impl TwapParams {
    pub fn validate(&self) -> TradingResult<()> {
        validate_symbol(&self.symbol)?;
        validate_quantity("total_quantity", self.total_quantity)?;
        validate_positive_count("num_chunks", self.num_chunks as u64)?;
        validate_positive_count("interval_secs", self.interval_secs)?;
        Ok(())
    }

    /// Quantity of each slice, unrounded
    pub fn chunk_quantity(&self) -> f64 {
        self.total_quantity / self.num_chunks as f64
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Time from the first slice to the last, saturating on huge intervals
    pub fn estimated_duration_secs(&self) -> u64 {
        self.interval_secs
            .saturating_mul(u64::from(self.num_chunks.saturating_sub(1)))
    }
}

pub struct TwapEngine {
    gateway: Arc<dyn OrderGateway>,
}

impl TwapEngine {
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self { gateway }
    }

    pub async fn execute(&self, params: TwapParams, shutdown: &GracefulShutdown) -> TradingResult<TwapSummary> {
        self.execute_with_progress(params, shutdown, |_| {}).await
    }

    /// Run the schedule, calling `on_chunk` after each slice is recorded.
    ///
    /// Shutdown is honoured between slices only; a submission in flight is
    /// always awaited. Remaining slices are then left unsubmitted.
    pub async fn execute_with_progress<F>(
        &self,
        params: TwapParams,
        shutdown: &GracefulShutdown,
        mut on_chunk: F,
    ) -> TradingResult<TwapSummary>
    where
        F: FnMut(&TwapChunk),
    {
        params.validate()?;

        let symbol = params.symbol.to_uppercase();
        let chunk_quantity = params.chunk_quantity();
        let interval = params.interval();
        let session_id = Uuid::new_v4().simple().to_string()[..8].to_string();

        info!("════════════════════════════════════════");
        info!("⏱️  TWAP EXECUTION STARTED ({} via {})", symbol, self.gateway.name());
        info!("════════════════════════════════════════");
        info!("  Side:           {}", params.side);
        info!("  Total Quantity: {}", params.total_quantity);
        info!("  Chunks:         {}", params.num_chunks);
        info!("  Chunk Quantity: {}", chunk_quantity);
        info!("  Interval:       {}s", params.interval_secs);
        info!("  Est. Duration:  {}s", params.estimated_duration_secs());

        let mut chunks = Vec::with_capacity(params.num_chunks as usize);
        let mut cancelled = false;

        for chunk_number in 1..=params.num_chunks {
            if shutdown.is_shutting_down() {
                warn!(
                    "Stop requested, {} of {} chunk(s) left unsubmitted",
                    params.num_chunks - chunk_number + 1,
                    params.num_chunks
                );
                cancelled = true;
                break;
            }

            info!("[Chunk {}/{}] Placing {} order for {} {}", chunk_number, params.num_chunks, params.side, chunk_quantity, symbol);
            let request = OrderRequest::market(&symbol, params.side, chunk_quantity)
                .with_client_order_id(format!("twap-{}-{}", session_id, chunk_number));

            let submitted_at = Utc::now();
            let outcome = match self.gateway.create_order(&request).await {
                Ok(record) => {
                    info!(
                        chunk = chunk_number,
                        order_id = %record.order_id,
                        status = ?record.status,
                        "   ✓ Executed {} @ {}",
                        record.executed_qty,
                        record.avg_price
                    );
                    ChunkOutcome::Success {
                        order_id: record.order_id,
                        executed_qty: record.executed_qty,
                        avg_price: record.avg_price,
                        status: record.status,
                    }
                }
                Err(e) => {
                    error!(chunk = chunk_number, "   ✗ Chunk failed: {}", e);
                    ChunkOutcome::Failure {
                        code: e.code,
                        message: e.message,
                    }
                }
            };

            let chunk = TwapChunk {
                chunk_number,
                submitted_at,
                outcome,
            };
            on_chunk(&chunk);
            chunks.push(chunk);

            if chunk_number < params.num_chunks {
                debug!("Waiting {}s before next chunk", params.interval_secs);
                if shutdown.sleep(interval).await {
                    warn!(
                        "Stop requested, {} of {} chunk(s) left unsubmitted",
                        params.num_chunks - chunk_number,
                        params.num_chunks
                    );
                    cancelled = true;
                    break;
                }
            }
        }

        let summary = TwapSummary::from_chunks(
            &symbol,
            params.side,
            params.num_chunks,
            params.total_quantity,
            chunk_quantity,
            chunks,
            cancelled,
        );
        summary.log_report();
        Ok(summary)
    }
}
