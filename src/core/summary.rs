//! Session statistics and the final reports returned to callers

use crate::core::types::{OrderId, OrderSide, OrderStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Running counters for one grid session. Only ever incremented.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridSessionStats {
    pub cycles: u64,
    pub buy_orders_placed: u64,
    pub sell_orders_placed: u64,
    pub buy_fills: u64,
    pub sell_fills: u64,
    pub orders_cancelled_at_shutdown: u64,
    pub placement_failures: u64,
    pub vacated_levels: u64,
    pub cancel_failures: u64,
}

impl GridSessionStats {
    pub fn record_placed(&mut self, side: OrderSide) {
        match side {
            OrderSide::Buy => self.buy_orders_placed += 1,
            OrderSide::Sell => self.sell_orders_placed += 1,
        }
    }

    pub fn record_fill(&mut self, side: OrderSide) {
        match side {
            OrderSide::Buy => self.buy_fills += 1,
            OrderSide::Sell => self.sell_fills += 1,
        }
    }
}

/// Read-only report produced when a grid session ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub symbol: String,
    pub cycles: u64,
    pub total_buy_orders: u64,
    pub total_sell_orders: u64,
    pub buy_fills: u64,
    pub sell_fills: u64,
    pub orders_cancelled: u64,
    pub total_trades: u64,
    pub placement_failures: u64,
    pub vacated_levels: u64,
    pub cancel_failures: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GridSummary {
    pub fn from_stats(
        symbol: &str,
        stats: &GridSessionStats,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            cycles: stats.cycles,
            total_buy_orders: stats.buy_orders_placed,
            total_sell_orders: stats.sell_orders_placed,
            buy_fills: stats.buy_fills,
            sell_fills: stats.sell_fills,
            orders_cancelled: stats.orders_cancelled_at_shutdown,
            total_trades: stats.buy_fills + stats.sell_fills,
            placement_failures: stats.placement_failures,
            vacated_levels: stats.vacated_levels,
            cancel_failures: stats.cancel_failures,
            started_at,
            finished_at,
        }
    }

    pub fn log_report(&self) {
        info!("════════════════════════════════════════");
        info!("📊 GRID TRADING SUMMARY ({})", self.symbol);
        info!("════════════════════════════════════════");
        info!("  Monitoring Cycles:   {}", self.cycles);
        info!("  Total BUY Orders:    {}", self.total_buy_orders);
        info!("  Total SELL Orders:   {}", self.total_sell_orders);
        info!("  BUY Orders Filled:   {}", self.buy_fills);
        info!("  SELL Orders Filled:  {}", self.sell_fills);
        info!("  Orders Cancelled:    {}", self.orders_cancelled);
        info!("  Total Trades:        {}", self.total_trades);
        if self.placement_failures > 0 {
            warn!("  Placement Failures:  {}", self.placement_failures);
        }
        if self.vacated_levels > 0 {
            info!("  Vacated Levels:      {}", self.vacated_levels);
        }
        if self.cancel_failures > 0 {
            warn!("  Cancel Failures:     {}", self.cancel_failures);
        }
        info!("════════════════════════════════════════");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Success {
        order_id: OrderId,
        executed_qty: f64,
        avg_price: f64,
        status: OrderStatus,
    },
    Failure {
        code: Option<i64>,
        message: String,
    },
}

/// One TWAP slice, recorded once and never changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwapChunk {
    pub chunk_number: u32,
    pub submitted_at: DateTime<Utc>,
    pub outcome: ChunkOutcome,
}

impl TwapChunk {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ChunkOutcome::Success { .. })
    }

    /// (executed quantity, average price) for successful chunks
    pub fn execution(&self) -> Option<(f64, f64)> {
        match self.outcome {
            ChunkOutcome::Success { executed_qty, avg_price, .. } => Some((executed_qty, avg_price)),
            ChunkOutcome::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwapSummary {
    pub symbol: String,
    pub side: OrderSide,
    pub success: bool,
    pub cancelled: bool,
    pub total_chunks: u32,
    pub executed_chunks: u32,
    pub failed_chunks: u32,
    pub chunk_quantity: f64,
    pub target_quantity: f64,
    pub executed_quantity: f64,
    pub avg_execution_price: f64,
    pub executed_orders: Vec<TwapChunk>,
    pub failed_orders: Vec<TwapChunk>,
}

impl TwapSummary {
    /// Reduce the recorded chunks into the session report
    pub fn from_chunks(
        symbol: &str,
        side: OrderSide,
        total_chunks: u32,
        target_quantity: f64,
        chunk_quantity: f64,
        chunks: Vec<TwapChunk>,
        cancelled: bool,
    ) -> Self {
        let (executed_orders, failed_orders): (Vec<_>, Vec<_>) =
            chunks.into_iter().partition(TwapChunk::is_success);

        let (executed_quantity, notional) = executed_orders
            .iter()
            .filter_map(TwapChunk::execution)
            .fold((0.0, 0.0), |(qty, value), (q, p)| (qty + q, value + q * p));

        let avg_execution_price = if executed_quantity > 0.0 {
            notional / executed_quantity
        } else {
            0.0
        };

        Self {
            symbol: symbol.to_string(),
            side,
            success: failed_orders.is_empty(),
            cancelled,
            total_chunks,
            executed_chunks: executed_orders.len() as u32,
            failed_chunks: failed_orders.len() as u32,
            chunk_quantity,
            target_quantity,
            executed_quantity,
            avg_execution_price,
            executed_orders,
            failed_orders,
        }
    }

    /// Share of planned chunks that executed, in percent
    pub fn execution_rate(&self) -> f64 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        self.executed_chunks as f64 / self.total_chunks as f64 * 100.0
    }

    pub fn log_report(&self) {
        info!("════════════════════════════════════════");
        info!("📊 TWAP EXECUTION SUMMARY ({} {})", self.side, self.symbol);
        info!("════════════════════════════════════════");
        info!("  Total Chunks:        {}", self.total_chunks);
        info!("  Successful:          {}", self.executed_chunks);
        info!("  Failed:              {}", self.failed_chunks);
        info!("  Target Quantity:     {}", self.target_quantity);
        info!("  Executed Quantity:   {}", self.executed_quantity);
        info!("  Execution Rate:      {:.1}%", self.execution_rate());
        if self.executed_chunks > 0 {
            info!("  Avg Execution Price: {:.2}", self.avg_execution_price);
        }
        if self.failed_chunks > 0 {
            warn!("⚠️  {} chunk(s) failed. Check logs for details.", self.failed_chunks);
        }
        if self.cancelled {
            warn!("⚠️  Stopped before all chunks were submitted");
        }
        info!("════════════════════════════════════════");
    }
}
