//! Terminal feedback for long-running sessions
//!
//! A progress bar tracks TWAP slices; a spinner keeps the grid monitor
//! visibly alive between cycles.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::grid_engine::CycleReport;
use crate::core::summary::{ChunkOutcome, TwapChunk};

/// Progress bar for TWAP chunks
pub struct TwapProgress {
    pub progress: ProgressBar,
    failed: u32,
}

impl TwapProgress {
    pub fn new(total_chunks: u32) -> Self {
        let progress = ProgressBar::new(total_chunks as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks\n{msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);

        Self { progress, failed: 0 }
    }

    /// Advance by one recorded chunk
    pub fn record(&mut self, chunk: &TwapChunk) {
        self.progress.inc(1);
        match &chunk.outcome {
            ChunkOutcome::Success { executed_qty, avg_price, .. } => {
                self.progress.set_message(format!(
                    "✓ Chunk {} executed {} @ {:.2}",
                    chunk.chunk_number, executed_qty, avg_price
                ));
            }
            ChunkOutcome::Failure { message, .. } => {
                self.failed += 1;
                self.progress
                    .set_message(format!("✗ Chunk {} failed: {}", chunk.chunk_number, message));
            }
        }
    }

    pub fn finish(&self, executed_quantity: f64, avg_price: f64) {
        if self.failed == 0 {
            self.progress.finish_with_message(format!(
                "✅ TWAP complete! {} executed @ {:.2}",
                executed_quantity, avg_price
            ));
        } else {
            self.progress.finish_with_message(format!(
                "⚠️  TWAP finished with {} failed chunk(s), {} executed",
                self.failed, executed_quantity
            ));
        }
    }
}

/// Spinner shown while the grid is being monitored
pub struct GridSpinner {
    pub spinner: ProgressBar,
}

impl GridSpinner {
    pub fn new(symbol: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map(|style| style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Placing grid for {}...", symbol));

        Self { spinner }
    }

    pub fn update(&self, report: &CycleReport, total_fills: u64) {
        let status = if report.open_orders_error.is_some() {
            "open orders unavailable".to_string()
        } else {
            format!("{} fill(s) this cycle", report.fills.len())
        };
        self.spinner.set_message(format!(
            "Cycle {} | BUY {} / SELL {} | {} | {} total fill(s)",
            report.cycle, report.active_buys, report.active_sells, status, total_fills
        ));
    }

    pub fn finish(&self, message: &str) {
        self.spinner.finish_with_message(format!("✅ {}", message));
    }

    pub fn finish_with_error(&self, message: &str) {
        self.spinner.finish_with_message(format!("❌ {}", message));
    }
}
