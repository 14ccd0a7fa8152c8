//! Core execution logic

pub mod types;
pub mod order_tracker;
pub mod summary;
pub mod shutdown;
pub mod grid_engine;
pub mod twap_engine;
pub mod order_placer;

// Re-export commonly used types
pub use types::{OrderId, OrderRecord, OrderRequest, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use order_tracker::{OrderTracker, TrackedOrder};
pub use summary::{ChunkOutcome, GridSessionStats, GridSummary, TwapChunk, TwapSummary};
pub use shutdown::GracefulShutdown;
pub use grid_engine::{round_to_tick, CycleReport, GridEngine, GridParams, GridSettings, GridState, ShutdownReport};
pub use twap_engine::{TwapEngine, TwapParams};
pub use order_placer::{stop_limit_spread_warning, OrderPlacer};
