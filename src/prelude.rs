//! Convenience re-exports for the common surface of the crate.
//!
//! ```
//! use tradecore_rs::prelude::*;
//!
//! let engine = MatchingEngine::new();
//! assert_eq!(engine.metrics().total_orders, 0);
//! ```

pub use crate::engine::{EngineMetrics, MatchingEngine};
pub use crate::orderbook::{BookSnapshot, DepthLevel, OrderBook, OrderBookError, TradeListener};
pub use crate::service::{
    CancelRequest, CoreConfig, MarketResidualPolicy, OrderEvent, OrderFilter, OrderRequest,
    OrderService, ServiceError, UpdateRequest,
};
pub use crate::strategy::{MarketData, PairsParams, PairsStrategy, Strategy, StrategyManager};
pub use crate::types::{
    Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, TimeInForce, Trade, TradeId,
};
