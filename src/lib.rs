//! # Trading Platform Matching Core
//!
//! A concurrent price-time priority matching core for centralized trading
//! platforms. The crate provides the four layers a trading backend composes,
//! leaves first:
//!
//! - **Order book** ([`orderbook::OrderBook`]): a per-symbol limit order book
//!   with price-time priority. Sides are concurrent skip lists of FIFO price
//!   levels, cancellation is tombstone-based, and best-price, spread, mid and
//!   depth queries are lock-free reads. An optional relaxed mode swaps the
//!   level queues for lock-free ones, trading strict time priority within a
//!   price for contention-free pushes.
//!
//! - **Matching engine** ([`engine::MatchingEngine`]): routes orders to books
//!   by symbol through a concurrent registry, measures per-order latency with
//!   a CAS-maintained running mean and max, and warns when a single order
//!   exceeds 100µs.
//!
//! - **Lifecycle service** ([`service::OrderService`]): validates requests
//!   (syntax, business rules, risk rules, caps), assigns identifiers, indexes
//!   orders by id, user, symbol and client id, drives the order state
//!   machine, applies fills, triggers stop orders, expires Day orders on a
//!   background sweeper, and publishes a broadcast event stream.
//!
//! - **Strategies** ([`strategy::StrategyManager`]): a consumer contract for
//!   market-data driven strategies, including a pairs z-score implementation.
//!
//! ## Design notes
//!
//! Prices and quantities are fixed point with eight decimal places
//! ([`types::Price`], [`types::Quantity`]); floats exist only at the
//! boundary. Book entries reference orders by id; the full record lives in
//! the service's primary index. Within a symbol all writes are totally
//! ordered by the book's write gate; across symbols there is no ordering.
//!
//! ## Example
//!
//! ```
//! use tradecore_rs::prelude::*;
//!
//! let service = OrderService::new(CoreConfig::default());
//!
//! let resting = service.create(OrderRequest {
//!     user_id: "maker".to_string(),
//!     client_order_id: None,
//!     symbol: "BTC-USD".to_string(),
//!     side: Side::Sell,
//!     kind: OrderKind::Limit,
//!     price: Some(30_000.0),
//!     stop_price: None,
//!     quantity: 1.0,
//!     time_in_force: TimeInForce::Gtc,
//!     expires_at: None,
//! }).unwrap();
//!
//! let taker = service.create(OrderRequest {
//!     user_id: "taker".to_string(),
//!     client_order_id: None,
//!     symbol: "BTC-USD".to_string(),
//!     side: Side::Buy,
//!     kind: OrderKind::Limit,
//!     price: Some(30_000.0),
//!     stop_price: None,
//!     quantity: 1.0,
//!     time_in_force: TimeInForce::Gtc,
//!     expires_at: None,
//! }).unwrap();
//!
//! assert_eq!(service.get(&taker.id).unwrap().status, OrderStatus::Filled);
//! assert_eq!(service.get(&resting.id).unwrap().status, OrderStatus::Filled);
//! assert_eq!(service.engine().metrics().total_trades, 1);
//! ```

pub mod engine;
pub mod orderbook;
pub mod prelude;
pub mod service;
pub mod strategy;
pub mod types;
mod utils;

pub use engine::{EngineMetrics, EngineStats, MatchingEngine};
pub use orderbook::{
    BookEntry, BookSnapshot, DepthLevel, FreeList, LastTrade, OrderBook, OrderBookError, Poolable,
    SealedSnapshot, SnapshotSchema, TradeListener,
};
pub use service::{
    BatchOp, BatchSubmitter, CancelRequest, CoreConfig, LifecycleEvent, MarketResidualPolicy,
    OrderEvent, OrderFilter, OrderRequest, OrderService, ServiceError, UpdateRequest,
};
pub use strategy::{MarketData, PairsParams, PairsStrategy, Strategy, StrategyManager};
pub use types::{
    Order, OrderId, OrderKind, OrderStatus, Price, Quantity, SCALE, Side, TimeInForce, Trade,
    TradeId,
};
pub use utils::current_time_millis;
