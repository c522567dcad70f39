//! Strategy consumer contract: market-data ingestion and order submission.

mod manager;
mod pairs;

pub use manager::StrategyManager;
pub use pairs::{PairsParams, PairsStrategy};

use crate::service::ServiceError;
use crate::types::Order;
use async_trait::async_trait;
use std::collections::HashMap;

/// A market-data tick delivered to strategies. Prices are in the external
/// floating representation.
#[derive(Debug, Clone)]
pub struct MarketData {
    /// Trading symbol.
    pub symbol: String,
    /// Last trade price.
    pub last_price: f64,
    /// Best bid, when the side is non-empty.
    pub best_bid: Option<f64>,
    /// Best ask, when the side is non-empty.
    pub best_ask: Option<f64>,
    /// Tick timestamp, epoch millis.
    pub timestamp: u64,
}

/// The capability set every strategy implements.
///
/// `on_market_data` must be side-effect-isolated from other strategies: the
/// manager delivers each tick on its own task and strategies keep their
/// state behind interior locks.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable strategy name, used as the registry key.
    fn name(&self) -> &str;

    /// One-time setup before the strategy can be started.
    async fn initialize(&self) -> Result<(), ServiceError>;

    /// Called when the manager starts the strategy.
    async fn start(&self);

    /// Called when the manager stops the strategy.
    async fn stop(&self);

    /// Ingest one market-data tick.
    async fn on_market_data(&self, data: &MarketData);

    /// Observe a state change on one of the strategy's own orders.
    async fn on_order_update(&self, order: &Order);

    /// Current tunable parameters.
    fn parameters(&self) -> HashMap<String, f64>;

    /// Apply new values for the keys present in `params`.
    fn set_parameters(&self, params: HashMap<String, f64>);
}
