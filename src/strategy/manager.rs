//! Strategy registry and concurrent market-data dispatch.

use super::{MarketData, Strategy};
use crate::service::ServiceError;
use crate::types::Order;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

struct StrategyHandle {
    strategy: Arc<dyn Strategy>,
    running: Arc<AtomicBool>,
}

/// Registers strategies and fans market data out to the running ones, one
/// task per delivery per strategy.
pub struct StrategyManager {
    strategies: DashMap<String, StrategyHandle>,
}

impl StrategyManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            strategies: DashMap::new(),
        }
    }

    /// Initialize and register a strategy under its name. Replaces any
    /// previous registration with that name.
    pub async fn register(&self, strategy: Arc<dyn Strategy>) -> Result<(), ServiceError> {
        strategy.initialize().await?;
        let name = strategy.name().to_string();
        self.strategies.insert(
            name.clone(),
            StrategyHandle {
                strategy,
                running: Arc::new(AtomicBool::new(false)),
            },
        );
        info!(%name, "strategy registered");
        Ok(())
    }

    /// Start a registered strategy.
    pub async fn start(&self, name: &str) -> Result<(), ServiceError> {
        let handle = self
            .strategies
            .get(name)
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;
        let strategy = handle.strategy.clone();
        let running = handle.running.clone();
        drop(handle);

        strategy.start().await;
        running.store(true, Ordering::Release);
        info!(%name, "strategy started");
        Ok(())
    }

    /// Stop a running strategy. Idempotent.
    pub async fn stop(&self, name: &str) -> Result<(), ServiceError> {
        let handle = self
            .strategies
            .get(name)
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;
        let strategy = handle.strategy.clone();
        let running = handle.running.clone();
        drop(handle);

        running.store(false, Ordering::Release);
        strategy.stop().await;
        info!(%name, "strategy stopped");
        Ok(())
    }

    /// Whether a strategy is currently running.
    pub fn is_running(&self, name: &str) -> bool {
        self.strategies
            .get(name)
            .is_some_and(|handle| handle.running.load(Ordering::Acquire))
    }

    /// Names of all registered strategies.
    pub fn names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of running strategies.
    pub fn running_count(&self) -> usize {
        self.strategies
            .iter()
            .filter(|entry| entry.running.load(Ordering::Acquire))
            .count()
    }

    /// Deliver one tick to every running strategy, each on its own task.
    pub fn dispatch_market_data(&self, data: MarketData) {
        for entry in self.strategies.iter() {
            if !entry.running.load(Ordering::Acquire) {
                continue;
            }
            let strategy = entry.strategy.clone();
            let tick = data.clone();
            tokio::spawn(async move {
                strategy.on_market_data(&tick).await;
            });
        }
        debug!(symbol = %data.symbol, "market data dispatched");
    }

    /// Deliver an order update to every running strategy.
    pub fn dispatch_order_update(&self, order: Order) {
        for entry in self.strategies.iter() {
            if !entry.running.load(Ordering::Acquire) {
                continue;
            }
            let strategy = entry.strategy.clone();
            let update = order.clone();
            tokio::spawn(async move {
                strategy.on_order_update(&update).await;
            });
        }
    }

    /// Remove a strategy from the registry, stopping it first when running.
    pub async fn unregister(&self, name: &str) -> Result<(), ServiceError> {
        if self.is_running(name) {
            self.stop(name).await?;
        }
        if self.strategies.remove(name).is_none() {
            warn!(%name, "unregister of unknown strategy");
            return Err(ServiceError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

impl Default for StrategyManager {
    fn default() -> Self {
        Self::new()
    }
}
