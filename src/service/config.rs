//! Service configuration. A value struct injected at construction.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do with the unmatched remainder of a market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarketResidualPolicy {
    /// Strict fill: a market order that cannot fill at all is rejected with
    /// an insufficient-liquidity error.
    #[default]
    Reject,
    /// The unmatched remainder is canceled and the reason recorded.
    Cancel,
}

/// Configuration recognized by the matching core.
///
/// Every field has a default; deployments override what they need and pass
/// the struct to [`crate::service::OrderService`] at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Maximum notional value (`price * quantity`) per order, external units.
    pub max_order_value: f64,

    /// Maximum orders a user may create per UTC day.
    pub max_daily_orders: u32,

    /// When set, only these symbols are accepted.
    pub allowed_symbols: Option<HashSet<String>>,

    /// Start of the trading window, wall clock UTC. Always open when unset.
    pub trading_hours_start: Option<NaiveTime>,

    /// End of the trading window, wall clock UTC.
    pub trading_hours_end: Option<NaiveTime>,

    /// Maximum absolute net position per user and symbol, external units.
    pub max_position_size: f64,

    /// Maximum `notional / account_equity` per order.
    pub max_leverage: f64,

    /// Account equity used by the leverage proxy.
    pub account_equity: f64,

    /// Maximum simultaneous open orders per user.
    pub max_orders_per_user: usize,

    /// Capacity of the batch admission channel.
    pub batch_channel_size: usize,

    /// Cached order lookups live this long, seconds.
    pub cache_ttl_secs: u64,

    /// Cache sweep cadence, seconds.
    pub cache_sweep_secs: u64,

    /// Expiry sweeper cadence, seconds.
    pub expiry_scan_interval_secs: u64,

    /// Use the relaxed lock-free level queues in new books. Time priority
    /// within equal prices is relaxed when enabled.
    pub lock_free_fast_path_enabled: bool,

    /// Residual handling for market orders.
    pub market_residual_policy: MarketResidualPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_order_value: 10_000_000.0,
            max_daily_orders: 100_000,
            allowed_symbols: None,
            trading_hours_start: None,
            trading_hours_end: None,
            max_position_size: 1_000_000.0,
            max_leverage: 100.0,
            account_equity: 1_000_000.0,
            max_orders_per_user: 1_000,
            batch_channel_size: 1_000,
            cache_ttl_secs: 300,
            cache_sweep_secs: 600,
            expiry_scan_interval_secs: 60,
            lock_free_fast_path_enabled: false,
            market_residual_policy: MarketResidualPolicy::Reject,
        }
    }
}
