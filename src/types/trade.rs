//! Trade record produced by the matching engine.

use super::fixed_point::{Price, Quantity};
use super::order::OrderId;
use super::side::Side;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique trade identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(Uuid);

impl TradeId {
    /// Generate a fresh unique identifier.
    pub fn new() -> Self {
        TradeId(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An execution between a resting maker and an incoming taker.
///
/// The price is always the maker's price. `seq` is monotonic within a book
/// and orders trades of the same symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier.
    pub id: TradeId,
    /// Trading symbol.
    pub symbol: String,
    /// Execution price (maker price).
    pub price: Price,
    /// Executed quantity, always positive.
    pub quantity: Quantity,
    /// The buy-side order.
    pub buy_order_id: OrderId,
    /// The sell-side order.
    pub sell_order_id: OrderId,
    /// Which side was the aggressor.
    pub taker_side: Side,
    /// Per-book monotonic sequence number.
    pub seq: u64,
    /// Execution timestamp, epoch millis.
    pub timestamp: u64,
}

impl Trade {
    /// The maker (resting) order id.
    #[inline]
    pub fn maker_order_id(&self) -> OrderId {
        match self.taker_side {
            Side::Buy => self.sell_order_id,
            Side::Sell => self.buy_order_id,
        }
    }

    /// The taker (incoming) order id.
    #[inline]
    pub fn taker_order_id(&self) -> OrderId {
        match self.taker_side {
            Side::Buy => self.buy_order_id,
            Side::Sell => self.sell_order_id,
        }
    }
}
