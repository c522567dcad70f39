//! Order record and its lifecycle enums.

use super::fixed_point::{Price, Quantity};
use super::side::Side;
use super::trade::TradeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique order identifier. Opaque to callers; UUID-backed internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generate a fresh unique identifier.
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OrderId(Uuid::parse_str(s)?))
    }
}

/// Order type. The set is closed; each variant has a dedicated processor in
/// the lifecycle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Rests at the limit price after matching what is crossable.
    Limit,
    /// Matches greedily against the opposite side; never rests.
    Market,
    /// Converts to a limit order once the stop price is crossed.
    StopLimit,
    /// Converts to a market order once the stop price is crossed.
    StopMarket,
}

impl OrderKind {
    /// Whether this kind keeps the order pending in the service until a
    /// trigger condition converts it.
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, OrderKind::StopLimit | OrderKind::StopMarket)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::StopLimit => write!(f, "STOP_LIMIT"),
            OrderKind::StopMarket => write!(f, "STOP_MARKET"),
        }
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limit" => Ok(OrderKind::Limit),
            "market" => Ok(OrderKind::Market),
            "stop_limit" | "stoplimit" => Ok(OrderKind::StopLimit),
            "stop_market" | "stopmarket" => Ok(OrderKind::StopMarket),
            other => Err(format!("unrecognized order type: {other}")),
        }
    }
}

/// Order status. Terminal statuses are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created, not yet admitted into the engine.
    New,
    /// Admitted and live (resting, or waiting on a stop trigger).
    Pending,
    /// Some quantity filled, some remaining.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Canceled by the owner.
    Canceled,
    /// Failed validation after admission.
    Rejected,
    /// Expired by the sweeper.
    Expired,
}

impl OrderStatus {
    /// Terminal statuses retain the order in the indices for audit but the
    /// order is gone from the book.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Canceled => write!(f, "CANCELED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Time-in-force lifespan qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Rests indefinitely.
    Gtc,
    /// Executes immediately; the remainder is canceled at admission.
    Ioc,
    /// Fully fills at admission or is canceled.
    Fok,
    /// Cancels at the order's expiration timestamp.
    Day,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Day => write!(f, "DAY"),
        }
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gtc" => Ok(TimeInForce::Gtc),
            "ioc" => Ok(TimeInForce::Ioc),
            "fok" => Ok(TimeInForce::Fok),
            "day" => Ok(TimeInForce::Day),
            other => Err(format!("unrecognized time in force: {other}")),
        }
    }
}

/// A full order record.
///
/// The record is owned by the lifecycle service's primary index; the book
/// holds only the order id inside its entries and resolves the record on
/// demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier assigned at admission.
    pub id: OrderId,
    /// Owning user.
    pub user_id: String,
    /// Client-supplied identifier, unique per user when present.
    pub client_order_id: Option<String>,
    /// Trading symbol.
    pub symbol: String,
    /// Buy or Sell.
    pub side: Side,
    /// Order type.
    pub kind: OrderKind,
    /// Limit price. Required for Limit/StopLimit, ignored for Market.
    pub price: Option<Price>,
    /// Stop trigger price. Required for StopLimit/StopMarket.
    pub stop_price: Option<Price>,
    /// Original quantity, always positive.
    pub quantity: Quantity,
    /// Filled quantity, in `[0, quantity]`.
    pub filled: Quantity,
    /// Current status.
    pub status: OrderStatus,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Creation timestamp, epoch millis.
    pub created_at: u64,
    /// Last update timestamp, epoch millis.
    pub updated_at: u64,
    /// Expiration timestamp, epoch millis. Required for Day orders.
    pub expires_at: Option<u64>,
    /// Trades this order participated in, oldest first.
    pub trades: Vec<TradeId>,
}

impl Order {
    /// Quantity still open.
    #[inline]
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled)
    }

    /// Whether the order can still rest or fill.
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
