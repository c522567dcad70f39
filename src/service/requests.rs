//! Typed request records consumed from the transport layer.
//!
//! Prices and quantities arrive in the external floating representation and
//! are converted to fixed point at admission.

use crate::types::{OrderId, OrderKind, OrderStatus, Side, TimeInForce};
use serde::{Deserialize, Serialize};

/// A new-order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Owning user.
    pub user_id: String,
    /// Client-supplied identifier, unique per user when present.
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Trading symbol.
    pub symbol: String,
    /// Buy or Sell.
    pub side: Side,
    /// Order type.
    pub kind: OrderKind,
    /// Limit price, required for Limit/StopLimit.
    #[serde(default)]
    pub price: Option<f64>,
    /// Stop trigger price, required for StopLimit/StopMarket.
    #[serde(default)]
    pub stop_price: Option<f64>,
    /// Order quantity.
    pub quantity: f64,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Expiration timestamp, epoch millis. Required for Day orders.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// A cancel request. Resolves by order id when present, else by
/// (user, client order id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Requesting user; must own the order.
    pub user_id: String,
    /// Order to cancel.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Client id fallback when `order_id` is absent.
    #[serde(default)]
    pub client_order_id: Option<String>,
}

/// An update request. Only fields that are present (and positive, for
/// numerics) are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Requesting user; must own the order.
    pub user_id: String,
    /// Order to update.
    pub order_id: OrderId,
    /// New limit price.
    #[serde(default)]
    pub price: Option<f64>,
    /// New stop price.
    #[serde(default)]
    pub stop_price: Option<f64>,
    /// New quantity.
    #[serde(default)]
    pub quantity: Option<f64>,
    /// New time in force.
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    /// New expiration timestamp, epoch millis.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// Filter for [`crate::service::OrderService::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Restrict to one user. Uses the by-user index.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Restrict to one symbol. Uses the by-symbol index.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Restrict to one side.
    #[serde(default)]
    pub side: Option<Side>,
    /// Restrict to one order type.
    #[serde(default)]
    pub kind: Option<OrderKind>,
    /// Restrict to one status.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Created at or after this timestamp, epoch millis.
    #[serde(default)]
    pub created_after: Option<u64>,
    /// Created at or before this timestamp, epoch millis.
    #[serde(default)]
    pub created_before: Option<u64>,
}
