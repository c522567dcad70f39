//! Lifecycle service error surface.

use crate::orderbook::OrderBookError;
use crate::types::{OrderStatus, Quantity};
use thiserror::Error;

/// Errors surfaced to admission-API callers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// Missing or malformed request fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Semantic order invariant violated.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// The order type cannot be processed.
    #[error("unsupported order type: {0}")]
    UnsupportedType(String),

    /// Order (or symbol) not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not the owner of the order.
    #[error("unauthorized: caller does not own this order")]
    Unauthorized,

    /// The order is in a terminal state.
    #[error("order is not cancellable from status {status}")]
    NotCancellable {
        /// Status at the time of the attempt.
        status: OrderStatus,
    },

    /// Per-user open-order cap reached.
    #[error("maximum open orders exceeded: limit {limit}")]
    MaxOrdersExceeded {
        /// The configured cap.
        limit: usize,
    },

    /// Order value, symbol allow-list, trading hours or daily cap violated.
    #[error("business rule violated: {0}")]
    BusinessRuleViolated(String),

    /// Position or leverage limit violated.
    #[error("risk limit exceeded: {0}")]
    RiskLimitExceeded(String),

    /// The (user, client order id) pair is already taken.
    #[error("duplicate order: client id {client_order_id} already used by {user_id}")]
    DuplicateOrder {
        /// Owning user.
        user_id: String,
        /// The colliding client id.
        client_order_id: String,
    },

    /// Market order exhausted the book with residual quantity.
    #[error("insufficient liquidity: requested {requested}, filled {filled}")]
    InsufficientLiquidity {
        /// Quantity requested.
        requested: Quantity,
        /// Quantity actually filled.
        filled: Quantity,
    },

    /// Invariant violation. Should be unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OrderBookError> for ServiceError {
    fn from(err: OrderBookError) -> Self {
        match err {
            OrderBookError::InvalidOrder { reason, .. } => ServiceError::InvalidOrder(reason),
            OrderBookError::OrderNotFound(id) => ServiceError::NotFound(id.to_string()),
            OrderBookError::UnknownSymbol(symbol) => ServiceError::NotFound(symbol),
            OrderBookError::InsufficientLiquidity {
                requested,
                available,
                ..
            } => ServiceError::InsufficientLiquidity {
                requested,
                filled: available,
            },
            OrderBookError::UnsupportedType(kind) => ServiceError::UnsupportedType(kind.to_string()),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
