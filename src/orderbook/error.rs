//! Order book error types.

use crate::types::{OrderId, OrderKind, Quantity, Side};
use thiserror::Error;

/// Errors that can occur within the book or the matching engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrderBookError {
    /// Order violates a book-level invariant. Raised before any mutation.
    #[error("invalid order {id}: {reason}")]
    InvalidOrder {
        /// The offending order.
        id: OrderId,
        /// What was wrong with it.
        reason: String,
    },

    /// Order not found in the book.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Book for the requested symbol does not exist.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Market order found no liquidity on the opposite side.
    #[error("insufficient liquidity for {side} order: requested {requested}, available {available}")]
    InsufficientLiquidity {
        /// Side of the incoming order.
        side: Side,
        /// Quantity requested.
        requested: Quantity,
        /// Quantity available at execution time.
        available: Quantity,
    },

    /// The engine cannot dispatch this order type directly. Stop orders are
    /// held by the lifecycle service until triggered.
    #[error("unsupported order type for engine dispatch: {0}")]
    UnsupportedType(OrderKind),

    /// Error while serializing snapshot data.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot integrity check failed.
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Checksum carried by the package.
        expected: String,
        /// Checksum recomputed from the payload.
        actual: String,
    },

    /// Invariant violation. Should be unreachable.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}
