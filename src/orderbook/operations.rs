//! Book operations: inserting, canceling, resting.

use super::book::OrderBook;
use super::error::OrderBookError;
use super::level::BookEntry;
use crate::types::{Order, OrderId, OrderKind, Price, Quantity, Side, Trade};
use std::sync::atomic::Ordering;
use tracing::trace;

impl OrderBook {
    /// Insert a limit order.
    ///
    /// Matches against the opposite side at price-time priority; any
    /// remainder rests on the order's own side at the limit price. Returns
    /// the trades in consumption order, possibly empty.
    ///
    /// # Errors
    /// [`OrderBookError::InvalidOrder`] when the quantity is zero or the
    /// limit price is missing or zero. Raised before any mutation.
    pub fn insert_limit(&self, order: &Order) -> Result<Vec<Trade>, OrderBookError> {
        let price = match order.price {
            Some(px) if !px.is_zero() => px,
            _ => {
                return Err(OrderBookError::InvalidOrder {
                    id: order.id,
                    reason: "limit order requires a positive price".to_string(),
                });
            }
        };
        let quantity = order.remaining();
        if quantity.is_zero() {
            return Err(OrderBookError::InvalidOrder {
                id: order.id,
                reason: "quantity must be positive".to_string(),
            });
        }

        let _gate = self.write_gate.lock();
        let (trades, remaining) = self.match_incoming(order.id, order.side, quantity, Some(price));

        if !remaining.is_zero() {
            self.rest(order.id, order.side, price, remaining);
        }
        drop(_gate);

        self.notify_trades(&trades);
        Ok(trades)
    }

    /// Insert a market order.
    ///
    /// Matches greedily against the opposite side until the incoming
    /// quantity is exhausted or the side is empty. Never rests; the caller
    /// applies its residual policy to any unmatched remainder.
    ///
    /// # Errors
    /// [`OrderBookError::InvalidOrder`] when the quantity is zero.
    pub fn insert_market(&self, order: &Order) -> Result<Vec<Trade>, OrderBookError> {
        let quantity = order.remaining();
        if quantity.is_zero() {
            return Err(OrderBookError::InvalidOrder {
                id: order.id,
                reason: "quantity must be positive".to_string(),
            });
        }

        let _gate = self.write_gate.lock();
        let (trades, _remaining) = self.match_incoming(order.id, order.side, quantity, None);
        drop(_gate);

        self.notify_trades(&trades);
        Ok(trades)
    }

    /// Dispatch by order kind. Stop kinds never reach the book.
    ///
    /// # Errors
    /// [`OrderBookError::UnsupportedType`] for stop kinds.
    pub fn insert(&self, order: &Order) -> Result<Vec<Trade>, OrderBookError> {
        match order.kind {
            OrderKind::Limit => self.insert_limit(order),
            OrderKind::Market => self.insert_market(order),
            kind => Err(OrderBookError::UnsupportedType(kind)),
        }
    }

    /// Remove a resting order. Idempotent: returns `false` when the id is
    /// not resting in this book.
    pub fn cancel(&self, order_id: &OrderId) -> bool {
        let _gate = self.write_gate.lock();
        let Some((_, (price, side))) = self.order_locations.remove(order_id) else {
            return false;
        };
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let Some(entry) = levels.get(&price) else {
            return false;
        };
        let removed = entry.value().remove(order_id).is_some();
        if removed {
            self.side_count(side).fetch_sub(1, Ordering::Relaxed);
            if entry.value().is_empty() {
                levels.remove(&price);
            }
            trace!(symbol = %self.symbol, order = %order_id, "canceled resting order");
        }
        removed
    }

    /// Rest a remainder as a new entry with the next arrival sequence.
    fn rest(&self, order_id: OrderId, side: Side, price: Price, remaining: Quantity) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let level = self.level_for(side, price);
        level.add(BookEntry {
            order_id,
            price,
            remaining,
            seq,
        });
        self.order_locations.insert(order_id, (price, side));
        self.side_count(side).fetch_add(1, Ordering::Relaxed);
        trace!(
            symbol = %self.symbol,
            order = %order_id,
            %side,
            %price,
            qty = remaining.raw(),
            seq,
            "rested order"
        );
    }
}
