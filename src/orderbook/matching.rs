//! The core matching loop.
//!
//! Matching walks the opposite side best-first, consuming resting entries at
//! maker prices until the incoming quantity is exhausted or the price limit
//! stops being crossable. Callers hold the book's write gate for the whole
//! walk, so a call publishes all of its trades or none.

use super::book::OrderBook;
use crate::types::{OrderId, Price, Quantity, Side, Trade, TradeId};
use crate::utils::current_time_millis;
use std::sync::atomic::Ordering;
use tracing::trace;

impl OrderBook {
    /// Match an incoming order against the opposite side.
    ///
    /// `limit` of `None` means a market order: every price is crossable.
    /// Returns the trades in the order resting entries were consumed and the
    /// quantity left unmatched.
    pub(super) fn match_incoming(
        &self,
        taker_id: OrderId,
        taker_side: Side,
        quantity: Quantity,
        limit: Option<Price>,
    ) -> (Vec<Trade>, Quantity) {
        let mut remaining = quantity;
        let mut trades = Vec::new();

        let opposite = match taker_side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        if opposite.is_empty() {
            return (trades, remaining);
        }

        let mut scratch = self.scratch.get();

        // Best-first walk: ascending asks for a buy, descending bids for a
        // sell. The skip lists keep prices sorted already.
        let level_iter: Box<dyn Iterator<Item = _>> = match taker_side {
            Side::Buy => Box::new(opposite.iter()),
            Side::Sell => Box::new(opposite.iter().rev()),
        };

        for entry in level_iter {
            let price = *entry.key();
            if let Some(limit) = limit {
                match taker_side {
                    Side::Buy if price > limit => break,
                    Side::Sell if price < limit => break,
                    _ => {}
                }
            }

            let level = entry.value();
            let fills_start = scratch.fills.len();
            level.match_incoming(&mut remaining, &mut scratch.fills);

            for fill in &scratch.fills[fills_start..] {
                let trade = self.build_trade(
                    taker_id,
                    fill.maker_order_id,
                    taker_side,
                    price,
                    fill.quantity,
                );
                self.last_trade_price.store(price.raw(), Ordering::Relaxed);
                self.has_traded.store(true, Ordering::Relaxed);
                if fill.maker_exhausted {
                    self.order_locations.remove(&fill.maker_order_id);
                    self.side_count(taker_side.opposite())
                        .fetch_sub(1, Ordering::Relaxed);
                }
                trades.push(trade);
            }

            if level.is_empty() {
                scratch.emptied.push(price);
            }
            if remaining.is_zero() {
                break;
            }
        }

        for price in &scratch.emptied {
            opposite.remove(price);
        }
        self.scratch.put(scratch);

        trace!(
            symbol = %self.symbol,
            taker = %taker_id,
            trades = trades.len(),
            remaining = remaining.raw(),
            "matched incoming order"
        );

        (trades, remaining)
    }

    /// How much of `quantity` the opposite side could fill right now, without
    /// mutating the book. Used for fill-or-kill feasibility at admission.
    pub fn peek_match(&self, taker_side: Side, quantity: Quantity, limit: Option<Price>) -> Quantity {
        let opposite = match taker_side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        if opposite.is_empty() {
            return Quantity::ZERO;
        }

        let level_iter: Box<dyn Iterator<Item = _>> = match taker_side {
            Side::Buy => Box::new(opposite.iter()),
            Side::Sell => Box::new(opposite.iter().rev()),
        };

        let mut matched = Quantity::ZERO;
        for entry in level_iter {
            if matched >= quantity {
                break;
            }
            let price = *entry.key();
            if let Some(limit) = limit {
                match taker_side {
                    Side::Buy if price > limit => break,
                    Side::Sell if price < limit => break,
                    _ => {}
                }
            }
            let available = entry.value().total_quantity();
            let needed = quantity.saturating_sub(matched);
            matched = matched.saturating_add(needed.min(available));
        }
        matched
    }

    fn build_trade(
        &self,
        taker_id: OrderId,
        maker_id: OrderId,
        taker_side: Side,
        maker_price: Price,
        quantity: Quantity,
    ) -> Trade {
        let (buy_order_id, sell_order_id) = match taker_side {
            Side::Buy => (taker_id, maker_id),
            Side::Sell => (maker_id, taker_id),
        };
        Trade {
            id: TradeId::new(),
            symbol: self.symbol.clone(),
            price: maker_price,
            quantity,
            buy_order_id,
            sell_order_id,
            taker_side,
            seq: self.trade_seq.fetch_add(1, Ordering::Relaxed),
            timestamp: current_time_millis(),
        }
    }
}
