//! Core price-time priority order book for a single symbol.

use super::level::PriceLevel;
use super::pool::{FreeList, MatchScratch};
use super::snapshot::{BookSnapshot, DepthLevel, LastTrade};
use crate::types::{OrderId, Price, Side, Trade};
use crate::utils::current_time_millis;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Listener invoked for every trade the book produces.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;

/// Idle matching scratch sets retained per book. Mutations are serialized
/// by the write gate, so one warm set is the common case; a little headroom
/// covers gate handover.
const MATCH_SCRATCH_IDLE: usize = 4;

/// A per-symbol order book with price-time priority.
///
/// Both sides are concurrent ordered maps (skip lists) keyed by price, each
/// price holding a FIFO level of resting entries. A location map keyed by
/// order id supports cancellation without scanning levels. Best-price and
/// depth queries are lock-free reads; mutations (insert, match, cancel) are
/// serialized by an internal write gate so a matching call publishes either
/// all of its trades or none.
pub struct OrderBook {
    /// The symbol this book trades.
    pub(super) symbol: String,

    /// Bid side, ascending by price; best bid is the back entry.
    pub(super) bids: SkipMap<Price, Arc<PriceLevel>>,

    /// Ask side, ascending by price; best ask is the front entry.
    pub(super) asks: SkipMap<Price, Arc<PriceLevel>>,

    /// Order id to (price, side), for cancellation.
    pub(super) order_locations: DashMap<OrderId, (Price, Side)>,

    /// Arrival sequence for resting entries. Monotonic per book.
    pub(super) next_seq: AtomicU64,

    /// Trade sequence. Monotonic per book.
    pub(super) trade_seq: AtomicU64,

    /// Raw price of the last trade. Meaningful only once `has_traded` is set.
    pub(super) last_trade_price: AtomicU64,

    /// Whether any trade has occurred.
    pub(super) has_traded: AtomicBool,

    /// Live resting order count per side.
    pub(super) bid_order_count: AtomicU64,
    pub(super) ask_order_count: AtomicU64,

    /// New levels use the relaxed lock-free arrival queue when set.
    pub(super) relaxed_levels: bool,

    /// Serializes mutations. Queries never take it.
    pub(super) write_gate: Mutex<()>,

    /// Recycled scratch buffers for the matching walk.
    pub(super) scratch: FreeList<MatchScratch>,

    /// Invoked once per trade, after the matching call completes.
    pub trade_listener: Option<TradeListener>,
}

impl OrderBook {
    /// Create a new book for the given symbol.
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            order_locations: DashMap::new(),
            next_seq: AtomicU64::new(1),
            trade_seq: AtomicU64::new(1),
            last_trade_price: AtomicU64::new(0),
            has_traded: AtomicBool::new(false),
            bid_order_count: AtomicU64::new(0),
            ask_order_count: AtomicU64::new(0),
            relaxed_levels: false,
            write_gate: Mutex::new(()),
            scratch: FreeList::new(MATCH_SCRATCH_IDLE),
            trade_listener: None,
        }
    }

    /// Create a new book with a trade listener attached.
    pub fn with_trade_listener(symbol: &str, listener: TradeListener) -> Self {
        let mut book = Self::new(symbol);
        book.trade_listener = Some(listener);
        book
    }

    /// Create a new book with the relaxed lock-free level queues enabled.
    ///
    /// Time priority within equal prices is relaxed on this path; price
    /// priority across levels is unaffected.
    pub fn with_relaxed_levels(symbol: &str) -> Self {
        let mut book = Self::new(symbol);
        book.relaxed_levels = true;
        book
    }

    /// The symbol this book trades.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Highest bid price, if any.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.back().map(|entry| *entry.key())
    }

    /// Lowest ask price, if any.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.front().map(|entry| *entry.key())
    }

    /// `best_ask - best_bid`. Absent when either side is empty.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Midpoint of best bid and best ask. Absent when either side is empty.
    pub fn mid(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(bid.midpoint(ask)),
            _ => None,
        }
    }

    /// Price of the last trade, if any trade has occurred.
    pub fn last_trade_price(&self) -> Option<Price> {
        if self.has_traded.load(Ordering::Relaxed) {
            Some(Price::from_raw(self.last_trade_price.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    /// Live resting order count on one side.
    pub fn order_count(&self, side: Side) -> u64 {
        match side {
            Side::Buy => self.bid_order_count.load(Ordering::Relaxed),
            Side::Sell => self.ask_order_count.load(Ordering::Relaxed),
        }
    }

    /// Whether the order currently rests in this book.
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.order_locations.contains_key(order_id)
    }

    /// Total resting quantity on one side, across all levels.
    pub fn total_quantity(&self, side: Side) -> crate::types::Quantity {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let mut total = crate::types::Quantity::ZERO;
        for entry in levels.iter() {
            total = total.saturating_add(entry.value().total_quantity());
        }
        total
    }

    /// Aggregate the top `k` levels per side, best-first.
    ///
    /// Each level reports its price, total resting quantity and live order
    /// count. Levels emptied by cancellation tombstones are skipped.
    pub fn depth(&self, k: usize) -> (Vec<DepthLevel>, Vec<DepthLevel>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .filter(|e| !e.value().is_empty())
            .take(k)
            .map(|e| DepthLevel {
                price: *e.key(),
                total_quantity: e.value().total_quantity(),
                order_count: e.value().order_count(),
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .filter(|e| !e.value().is_empty())
            .take(k)
            .map(|e| DepthLevel {
                price: *e.key(),
                total_quantity: e.value().total_quantity(),
                order_count: e.value().order_count(),
            })
            .collect();
        (bids, asks)
    }

    /// Point-in-time snapshot with at most `k` levels per side.
    pub fn snapshot(&self, k: usize) -> BookSnapshot {
        let (bids, asks) = self.depth(k);
        let last_trade = self.last_trade_price().map(|price| LastTrade {
            price,
            seq: self.trade_seq.load(Ordering::Relaxed).saturating_sub(1),
        });
        BookSnapshot {
            symbol: self.symbol.clone(),
            timestamp: current_time_millis(),
            bids,
            asks,
            last_trade,
        }
    }

    /// Get or create the level for `price` on `side`.
    pub(super) fn level_for(&self, side: Side, price: Price) -> Arc<PriceLevel> {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels
            .get_or_insert(price, Arc::new(PriceLevel::new(price, self.relaxed_levels)))
            .value()
            .clone()
    }

    pub(super) fn side_count(&self, side: Side) -> &AtomicU64 {
        match side {
            Side::Buy => &self.bid_order_count,
            Side::Sell => &self.ask_order_count,
        }
    }

    pub(super) fn notify_trades(&self, trades: &[Trade]) {
        if let Some(listener) = &self.trade_listener {
            for trade in trades {
                listener(trade);
            }
        }
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("symbol", &self.symbol)
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("resting_orders", &self.order_locations.len())
            .finish()
    }
}
