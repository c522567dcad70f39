//! Multi-book matching engine: routes orders by symbol, tracks latency.

mod stats;

pub use stats::{EngineMetrics, EngineStats};

use crate::orderbook::{BookSnapshot, MAX_DEPTH_LEVELS, OrderBook, OrderBookError, TradeListener};
use crate::types::{Order, OrderId, Trade};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Single-order latency above which a warning is emitted, nanoseconds.
pub const LATENCY_WARN_THRESHOLD_NS: u64 = 100_000;

/// Dispatches incoming orders to per-symbol books and aggregates metrics.
///
/// The symbol registry is a concurrent map; lookups on the hot path take no
/// locks, and racing creations of the same book resolve to a single install.
/// Books are never evicted. Mutations within one book are serialized by that
/// book; there is no cross-book serialization.
pub struct MatchingEngine {
    books: DashMap<String, Arc<OrderBook>>,
    stats: EngineStats,
    relaxed_levels: bool,
    trade_listener: Option<TradeListener>,
}

impl MatchingEngine {
    /// Create an engine with default (strict price-time) books.
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            stats: EngineStats::new(),
            relaxed_levels: false,
            trade_listener: None,
        }
    }

    /// Create an engine whose books use the relaxed lock-free level queues.
    pub fn with_relaxed_levels() -> Self {
        let mut engine = Self::new();
        engine.relaxed_levels = true;
        engine
    }

    /// Attach a listener invoked for every trade any book produces. Applies
    /// to books created after the call.
    pub fn set_trade_listener(&mut self, listener: TradeListener) {
        self.trade_listener = Some(listener);
    }

    /// Process one order: acquire or create the book for its symbol, match,
    /// and update counters.
    ///
    /// # Errors
    /// [`OrderBookError::UnsupportedType`] for stop kinds (the lifecycle
    /// service converts them before dispatch) and [`OrderBookError::InvalidOrder`]
    /// for book-level invariant violations.
    pub fn process(&self, order: &Order) -> Result<Vec<Trade>, OrderBookError> {
        let start = Instant::now();
        let book = self.book_for(&order.symbol);
        let result = book.insert(order);
        let elapsed_ns = start.elapsed().as_nanos() as u64;

        let trade_count = result.as_ref().map(|trades| trades.len()).unwrap_or(0);
        self.stats.record(elapsed_ns, trade_count);

        if elapsed_ns > LATENCY_WARN_THRESHOLD_NS {
            warn!(
                symbol = %order.symbol,
                order = %order.id,
                latency_ns = elapsed_ns,
                "order processing exceeded latency threshold"
            );
        }

        result
    }

    /// Cancel a resting order in the given symbol's book.
    ///
    /// # Errors
    /// [`OrderBookError::UnknownSymbol`] when no book exists for the symbol,
    /// [`OrderBookError::OrderNotFound`] when the order is not resting.
    pub fn cancel(&self, order_id: &OrderId, symbol: &str) -> Result<(), OrderBookError> {
        let book = self
            .books
            .get(symbol)
            .ok_or_else(|| OrderBookError::UnknownSymbol(symbol.to_string()))?;
        if book.cancel(order_id) {
            Ok(())
        } else {
            Err(OrderBookError::OrderNotFound(*order_id))
        }
    }

    /// Point-in-time snapshot of a symbol's book: top depth plus last trade.
    pub fn snapshot(&self, symbol: &str) -> Option<BookSnapshot> {
        self.books
            .get(symbol)
            .map(|book| book.snapshot(MAX_DEPTH_LEVELS))
    }

    /// Consistent snapshot of the engine counters.
    pub fn metrics(&self) -> EngineMetrics {
        self.stats.snapshot()
    }

    /// The book for a symbol, if one has been created.
    pub fn book(&self, symbol: &str) -> Option<Arc<OrderBook>> {
        self.books.get(symbol).map(|entry| entry.value().clone())
    }

    /// Symbols with live books.
    pub fn symbols(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    fn book_for(&self, symbol: &str) -> Arc<OrderBook> {
        if let Some(book) = self.books.get(symbol) {
            return book.value().clone();
        }
        self.books
            .entry(symbol.to_string())
            .or_insert_with(|| {
                debug!(%symbol, "creating order book");
                let mut book = if self.relaxed_levels {
                    OrderBook::with_relaxed_levels(symbol)
                } else {
                    OrderBook::new(symbol)
                };
                book.trade_listener = self.trade_listener.clone();
                Arc::new(book)
            })
            .value()
            .clone()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderKind, OrderStatus, Price, Quantity, Side, TimeInForce};
    use crate::utils::current_time_millis;

    fn order(symbol: &str, side: Side, kind: OrderKind, price: f64, qty: f64) -> Order {
        let now = current_time_millis();
        Order {
            id: OrderId::new(),
            user_id: "trader-1".to_string(),
            client_order_id: None,
            symbol: symbol.to_string(),
            side,
            kind,
            price: (price > 0.0).then(|| Price::from_f64(price)),
            stop_price: None,
            quantity: Quantity::from_f64(qty),
            filled: Quantity::ZERO,
            status: OrderStatus::New,
            time_in_force: TimeInForce::Gtc,
            created_at: now,
            updated_at: now,
            expires_at: None,
            trades: Vec::new(),
        }
    }

    #[test]
    fn test_process_creates_book_on_demand() {
        let engine = MatchingEngine::new();
        assert!(engine.book("ETH-USD").is_none());
        engine
            .process(&order("ETH-USD", Side::Buy, OrderKind::Limit, 100.0, 1.0))
            .unwrap();
        assert!(engine.book("ETH-USD").is_some());
        assert_eq!(engine.symbols(), vec!["ETH-USD".to_string()]);
    }

    #[test]
    fn test_process_routes_by_symbol() {
        let engine = MatchingEngine::new();
        engine
            .process(&order("AAA", Side::Sell, OrderKind::Limit, 10.0, 1.0))
            .unwrap();
        engine
            .process(&order("BBB", Side::Buy, OrderKind::Limit, 10.0, 1.0))
            .unwrap();

        // Same price, different symbols: no cross.
        assert_eq!(engine.book("AAA").unwrap().best_ask(), Some(Price::from_f64(10.0)));
        assert_eq!(engine.book("BBB").unwrap().best_bid(), Some(Price::from_f64(10.0)));
    }

    #[test]
    fn test_stop_kinds_are_rejected() {
        let engine = MatchingEngine::new();
        let mut stop = order("AAA", Side::Buy, OrderKind::StopMarket, 0.0, 1.0);
        stop.stop_price = Some(Price::from_f64(105.0));
        assert!(matches!(
            engine.process(&stop),
            Err(OrderBookError::UnsupportedType(OrderKind::StopMarket))
        ));
    }

    #[test]
    fn test_metrics_accumulate() {
        let engine = MatchingEngine::new();
        engine
            .process(&order("AAA", Side::Sell, OrderKind::Limit, 10.0, 5.0))
            .unwrap();
        engine
            .process(&order("AAA", Side::Buy, OrderKind::Limit, 10.0, 5.0))
            .unwrap();

        let metrics = engine.metrics();
        assert_eq!(metrics.total_orders, 2);
        assert_eq!(metrics.total_trades, 1);
        assert!(metrics.max_latency_ns >= metrics.avg_latency_ns);
    }

    #[test]
    fn test_cancel_forwards_to_book() {
        let engine = MatchingEngine::new();
        let resting = order("AAA", Side::Buy, OrderKind::Limit, 10.0, 1.0);
        engine.process(&resting).unwrap();

        assert!(engine.cancel(&resting.id, "AAA").is_ok());
        assert!(matches!(
            engine.cancel(&resting.id, "AAA"),
            Err(OrderBookError::OrderNotFound(_))
        ));
        assert!(matches!(
            engine.cancel(&resting.id, "ZZZ"),
            Err(OrderBookError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_snapshot_caps_depth() {
        let engine = MatchingEngine::new();
        for i in 0..15 {
            engine
                .process(&order("AAA", Side::Buy, OrderKind::Limit, 50.0 + i as f64, 1.0))
                .unwrap();
        }
        let snap = engine.snapshot("AAA").unwrap();
        assert_eq!(snap.bids.len(), MAX_DEPTH_LEVELS);
        assert!(engine.snapshot("ZZZ").is_none());
    }

    #[test]
    fn test_concurrent_submissions_on_distinct_symbols() {
        use std::sync::Arc;

        let engine = Arc::new(MatchingEngine::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let symbol = format!("SYM-{i}");
                    for j in 0..100 {
                        let side = if j % 2 == 0 { Side::Sell } else { Side::Buy };
                        engine
                            .process(&order(&symbol, side, OrderKind::Limit, 100.0, 1.0))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.metrics().total_orders, 400);
        assert_eq!(engine.symbols().len(), 4);
    }
}
