//! Property tests for the universal invariants of the book.

use proptest::prelude::*;
use tradecore_rs::current_time_millis;
use tradecore_rs::{
    Order, OrderBook, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, TimeInForce,
};

fn order(side: Side, kind: OrderKind, price_raw: u64, qty_raw: u64) -> Order {
    let now = current_time_millis();
    Order {
        id: OrderId::new(),
        user_id: "prop-user".to_string(),
        client_order_id: None,
        symbol: "PROP".to_string(),
        side,
        kind,
        price: (price_raw > 0).then(|| Price::from_raw(price_raw)),
        stop_price: None,
        quantity: Quantity::from_raw(qty_raw),
        filled: Quantity::ZERO,
        status: OrderStatus::New,
        time_in_force: TimeInForce::Gtc,
        created_at: now,
        updated_at: now,
        expires_at: None,
        trades: Vec::new(),
    }
}

/// One randomly generated limit order: (is_buy, price ticks, quantity).
fn arb_limit() -> impl Strategy<Value = (bool, u64, u64)> {
    (any::<bool>(), 90u64..=110, 1u64..=50)
}

proptest! {
    /// Quantity is conserved: the sum of trade quantities never exceeds
    /// either side's submitted quantity, resting quantity plus executed
    /// quantity equals submitted quantity, and every trade has a positive
    /// quantity at a crossable price.
    #[test]
    fn prop_conservation_of_quantity(orders in proptest::collection::vec(arb_limit(), 1..60)) {
        let book = OrderBook::new("PROP");
        let mut submitted_total: u64 = 0;
        let mut traded_total: u64 = 0;

        for (is_buy, price, qty) in orders {
            let side = if is_buy { Side::Buy } else { Side::Sell };
            let incoming = order(side, OrderKind::Limit, price, qty);
            submitted_total += qty;

            let trades = book.insert_limit(&incoming).unwrap();
            let executed: u64 = trades.iter().map(|t| t.quantity.raw()).sum();
            prop_assert!(executed <= qty);
            traded_total += executed;

            for trade in &trades {
                prop_assert!(trade.quantity.raw() > 0);
                prop_assert_eq!(trade.taker_side, side);
            }
        }

        // Trades consume from both sides, so double-counting the executed
        // quantity can never exceed the total submitted.
        let resting = book.total_quantity(Side::Buy).raw() + book.total_quantity(Side::Sell).raw();
        prop_assert_eq!(resting + 2 * traded_total, submitted_total);
    }

    /// A crossable incoming order always consumes the better-priced (or
    /// earlier, at equal price) resting entry first.
    #[test]
    fn prop_price_priority(prices in proptest::collection::vec(90u64..=110, 2..20)) {
        let book = OrderBook::new("PROP");
        for price in &prices {
            book.insert_limit(&order(Side::Sell, OrderKind::Limit, *price, 1)).unwrap();
        }

        let total = prices.len() as u64;
        let taker = order(Side::Buy, OrderKind::Market, 0, total);
        let trades = book.insert_market(&taker).unwrap();

        prop_assert_eq!(trades.len(), prices.len());
        let mut sorted = prices.clone();
        sorted.sort_unstable();
        for (trade, expected) in trades.iter().zip(sorted) {
            prop_assert_eq!(trade.price.raw(), expected);
        }
    }

    /// Inserting then canceling an order leaves best bid, best ask and
    /// spread unchanged.
    #[test]
    fn prop_best_price_idempotence(
        setup in proptest::collection::vec(arb_limit(), 0..20),
        probe_buy in any::<bool>(),
        probe_qty in 1u64..=50,
    ) {
        let book = OrderBook::new("PROP");
        for (is_buy, price, qty) in setup {
            let side = if is_buy { Side::Buy } else { Side::Sell };
            book.insert_limit(&order(side, OrderKind::Limit, price, qty)).unwrap();
        }

        let bid_before = book.best_bid();
        let ask_before = book.best_ask();
        let spread_before = book.spread();

        // A non-crossing probe: strictly below every bid for a buy probe,
        // strictly above every ask for a sell probe.
        let probe = if probe_buy {
            order(Side::Buy, OrderKind::Limit, 1, probe_qty)
        } else {
            order(Side::Sell, OrderKind::Limit, 1_000, probe_qty)
        };
        let trades = book.insert_limit(&probe).unwrap();
        prop_assert!(trades.is_empty());
        prop_assert!(book.cancel(&probe.id));

        prop_assert_eq!(book.best_bid(), bid_before);
        prop_assert_eq!(book.best_ask(), ask_before);
        prop_assert_eq!(book.spread(), spread_before);
    }

    /// Trade sequence numbers are strictly increasing within a book.
    #[test]
    fn prop_monotonic_trade_sequence(orders in proptest::collection::vec(arb_limit(), 1..60)) {
        let book = OrderBook::new("PROP");
        let mut last_seq = 0u64;

        for (is_buy, price, qty) in orders {
            let side = if is_buy { Side::Buy } else { Side::Sell };
            let trades = book.insert_limit(&order(side, OrderKind::Limit, price, qty)).unwrap();
            for trade in trades {
                prop_assert!(trade.seq > last_seq);
                last_seq = trade.seq;
            }
        }
    }
}

#[test]
fn prop_probe_never_crosses_sanity() {
    // The idempotence probe prices sit outside the generated 90..=110 band.
    let book = OrderBook::new("PROP");
    book.insert_limit(&order(Side::Buy, OrderKind::Limit, 90, 5)).unwrap();
    book.insert_limit(&order(Side::Sell, OrderKind::Limit, 110, 5)).unwrap();

    let low_buy = order(Side::Buy, OrderKind::Limit, 1, 1);
    assert!(book.insert_limit(&low_buy).unwrap().is_empty());
    let high_sell = order(Side::Sell, OrderKind::Limit, 1_000, 1);
    assert!(book.insert_limit(&high_sell).unwrap().is_empty());
}
