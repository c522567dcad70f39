//! Concurrency tests: arbitrary interleavings must preserve book invariants.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tradecore_rs::current_time_millis;
use tradecore_rs::prelude::*;

fn order(symbol: &str, side: Side, kind: OrderKind, price: f64, qty: f64) -> Order {
    let now = current_time_millis();
    Order {
        id: OrderId::new(),
        user_id: "stress".to_string(),
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
fn concurrent_makers_and_takers_conserve_quantity() {
    const MAKERS: usize = 4;
    const TAKERS: usize = 4;
    const PER_THREAD: u64 = 250;

    let engine = Arc::new(MatchingEngine::new());
    let traded = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for _ in 0..MAKERS {
        let engine = engine.clone();
        let traded = traded.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..PER_THREAD {
                let price = 100.0 + (i % 5) as f64;
                // A resting taker bid can make this sell the aggressor, so
                // its executions count too.
                let trades = engine
                    .process(&order("STRESS", Side::Sell, OrderKind::Limit, price, 1.0))
                    .unwrap();
                let executed: u64 = trades.iter().map(|t| t.quantity.raw()).sum();
                traded.fetch_add(executed, Ordering::Relaxed);
            }
        }));
    }
    for _ in 0..TAKERS {
        let engine = engine.clone();
        let traded = traded.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..PER_THREAD {
                let trades = engine
                    .process(&order("STRESS", Side::Buy, OrderKind::Limit, 105.0, 1.0))
                    .unwrap();
                let executed: u64 = trades.iter().map(|t| t.quantity.raw()).sum();
                traded.fetch_add(executed, Ordering::Relaxed);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let book = engine.book("STRESS").unwrap();
    let submitted = (MAKERS + TAKERS) as u64 * PER_THREAD * Quantity::from_f64(1.0).raw();
    let resting =
        book.total_quantity(Side::Buy).raw() + book.total_quantity(Side::Sell).raw();
    // Every executed unit left one maker and one taker.
    assert_eq!(resting + 2 * traded.load(Ordering::Relaxed), submitted);

    let metrics = engine.metrics();
    assert_eq!(metrics.total_orders, (MAKERS + TAKERS) as u64 * PER_THREAD);
}

#[test]
fn concurrent_cancels_are_exactly_once() {
    const ORDERS: usize = 500;

    let engine = Arc::new(MatchingEngine::new());
    let mut ids = Vec::with_capacity(ORDERS);
    for i in 0..ORDERS {
        let resting = order(
            "CXL",
            Side::Buy,
            OrderKind::Limit,
            50.0 + (i % 10) as f64,
            1.0,
        );
        ids.push(resting.id);
        engine.process(&resting).unwrap();
    }

    let ids = Arc::new(ids);
    let canceled = Arc::new(AtomicU64::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let ids = ids.clone();
            let canceled = canceled.clone();
            std::thread::spawn(move || {
                for id in ids.iter() {
                    if engine.cancel(id, "CXL").is_ok() {
                        canceled.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Each order canceled exactly once across all racing threads.
    assert_eq!(canceled.load(Ordering::Relaxed), ORDERS as u64);
    let book = engine.book("CXL").unwrap();
    assert_eq!(book.order_count(Side::Buy), 0);
    assert_eq!(book.total_quantity(Side::Buy), Quantity::ZERO);
}

#[test]
fn distinct_symbols_never_interact() {
    const THREADS: usize = 6;

    let engine = Arc::new(MatchingEngine::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                let symbol = format!("SYM{i}");
                for _ in 0..200 {
                    engine
                        .process(&order(&symbol, Side::Sell, OrderKind::Limit, 100.0, 1.0))
                        .unwrap();
                    engine
                        .process(&order(&symbol, Side::Buy, OrderKind::Limit, 100.0, 1.0))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = engine.metrics();
    assert_eq!(metrics.total_orders, (THREADS * 400) as u64);
    // Every buy fully crossed its symbol's sell.
    assert_eq!(metrics.total_trades, (THREADS * 200) as u64);
    for i in 0..THREADS {
        let book = engine.book(&format!("SYM{i}")).unwrap();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }
}

#[test]
fn concurrent_service_creates_are_all_indexed() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 100;

    let service = OrderService::new(CoreConfig::default());
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let service = service.clone();
            std::thread::spawn(move || {
                for j in 0..PER_THREAD {
                    let request = OrderRequest {
                        user_id: format!("user-{i}"),
                        client_order_id: Some(format!("c-{i}-{j}")),
                        symbol: "BTC-USD".to_string(),
                        side: if j % 2 == 0 { Side::Buy } else { Side::Sell },
                        kind: OrderKind::Limit,
                        price: Some(if j % 2 == 0 { 90.0 } else { 110.0 }),
                        stop_price: None,
                        quantity: 1.0,
                        time_in_force: TimeInForce::Gtc,
                        expires_at: None,
                    };
                    service.create(request).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let all = service.list(&OrderFilter::default());
    assert_eq!(all.len(), THREADS * PER_THREAD);
    for i in 0..THREADS {
        let user_orders = service.list(&OrderFilter {
            user_id: Some(format!("user-{i}")),
            ..Default::default()
        });
        assert_eq!(user_orders.len(), PER_THREAD);
    }
}
