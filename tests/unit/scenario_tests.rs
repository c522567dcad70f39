//! End-to-end scenarios through service, engine and book.

use super::{limit, market};
use tradecore_rs::prelude::*;

fn service() -> std::sync::Arc<OrderService> {
    OrderService::new(CoreConfig::default())
}

#[test]
fn scenario_simple_cross() {
    let service = service();
    let mut events = service.subscribe();

    let sell = service.create(limit("A", Side::Sell, 100.0, 10.0)).unwrap();
    let buy = service.create(limit("B", Side::Buy, 100.0, 10.0)).unwrap();

    // One trade at the maker's price for the full quantity.
    let trade = loop {
        match events.try_recv() {
            Ok(OrderEvent::TradeExecuted(trade)) => break trade,
            Ok(_) => continue,
            Err(_) => panic!("expected a trade event"),
        }
    };
    assert_eq!(trade.price, Price::from_f64(100.0));
    assert_eq!(trade.quantity, Quantity::from_f64(10.0));
    assert_eq!(trade.buy_order_id, buy.id);
    assert_eq!(trade.sell_order_id, sell.id);
    assert_eq!(trade.taker_side, Side::Buy);

    assert_eq!(service.get(&sell.id).unwrap().status, OrderStatus::Filled);
    assert_eq!(service.get(&buy.id).unwrap().status, OrderStatus::Filled);

    let book = service.engine().book("BTC-USD").unwrap();
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
}

#[test]
fn scenario_partial_fill_remainder_rests() {
    let service = service();
    let sell = service.create(limit("A", Side::Sell, 100.0, 10.0)).unwrap();
    let buy = service.create(limit("B", Side::Buy, 100.0, 6.0)).unwrap();

    assert_eq!(service.get(&buy.id).unwrap().status, OrderStatus::Filled);
    let seller = service.get(&sell.id).unwrap();
    assert_eq!(seller.status, OrderStatus::PartiallyFilled);
    assert_eq!(seller.remaining(), Quantity::from_f64(4.0));

    let snapshot = service.engine().snapshot("BTC-USD").unwrap();
    let (ask_price, ask_size) = snapshot.best_ask().unwrap();
    assert_eq!(ask_price, Price::from_f64(100.0));
    assert_eq!(ask_size, Quantity::from_f64(4.0));
}

#[test]
fn scenario_price_time_priority_across_asks() {
    let service = service();
    let first = service.create(limit("A", Side::Sell, 100.0, 5.0)).unwrap();
    let second = service.create(limit("B", Side::Sell, 100.0, 5.0)).unwrap();
    let third = service.create(limit("C", Side::Sell, 99.0, 5.0)).unwrap();

    let mut events = service.subscribe();
    service.create(market("D", Side::Buy, 12.0)).unwrap();

    let mut trades = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let OrderEvent::TradeExecuted(trade) = event {
            trades.push(trade);
        }
    }
    assert_eq!(trades.len(), 3);
    assert_eq!(trades[0].price, Price::from_f64(99.0));
    assert_eq!(trades[0].quantity, Quantity::from_f64(5.0));
    assert_eq!(trades[0].sell_order_id, third.id);
    assert_eq!(trades[1].price, Price::from_f64(100.0));
    assert_eq!(trades[1].quantity, Quantity::from_f64(5.0));
    assert_eq!(trades[1].sell_order_id, first.id);
    assert_eq!(trades[2].price, Price::from_f64(100.0));
    assert_eq!(trades[2].quantity, Quantity::from_f64(2.0));
    assert_eq!(trades[2].sell_order_id, second.id);

    // 3 rest at 100 from the second seller.
    let snapshot = service.engine().snapshot("BTC-USD").unwrap();
    let (price, size) = snapshot.best_ask().unwrap();
    assert_eq!(price, Price::from_f64(100.0));
    assert_eq!(size, Quantity::from_f64(3.0));
}

#[test]
fn scenario_market_exhaustion_strict_policy() {
    let service = service();

    let result = service.create(market("A", Side::Buy, 5.0));
    assert!(matches!(
        result,
        Err(ServiceError::InsufficientLiquidity { .. })
    ));

    let orders = service.list(&OrderFilter {
        user_id: Some("A".to_string()),
        ..Default::default()
    });
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Rejected);
    assert_eq!(orders[0].filled, Quantity::ZERO);
    // Market orders never rest.
    assert_eq!(service.engine().book("BTC-USD").unwrap().best_bid(), None);
}

#[test]
fn scenario_market_exhaustion_cancel_policy() {
    let config = CoreConfig {
        market_residual_policy: MarketResidualPolicy::Cancel,
        ..Default::default()
    };
    let service = OrderService::new(config);

    let order = service.create(market("A", Side::Buy, 5.0)).unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);
    assert_eq!(order.filled, Quantity::ZERO);
}

#[test]
fn scenario_cancel_then_no_trade() {
    let service = service();
    let buy = service.create(limit("A", Side::Buy, 100.0, 10.0)).unwrap();

    service
        .cancel(CancelRequest {
            user_id: "A".to_string(),
            order_id: Some(buy.id),
            client_order_id: None,
        })
        .unwrap();

    let sell = service.create(limit("B", Side::Sell, 100.0, 10.0)).unwrap();
    let sell = service.get(&sell.id).unwrap();
    assert_eq!(sell.status, OrderStatus::Pending);
    assert_eq!(sell.filled, Quantity::ZERO);

    let book = service.engine().book("BTC-USD").unwrap();
    assert_eq!(book.best_ask(), Some(Price::from_f64(100.0)));
    assert_eq!(book.best_bid(), None);
}

#[test]
fn scenario_expiry_clears_best_bid() {
    let service = service();
    let now = tradecore_rs::current_time_millis();

    let mut request = limit("A", Side::Buy, 100.0, 10.0);
    request.time_in_force = TimeInForce::Day;
    request.expires_at = Some(now + 30);
    let order = service.create(request).unwrap();

    assert_eq!(
        service.engine().book("BTC-USD").unwrap().best_bid(),
        Some(Price::from_f64(100.0))
    );

    std::thread::sleep(std::time::Duration::from_millis(40));
    assert_eq!(service.sweep_expired(), 1);

    assert_eq!(service.get(&order.id).unwrap().status, OrderStatus::Expired);
    assert_eq!(service.engine().book("BTC-USD").unwrap().best_bid(), None);
}

#[tokio::test]
async fn scenario_expiry_via_background_sweeper() {
    let config = CoreConfig {
        expiry_scan_interval_secs: 1,
        ..Default::default()
    };
    let service = OrderService::new(config);
    let now = tradecore_rs::current_time_millis();

    let mut request = limit("A", Side::Buy, 100.0, 10.0);
    request.time_in_force = TimeInForce::Day;
    request.expires_at = Some(now + 100);
    let order = service.create(request).unwrap();

    let sweeper = service.start_expiry_sweeper();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if service.get(&order.id).unwrap().status == OrderStatus::Expired {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "sweeper never fired");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    sweeper.abort();
}

#[test]
fn scenario_unauthorized_touch_changes_nothing() {
    let service = service();
    let order = service.create(limit("A", Side::Buy, 100.0, 10.0)).unwrap();

    assert!(matches!(
        service.cancel(CancelRequest {
            user_id: "B".to_string(),
            order_id: Some(order.id),
            client_order_id: None,
        }),
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        service.update(UpdateRequest {
            user_id: "B".to_string(),
            order_id: order.id,
            price: Some(1.0),
            stop_price: None,
            quantity: None,
            time_in_force: None,
            expires_at: None,
        }),
        Err(ServiceError::Unauthorized)
    ));

    let unchanged = service.get(&order.id).unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
    assert_eq!(unchanged.price, Some(Price::from_f64(100.0)));
    assert_eq!(
        service.engine().book("BTC-USD").unwrap().best_bid(),
        Some(Price::from_f64(100.0))
    );
}

#[test]
fn scenario_duplicate_client_id() {
    let service = service();
    let mut request = limit("A", Side::Buy, 100.0, 1.0);
    request.client_order_id = Some("dup-1".to_string());
    service.create(request.clone()).unwrap();

    assert!(matches!(
        service.create(request),
        Err(ServiceError::DuplicateOrder { .. })
    ));
}

#[test]
fn scenario_engine_metrics_accumulate() {
    let service = service();
    service.create(limit("A", Side::Sell, 100.0, 10.0)).unwrap();
    service.create(limit("B", Side::Buy, 100.0, 10.0)).unwrap();

    let metrics = service.engine().metrics();
    assert_eq!(metrics.total_orders, 2);
    assert_eq!(metrics.total_trades, 1);
    assert!(metrics.max_latency_ns > 0);
    assert!(metrics.max_latency_ns >= metrics.avg_latency_ns);
}
