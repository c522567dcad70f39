//! Book-level test modules.


use crate::types::{Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, TimeInForce};
use crate::utils::current_time_millis;

/// Build a plain limit order for book tests.
pub(super) fn limit_order(side: Side, price: f64, qty: f64) -> Order {
    let now = current_time_millis();
    Order {
        id: OrderId::new(),
        user_id: "trader-1".to_string(),
        client_order_id: None,
        symbol: "BTC-USD".to_string(),
        side,
        kind: OrderKind::Limit,
        price: Some(Price::from_f64(price)),
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

/// Build a market order for book tests.
pub(super) fn market_order(side: Side, qty: f64) -> Order {
    let mut order = limit_order(side, 0.0, qty);
    order.kind = OrderKind::Market;
    order.price = None;
    order
}
