//! Integration suite: end-to-end scenarios and universal properties.

mod concurrency_tests;
mod property_tests;
mod scenario_tests;

use tradecore_rs::prelude::*;

/// Build a limit order request against BTC-USD.
pub fn limit(user: &str, side: Side, price: f64, qty: f64) -> OrderRequest {
    OrderRequest {
        user_id: user.to_string(),
        client_order_id: None,
        symbol: "BTC-USD".to_string(),
        side,
        kind: OrderKind::Limit,
        price: Some(price),
        stop_price: None,
        quantity: qty,
        time_in_force: TimeInForce::Gtc,
        expires_at: None,
    }
}

/// Build a market order request against BTC-USD.
pub fn market(user: &str, side: Side, qty: f64) -> OrderRequest {
    let mut request = limit(user, side, 0.0, qty);
    request.kind = OrderKind::Market;
    request.price = None;
    request
}
