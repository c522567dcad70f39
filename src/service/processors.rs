//! Per-type order processors.
//!
//! The set of order types is closed, so dispatch is a tagged match rather
//! than open registration. Each processor validates its invariants, routes
//! the order (to the engine, or holds it pending for stops), and knows the
//! price an execution would take.

use super::error::ServiceError;
use crate::engine::MatchingEngine;
use crate::types::{Order, OrderKind, Price, Trade};

/// What `process` decided to do with the order.
#[derive(Debug)]
pub(crate) enum Routing {
    /// The order went to the engine and produced these trades.
    Dispatched(Vec<Trade>),
    /// The order stays pending in the service until its stop triggers.
    HeldForTrigger,
}

/// The uniform processor interface.
pub(crate) trait OrderProcessor: Send + Sync {
    /// Check type-specific invariants on the assembled order.
    fn validate(&self, order: &Order) -> Result<(), ServiceError>;

    /// Route the order.
    fn process(&self, order: &Order, engine: &MatchingEngine) -> Result<Routing, ServiceError>;

    /// The price an execution would take, given the current market price.
    fn execution_price(&self, order: &Order, market_price: Option<Price>) -> Option<Price>;
}

struct LimitProcessor;

impl OrderProcessor for LimitProcessor {
    fn validate(&self, order: &Order) -> Result<(), ServiceError> {
        match order.price {
            Some(price) if !price.is_zero() => Ok(()),
            _ => Err(ServiceError::InvalidOrder(
                "limit order requires a positive price".into(),
            )),
        }
    }

    fn process(&self, order: &Order, engine: &MatchingEngine) -> Result<Routing, ServiceError> {
        Ok(Routing::Dispatched(engine.process(order)?))
    }

    fn execution_price(&self, order: &Order, _market_price: Option<Price>) -> Option<Price> {
        order.price
    }
}

struct MarketProcessor;

impl OrderProcessor for MarketProcessor {
    fn validate(&self, order: &Order) -> Result<(), ServiceError> {
        if order.quantity.is_zero() {
            return Err(ServiceError::InvalidOrder(
                "market order requires a positive quantity".into(),
            ));
        }
        Ok(())
    }

    fn process(&self, order: &Order, engine: &MatchingEngine) -> Result<Routing, ServiceError> {
        Ok(Routing::Dispatched(engine.process(order)?))
    }

    fn execution_price(&self, _order: &Order, market_price: Option<Price>) -> Option<Price> {
        market_price
    }
}

struct StopLimitProcessor;

impl OrderProcessor for StopLimitProcessor {
    fn validate(&self, order: &Order) -> Result<(), ServiceError> {
        if order.price.is_none_or(|p| p.is_zero()) {
            return Err(ServiceError::InvalidOrder(
                "stop-limit order requires a positive price".into(),
            ));
        }
        if order.stop_price.is_none_or(|p| p.is_zero()) {
            return Err(ServiceError::InvalidOrder(
                "stop-limit order requires a positive stop price".into(),
            ));
        }
        Ok(())
    }

    fn process(&self, _order: &Order, _engine: &MatchingEngine) -> Result<Routing, ServiceError> {
        // The engine never stores stops; the service converts on trigger.
        Ok(Routing::HeldForTrigger)
    }

    fn execution_price(&self, order: &Order, _market_price: Option<Price>) -> Option<Price> {
        order.price
    }
}

struct StopMarketProcessor;

impl OrderProcessor for StopMarketProcessor {
    fn validate(&self, order: &Order) -> Result<(), ServiceError> {
        if order.stop_price.is_none_or(|p| p.is_zero()) {
            return Err(ServiceError::InvalidOrder(
                "stop-market order requires a positive stop price".into(),
            ));
        }
        Ok(())
    }

    fn process(&self, _order: &Order, _engine: &MatchingEngine) -> Result<Routing, ServiceError> {
        Ok(Routing::HeldForTrigger)
    }

    fn execution_price(&self, _order: &Order, market_price: Option<Price>) -> Option<Price> {
        market_price
    }
}

/// Processor dispatch keyed by [`OrderKind`].
pub(crate) struct Processors {
    limit: LimitProcessor,
    market: MarketProcessor,
    stop_limit: StopLimitProcessor,
    stop_market: StopMarketProcessor,
}

impl Processors {
    pub(crate) fn new() -> Self {
        Self {
            limit: LimitProcessor,
            market: MarketProcessor,
            stop_limit: StopLimitProcessor,
            stop_market: StopMarketProcessor,
        }
    }

    pub(crate) fn get(&self, kind: OrderKind) -> &dyn OrderProcessor {
        match kind {
            OrderKind::Limit => &self.limit,
            OrderKind::Market => &self.market,
            OrderKind::StopLimit => &self.stop_limit,
            OrderKind::StopMarket => &self.stop_market,
        }
    }
}

/// Whether a stop order triggers at the given last trade price.
///
/// Buy stops arm above the market and trigger when the trade price rises to
/// the stop; sell stops mirror below. Only trade prices trigger, not
/// bid/ask moves.
pub(crate) fn stop_triggered(order: &Order, last_trade_price: Price) -> bool {
    let Some(stop) = order.stop_price else {
        return false;
    };
    match order.side {
        crate::types::Side::Buy => last_trade_price >= stop,
        crate::types::Side::Sell => last_trade_price <= stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, OrderStatus, Quantity, Side, TimeInForce};

    fn stop_order(side: Side, stop: f64) -> Order {
        Order {
            id: OrderId::new(),
            user_id: "trader-1".to_string(),
            client_order_id: None,
            symbol: "BTC-USD".to_string(),
            side,
            kind: OrderKind::StopMarket,
            price: None,
            stop_price: Some(Price::from_f64(stop)),
            quantity: Quantity::from_f64(1.0),
            filled: Quantity::ZERO,
            status: OrderStatus::Pending,
            time_in_force: TimeInForce::Gtc,
            created_at: 0,
            updated_at: 0,
            expires_at: None,
            trades: Vec::new(),
        }
    }

    #[test]
    fn test_buy_stop_triggers_at_or_above() {
        let order = stop_order(Side::Buy, 105.0);
        assert!(!stop_triggered(&order, Price::from_f64(104.9)));
        assert!(stop_triggered(&order, Price::from_f64(105.0)));
        assert!(stop_triggered(&order, Price::from_f64(110.0)));
    }

    #[test]
    fn test_sell_stop_triggers_at_or_below() {
        let order = stop_order(Side::Sell, 95.0);
        assert!(!stop_triggered(&order, Price::from_f64(95.1)));
        assert!(stop_triggered(&order, Price::from_f64(95.0)));
        assert!(stop_triggered(&order, Price::from_f64(90.0)));
    }

    #[test]
    fn test_stop_processors_hold_orders() {
        let engine = MatchingEngine::new();
        let processors = Processors::new();
        let order = stop_order(Side::Buy, 105.0);
        let routing = processors
            .get(OrderKind::StopMarket)
            .process(&order, &engine)
            .unwrap();
        assert!(matches!(routing, Routing::HeldForTrigger));
        // Nothing reached the engine.
        assert_eq!(engine.metrics().total_orders, 0);
    }
}
