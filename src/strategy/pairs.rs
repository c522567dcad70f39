//! Pairs trading on the z-score of a two-leg spread.
//!
//! The strategy tracks the prices of two symbols, recomputes the spread
//! `p1 - r * p2` and its rolling mean and standard deviation over a fixed
//! lookback, and trades the normalized deviation: enter when the z-score
//! leaves the entry band, exit when it reverts inside the exit band.
//! Positions are opened and closed as paired opposite-side market orders
//! through the lifecycle service.

use super::{MarketData, Strategy};
use crate::service::{OrderRequest, OrderService, ServiceError};
use crate::types::{Order, OrderKind, Side, TimeInForce};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunable parameters for [`PairsStrategy`].
#[derive(Debug, Clone)]
pub struct PairsParams {
    /// Hedge ratio `r` applied to the second leg.
    pub hedge_ratio: f64,
    /// Spread observations kept in the rolling window.
    pub lookback: usize,
    /// Enter when `|z| >= z_entry`.
    pub z_entry: f64,
    /// Exit when `|z| <= z_exit`.
    pub z_exit: f64,
    /// Minimum interval between signal recomputations, millis.
    pub update_interval_ms: u64,
    /// Quantity per leg, external units.
    pub order_quantity: f64,
}

impl Default for PairsParams {
    fn default() -> Self {
        Self {
            hedge_ratio: 1.0,
            lookback: 60,
            z_entry: 2.0,
            z_exit: 0.5,
            update_interval_ms: 1_000,
            order_quantity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpreadPosition {
    Flat,
    /// Long leg one, short leg two.
    LongSpread,
    /// Short leg one, long leg two.
    ShortSpread,
}

struct PairsState {
    price_one: Option<f64>,
    price_two: Option<f64>,
    spreads: VecDeque<f64>,
    last_signal_at: u64,
    position: SpreadPosition,
    last_z: Option<f64>,
}

impl PairsState {
    fn new() -> Self {
        Self {
            price_one: None,
            price_two: None,
            spreads: VecDeque::new(),
            last_signal_at: 0,
            position: SpreadPosition::Flat,
            last_z: None,
        }
    }
}

/// The two legs and the orders that trade them, one signal at a time.
pub struct PairsStrategy {
    name: String,
    user_id: String,
    symbol_one: String,
    symbol_two: String,
    params: RwLock<PairsParams>,
    state: Mutex<PairsState>,
    service: Arc<OrderService>,
}

impl PairsStrategy {
    /// Build a pairs strategy trading `symbol_one` against `symbol_two` on
    /// behalf of `user_id`.
    pub fn new(
        name: &str,
        user_id: &str,
        symbol_one: &str,
        symbol_two: &str,
        params: PairsParams,
        service: Arc<OrderService>,
    ) -> Self {
        Self {
            name: name.to_string(),
            user_id: user_id.to_string(),
            symbol_one: symbol_one.to_string(),
            symbol_two: symbol_two.to_string(),
            params: RwLock::new(params),
            state: Mutex::new(PairsState::new()),
            service,
        }
    }

    /// The most recent z-score, once the window is full.
    pub fn last_z_score(&self) -> Option<f64> {
        self.state.lock().last_z
    }

    fn submit_leg(&self, symbol: &str, side: Side, quantity: f64) {
        let request = OrderRequest {
            user_id: self.user_id.clone(),
            client_order_id: None,
            symbol: symbol.to_string(),
            side,
            kind: OrderKind::Market,
            price: None,
            stop_price: None,
            quantity,
            time_in_force: TimeInForce::Ioc,
            expires_at: None,
        };
        if let Err(err) = self.service.create(request) {
            warn!(strategy = %self.name, %symbol, %side, %err, "pair leg submission failed");
        }
    }

    fn open_long_spread(&self, quantity: f64) {
        self.submit_leg(&self.symbol_one, Side::Buy, quantity);
        self.submit_leg(&self.symbol_two, Side::Sell, quantity);
    }

    fn open_short_spread(&self, quantity: f64) {
        self.submit_leg(&self.symbol_one, Side::Sell, quantity);
        self.submit_leg(&self.symbol_two, Side::Buy, quantity);
    }

    /// Evaluate the signal and decide the action. Returns the orders to
    /// place as (symbol-one side, symbol-two side), if any.
    fn evaluate(&self, now_ms: u64) -> Option<(SpreadPosition, SpreadPosition)> {
        let params = self.params.read().clone();
        let mut state = self.state.lock();

        let (Some(p1), Some(p2)) = (state.price_one, state.price_two) else {
            return None;
        };
        if now_ms.saturating_sub(state.last_signal_at) < params.update_interval_ms {
            return None;
        }
        state.last_signal_at = now_ms;

        let spread = p1 - params.hedge_ratio * p2;
        state.spreads.push_back(spread);
        while state.spreads.len() > params.lookback {
            state.spreads.pop_front();
        }
        if state.spreads.len() < params.lookback {
            return None;
        }

        let n = state.spreads.len() as f64;
        let mean = state.spreads.iter().sum::<f64>() / n;
        let variance = state
            .spreads
            .iter()
            .map(|s| (s - mean) * (s - mean))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        if std_dev <= f64::EPSILON {
            return None;
        }

        let z = (spread - mean) / std_dev;
        state.last_z = Some(z);
        debug!(strategy = %self.name, z, spread, mean, std_dev, "pair signal");

        let previous = state.position;
        let next = match previous {
            SpreadPosition::Flat if z <= -params.z_entry => SpreadPosition::LongSpread,
            SpreadPosition::Flat if z >= params.z_entry => SpreadPosition::ShortSpread,
            SpreadPosition::LongSpread | SpreadPosition::ShortSpread
                if z.abs() <= params.z_exit =>
            {
                SpreadPosition::Flat
            }
            unchanged => unchanged,
        };
        if next == previous {
            return None;
        }
        state.position = next;
        Some((previous, next))
    }
}

#[async_trait]
impl Strategy for PairsStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ServiceError> {
        let params = self.params.read();
        if params.lookback < 2 {
            return Err(ServiceError::InvalidRequest(
                "pairs lookback must be at least 2".into(),
            ));
        }
        if params.z_exit >= params.z_entry {
            return Err(ServiceError::InvalidRequest(
                "z_exit must be below z_entry".into(),
            ));
        }
        Ok(())
    }

    async fn start(&self) {
        *self.state.lock() = PairsState::new();
        info!(strategy = %self.name, one = %self.symbol_one, two = %self.symbol_two, "pairs strategy starting");
    }

    async fn stop(&self) {
        info!(strategy = %self.name, "pairs strategy stopping");
    }

    async fn on_market_data(&self, data: &MarketData) {
        {
            let mut state = self.state.lock();
            if data.symbol == self.symbol_one {
                state.price_one = Some(data.last_price);
            } else if data.symbol == self.symbol_two {
                state.price_two = Some(data.last_price);
            } else {
                return;
            }
        }

        let Some((previous, next)) = self.evaluate(data.timestamp) else {
            return;
        };
        let quantity = self.params.read().order_quantity;

        match (previous, next) {
            (SpreadPosition::Flat, SpreadPosition::LongSpread) => {
                info!(strategy = %self.name, "entering long spread");
                self.open_long_spread(quantity);
            }
            (SpreadPosition::Flat, SpreadPosition::ShortSpread) => {
                info!(strategy = %self.name, "entering short spread");
                self.open_short_spread(quantity);
            }
            (SpreadPosition::LongSpread, SpreadPosition::Flat) => {
                info!(strategy = %self.name, "exiting long spread");
                self.open_short_spread(quantity);
            }
            (SpreadPosition::ShortSpread, SpreadPosition::Flat) => {
                info!(strategy = %self.name, "exiting short spread");
                self.open_long_spread(quantity);
            }
            _ => {}
        }
    }

    async fn on_order_update(&self, order: &Order) {
        if order.user_id == self.user_id {
            debug!(strategy = %self.name, order = %order.id, status = %order.status, "order update");
        }
    }

    fn parameters(&self) -> HashMap<String, f64> {
        let params = self.params.read();
        HashMap::from([
            ("hedge_ratio".to_string(), params.hedge_ratio),
            ("lookback".to_string(), params.lookback as f64),
            ("z_entry".to_string(), params.z_entry),
            ("z_exit".to_string(), params.z_exit),
            (
                "update_interval_ms".to_string(),
                params.update_interval_ms as f64,
            ),
            ("order_quantity".to_string(), params.order_quantity),
        ])
    }

    fn set_parameters(&self, updates: HashMap<String, f64>) {
        let mut params = self.params.write();
        for (key, value) in updates {
            match key.as_str() {
                "hedge_ratio" => params.hedge_ratio = value,
                "lookback" if value >= 2.0 => params.lookback = value as usize,
                "z_entry" => params.z_entry = value,
                "z_exit" => params.z_exit = value,
                "update_interval_ms" if value >= 0.0 => {
                    params.update_interval_ms = value as u64
                }
                "order_quantity" if value > 0.0 => params.order_quantity = value,
                other => debug!(strategy = %self.name, parameter = other, "ignored unknown parameter"),
            }
        }
    }
}
