//! The order lifecycle service: validates, admits, tracks and expires orders
//! and maps fills back onto order state.

use super::cache::OrderCache;
use super::config::{CoreConfig, MarketResidualPolicy};
use super::error::ServiceError;
use super::events::{EventBus, OrderEvent};
use super::lifecycle::{LifecycleEvent, transition};
use super::processors::{Processors, Routing, stop_triggered};
use super::requests::{CancelRequest, OrderFilter, OrderRequest, UpdateRequest};
use super::validation;
use crate::engine::MatchingEngine;
use crate::orderbook::{FreeList, OrderBookError};
use crate::types::{
    Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Trade, TimeInForce,
};
use crate::utils::current_time_millis;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Idle scratch buffers retained for stop-trigger scans.
const STOP_SCRATCH_CAPACITY: usize = 16;

/// Primary order index plus the secondary indices. All of them live behind
/// one read-write lock, acquired for the minimal window covering an insert
/// or delete plus index maintenance.
#[derive(Default)]
struct OrderIndices {
    orders: HashMap<OrderId, Order>,
    by_user: HashMap<String, HashSet<OrderId>>,
    by_symbol: HashMap<String, HashSet<OrderId>>,
    by_client: HashMap<(String, String), OrderId>,
    /// Stop orders waiting on a trigger, per symbol.
    pending_stops: HashMap<String, HashSet<OrderId>>,
    /// Orders created per user in the current UTC day.
    daily_counts: HashMap<String, (NaiveDate, u32)>,
}

impl OrderIndices {
    fn daily_count(&self, user_id: &str, today: NaiveDate) -> u32 {
        match self.daily_counts.get(user_id) {
            Some((day, count)) if *day == today => *count,
            _ => 0,
        }
    }

    fn bump_daily(&mut self, user_id: &str, today: NaiveDate) {
        let entry = self
            .daily_counts
            .entry(user_id.to_string())
            .or_insert((today, 0));
        if entry.0 != today {
            *entry = (today, 0);
        }
        entry.1 += 1;
    }

    fn open_order_count(&self, user_id: &str) -> usize {
        self.by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter(|id| {
                        self.orders
                            .get(id)
                            .is_some_and(|order| !order.status.is_terminal())
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

enum TransitionFailure {
    NotFound,
    Illegal(OrderStatus),
}

/// Order admission, lifecycle tracking and fill application.
pub struct OrderService {
    engine: Arc<MatchingEngine>,
    config: CoreConfig,
    indices: RwLock<OrderIndices>,
    /// Net position per (user, symbol), external units, signed.
    positions: DashMap<(String, String), f64>,
    cache: Arc<OrderCache>,
    events: EventBus,
    processors: Processors,
    stop_scratch: FreeList<Vec<OrderId>>,
}

impl OrderService {
    /// Create a service with its own engine configured from `config`.
    pub fn new(config: CoreConfig) -> Arc<Self> {
        let engine = if config.lock_free_fast_path_enabled {
            Arc::new(MatchingEngine::with_relaxed_levels())
        } else {
            Arc::new(MatchingEngine::new())
        };
        Self::with_engine(engine, config)
    }

    /// Create a service around an existing engine handle.
    pub fn with_engine(engine: Arc<MatchingEngine>, config: CoreConfig) -> Arc<Self> {
        let cache = Arc::new(OrderCache::new(Duration::from_secs(config.cache_ttl_secs)));
        Arc::new(Self {
            engine,
            config,
            indices: RwLock::new(OrderIndices::default()),
            positions: DashMap::new(),
            cache,
            events: EventBus::new(),
            processors: Processors::new(),
            stop_scratch: FreeList::new(STOP_SCRATCH_CAPACITY),
        })
    }

    /// The engine this service dispatches to.
    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Subscribe to the outbound event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    /// Spawn the periodic cache sweep at the configured cadence.
    pub fn start_cache_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.cache
            .start_sweeper(Duration::from_secs(self.config.cache_sweep_secs.max(1)))
    }

    /// Net position for a user and symbol, external units, signed.
    pub fn position(&self, user_id: &str, symbol: &str) -> f64 {
        self.positions
            .get(&(user_id.to_string(), symbol.to_string()))
            .map(|entry| *entry.value())
            .unwrap_or(0.0)
    }

    /// Admit a new order.
    ///
    /// Validation steps run in order and short-circuit: syntax, business
    /// rules, risk rules, the per-user open-order cap, and client-id
    /// uniqueness. The admitted order is indexed, moved to Pending and
    /// dispatched through its type's processor.
    pub fn create(&self, request: OrderRequest) -> Result<Order, ServiceError> {
        let now = current_time_millis();
        validation::validate_syntax(&request, now)?;

        let effective_price = request.price.or_else(|| {
            self.engine
                .book(&request.symbol)
                .and_then(|book| book.last_trade_price())
                .map(|price| price.to_f64())
        });

        let today = Utc::now().date_naive();
        {
            let indices = self.indices.read();
            let daily = indices.daily_count(&request.user_id, today);
            validation::validate_business(&request, &self.config, effective_price, daily)?;
            let position = self.position(&request.user_id, &request.symbol);
            validation::validate_risk(&request, &self.config, position, effective_price)?;
            if indices.open_order_count(&request.user_id) >= self.config.max_orders_per_user {
                return Err(ServiceError::MaxOrdersExceeded {
                    limit: self.config.max_orders_per_user,
                });
            }
            if let Some(cid) = &request.client_order_id
                && indices
                    .by_client
                    .contains_key(&(request.user_id.clone(), cid.clone()))
            {
                return Err(ServiceError::DuplicateOrder {
                    user_id: request.user_id.clone(),
                    client_order_id: cid.clone(),
                });
            }
        }

        let order = Order {
            id: OrderId::new(),
            user_id: request.user_id.clone(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            kind: request.kind,
            price: request.price.map(Price::from_f64),
            stop_price: request.stop_price.map(Price::from_f64),
            quantity: Quantity::from_f64(request.quantity),
            filled: Quantity::ZERO,
            status: OrderStatus::New,
            time_in_force: request.time_in_force,
            created_at: now,
            updated_at: now,
            expires_at: request.expires_at,
            trades: Vec::new(),
        };

        {
            let mut indices = self.indices.write();
            if let Some(cid) = &order.client_order_id {
                let key = (order.user_id.clone(), cid.clone());
                if indices.by_client.contains_key(&key) {
                    return Err(ServiceError::DuplicateOrder {
                        user_id: order.user_id.clone(),
                        client_order_id: cid.clone(),
                    });
                }
                indices.by_client.insert(key, order.id);
            }
            indices
                .by_user
                .entry(order.user_id.clone())
                .or_default()
                .insert(order.id);
            indices
                .by_symbol
                .entry(order.symbol.clone())
                .or_default()
                .insert(order.id);
            indices.bump_daily(&order.user_id, today);
            indices.orders.insert(order.id, order.clone());
        }
        self.cache.put(order.clone());
        self.events.publish(OrderEvent::OrderCreated(order.clone()));
        info!(order = %order.id, user = %order.user_id, symbol = %order.symbol, kind = %order.kind, "order created");

        let processor = self.processors.get(order.kind);
        if let Err(err) = processor.validate(&order) {
            let rejected = self.reject(&order.id);
            return match rejected {
                Some(_) => Err(err),
                None => Err(ServiceError::Internal("order vanished during admission".into())),
            };
        }

        // FOK feasibility: fully fillable now, or canceled without dispatch.
        if order.time_in_force == TimeInForce::Fok && !order.kind.is_stop() {
            let fillable = self
                .engine
                .book(&order.symbol)
                .map(|book| book.peek_match(order.side, order.quantity, order.price))
                .unwrap_or(Quantity::ZERO);
            if fillable < order.quantity {
                let canceled = self.finish(&order.id, LifecycleEvent::Cancel)?;
                warn!(order = %order.id, "fill-or-kill order canceled: not fully fillable");
                self.events
                    .publish(OrderEvent::OrderCanceled(canceled.clone()));
                return Ok(canceled);
            }
        }

        let admitted = self.finish(&order.id, LifecycleEvent::Validate)?;

        match processor.process(&admitted, &self.engine) {
            Ok(Routing::Dispatched(trades)) => {
                for trade in &trades {
                    self.on_trade(trade);
                }
                self.settle_residual(&admitted, trades.len())
            }
            Ok(Routing::HeldForTrigger) => {
                let mut indices = self.indices.write();
                indices
                    .pending_stops
                    .entry(admitted.symbol.clone())
                    .or_default()
                    .insert(admitted.id);
                drop(indices);
                Ok(admitted)
            }
            Err(err) => {
                error!(order = %admitted.id, %err, "engine dispatch failed");
                self.reject(&admitted.id);
                Err(err)
            }
        }
    }

    /// Cancel an order by id, or by (user, client id) when no id is given.
    ///
    /// Only the owner may cancel, and only from New, Pending or
    /// PartiallyFilled.
    pub fn cancel(&self, request: CancelRequest) -> Result<Order, ServiceError> {
        let id = match request.order_id {
            Some(id) => id,
            None => {
                let cid = request.client_order_id.as_deref().ok_or_else(|| {
                    ServiceError::InvalidRequest(
                        "cancel requires order_id or client_order_id".into(),
                    )
                })?;
                let indices = self.indices.read();
                *indices
                    .by_client
                    .get(&(request.user_id.clone(), cid.to_string()))
                    .ok_or_else(|| ServiceError::NotFound(cid.to_string()))?
            }
        };

        let order = self
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        if order.user_id != request.user_id {
            return Err(ServiceError::Unauthorized);
        }
        if order.status.is_terminal() {
            return Err(ServiceError::NotCancellable {
                status: order.status,
            });
        }

        // Stops and fully matched orders are not resting in the book.
        match self.engine.cancel(&id, &order.symbol) {
            Ok(())
            | Err(OrderBookError::OrderNotFound(_))
            | Err(OrderBookError::UnknownSymbol(_)) => {}
            Err(other) => return Err(other.into()),
        }

        let canceled = self.finish(&id, LifecycleEvent::Cancel)?;
        self.events
            .publish(OrderEvent::OrderCanceled(canceled.clone()));
        info!(order = %id, "order canceled");
        Ok(canceled)
    }

    /// Update mutable fields of an order still in New or Pending.
    ///
    /// Fields that are present and positive (for numerics) are applied; the
    /// client-id index is untouched since client ids are immutable.
    pub fn update(&self, request: UpdateRequest) -> Result<Order, ServiceError> {
        let updated = {
            let mut indices = self.indices.write();
            let order = indices
                .orders
                .get_mut(&request.order_id)
                .ok_or_else(|| ServiceError::NotFound(request.order_id.to_string()))?;
            if order.user_id != request.user_id {
                return Err(ServiceError::Unauthorized);
            }
            if !matches!(order.status, OrderStatus::New | OrderStatus::Pending) {
                return Err(ServiceError::InvalidRequest(format!(
                    "order in status {} can no longer be updated",
                    order.status
                )));
            }

            if let Some(price) = request.price
                && price > 0.0
            {
                order.price = Some(Price::from_f64(price));
            }
            if let Some(stop) = request.stop_price
                && stop > 0.0
            {
                order.stop_price = Some(Price::from_f64(stop));
            }
            if let Some(quantity) = request.quantity
                && quantity > 0.0
            {
                order.quantity = Quantity::from_f64(quantity);
            }
            if let Some(tif) = request.time_in_force {
                order.time_in_force = tif;
            }
            if let Some(expires_at) = request.expires_at
                && expires_at > 0
            {
                order.expires_at = Some(expires_at);
            }
            order.updated_at = current_time_millis();
            order.clone()
        };

        self.cache.put(updated.clone());
        self.events.publish(OrderEvent::OrderUpdated(updated.clone()));
        Ok(updated)
    }

    /// Look up an order by id. Served from the cache when live.
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        if let Some(order) = self.cache.get(id) {
            return Some(order);
        }
        let order = self.indices.read().orders.get(id).cloned()?;
        if !order.status.is_terminal() {
            self.cache.put(order.clone());
        }
        Some(order)
    }

    /// Look up an order by (user, client id).
    pub fn get_by_client(&self, user_id: &str, client_order_id: &str) -> Option<Order> {
        let id = {
            let indices = self.indices.read();
            *indices
                .by_client
                .get(&(user_id.to_string(), client_order_id.to_string()))?
        };
        self.get(&id)
    }

    /// List orders matching a filter, oldest first. A fixed user or symbol
    /// narrows iteration to the corresponding secondary index.
    pub fn list(&self, filter: &OrderFilter) -> Vec<Order> {
        let indices = self.indices.read();

        let matches = |order: &Order| -> bool {
            filter
                .user_id
                .as_ref()
                .is_none_or(|user| &order.user_id == user)
                && filter
                    .symbol
                    .as_ref()
                    .is_none_or(|symbol| &order.symbol == symbol)
                && filter.side.is_none_or(|side| order.side == side)
                && filter.kind.is_none_or(|kind| order.kind == kind)
                && filter.status.is_none_or(|status| order.status == status)
                && filter.created_after.is_none_or(|t| order.created_at >= t)
                && filter.created_before.is_none_or(|t| order.created_at <= t)
        };

        let mut result: Vec<Order> = if let Some(user) = &filter.user_id {
            indices
                .by_user
                .get(user)
                .into_iter()
                .flatten()
                .filter_map(|id| indices.orders.get(id))
                .filter(|order| matches(order))
                .cloned()
                .collect()
        } else if let Some(symbol) = &filter.symbol {
            indices
                .by_symbol
                .get(symbol)
                .into_iter()
                .flatten()
                .filter_map(|id| indices.orders.get(id))
                .filter(|order| matches(order))
                .cloned()
                .collect()
        } else {
            indices
                .orders
                .values()
                .filter(|order| matches(order))
                .cloned()
                .collect()
        };

        result.sort_by_key(|order| order.created_at);
        result
    }

    /// Apply a fill to both participating orders, update positions, publish
    /// events, and dispatch any stop orders the trade price triggered.
    ///
    /// Runs to completion before the next fill for the same order is
    /// admitted: the engine serializes fills per book, and this method holds
    /// the index write lock while mutating order state.
    pub fn on_trade(&self, trade: &Trade) {
        let mut updated: Vec<Order> = Vec::with_capacity(2);
        let mut triggered: Vec<Order> = Vec::new();

        {
            let mut indices = self.indices.write();
            for order_id in [trade.buy_order_id, trade.sell_order_id] {
                let Some(order) = indices.orders.get_mut(&order_id) else {
                    continue;
                };
                order.trades.push(trade.id);
                order.filled = order
                    .filled
                    .saturating_add(trade.quantity)
                    .min(order.quantity);
                let event = if order.filled == order.quantity {
                    LifecycleEvent::FillFull
                } else {
                    LifecycleEvent::FillPartial
                };
                match transition(order.status, event) {
                    Some(next) => order.status = next,
                    None => {
                        error!(
                            order = %order_id,
                            status = %order.status,
                            "fill arrived for order outside a fillable state"
                        );
                        continue;
                    }
                }
                order.updated_at = trade.timestamp;
                updated.push(order.clone());
            }

            // Stop triggers fire on trade-price crossings only.
            let mut scratch = self.stop_scratch.get();
            if let Some(stops) = indices.pending_stops.get(&trade.symbol) {
                for id in stops {
                    if let Some(order) = indices.orders.get(id)
                        && stop_triggered(order, trade.price)
                    {
                        scratch.push(*id);
                    }
                }
            }
            for id in scratch.iter() {
                if let Some(stops) = indices.pending_stops.get_mut(&trade.symbol) {
                    stops.remove(id);
                }
                if let Some(order) = indices.orders.get_mut(id) {
                    order.kind = match order.kind {
                        OrderKind::StopLimit => OrderKind::Limit,
                        OrderKind::StopMarket => OrderKind::Market,
                        kind => kind,
                    };
                    order.updated_at = trade.timestamp;
                    triggered.push(order.clone());
                }
            }
            self.stop_scratch.put(scratch);
        }

        for order in &updated {
            let delta = order.side.sign() * trade.quantity.to_f64();
            *self
                .positions
                .entry((order.user_id.clone(), order.symbol.clone()))
                .or_insert(0.0) += delta;

            if order.status.is_terminal() {
                self.cache.invalidate(&order.id);
            } else {
                self.cache.put(order.clone());
            }
        }

        self.events.publish(OrderEvent::TradeExecuted(trade.clone()));
        for order in updated {
            self.events.publish(OrderEvent::OrderUpdated(order));
        }

        for stop in triggered {
            info!(order = %stop.id, symbol = %stop.symbol, "stop order triggered");
            match self.engine.process(&stop) {
                Ok(trades) => {
                    for t in &trades {
                        self.on_trade(t);
                    }
                    if let Err(err) = self.settle_residual(&stop, trades.len()) {
                        warn!(order = %stop.id, %err, "triggered stop left a residual");
                    }
                }
                Err(err) => {
                    error!(order = %stop.id, %err, "triggered stop dispatch failed");
                    self.reject(&stop.id);
                }
            }
        }
    }

    /// Residual handling after a dispatch: IOC remainders are pulled from
    /// the book, market residuals follow the configured policy.
    fn settle_residual(&self, order: &Order, trade_count: usize) -> Result<Order, ServiceError> {
        let current = self
            .get(&order.id)
            .ok_or_else(|| ServiceError::NotFound(order.id.to_string()))?;
        let residual = current.remaining();

        match order.kind {
            OrderKind::Limit if order.time_in_force == TimeInForce::Ioc && !residual.is_zero() => {
                match self.engine.cancel(&order.id, &order.symbol) {
                    Ok(())
                    | Err(OrderBookError::OrderNotFound(_))
                    | Err(OrderBookError::UnknownSymbol(_)) => {}
                    Err(other) => return Err(other.into()),
                }
                let canceled = self.finish(&order.id, LifecycleEvent::Cancel)?;
                self.events
                    .publish(OrderEvent::OrderCanceled(canceled.clone()));
                Ok(canceled)
            }
            OrderKind::Market if !residual.is_zero() => {
                if trade_count == 0
                    && self.config.market_residual_policy == MarketResidualPolicy::Reject
                {
                    let rejected = self.finish(&order.id, LifecycleEvent::Reject)?;
                    warn!(order = %order.id, "market order rejected: no liquidity");
                    self.events
                        .publish(OrderEvent::OrderUpdated(rejected.clone()));
                    return Err(ServiceError::InsufficientLiquidity {
                        requested: current.quantity,
                        filled: current.filled,
                    });
                }
                let canceled = self.finish(&order.id, LifecycleEvent::Cancel)?;
                warn!(
                    order = %order.id,
                    residual = residual.raw(),
                    "market order residual canceled: book exhausted"
                );
                self.events
                    .publish(OrderEvent::OrderCanceled(canceled.clone()));
                Ok(canceled)
            }
            _ => Ok(current),
        }
    }

    /// Move an order to Rejected, from New or Pending.
    fn reject(&self, id: &OrderId) -> Option<Order> {
        match self.apply_transition(id, LifecycleEvent::Reject) {
            Ok(rejected) => {
                self.events
                    .publish(OrderEvent::OrderUpdated(rejected.clone()));
                Some(rejected)
            }
            Err(_) => None,
        }
    }

    /// Apply a transition and surface failures as service errors.
    fn finish(&self, id: &OrderId, event: LifecycleEvent) -> Result<Order, ServiceError> {
        self.apply_transition(id, event).map_err(|failure| match failure {
            TransitionFailure::NotFound => ServiceError::NotFound(id.to_string()),
            TransitionFailure::Illegal(status) if event == LifecycleEvent::Cancel => {
                ServiceError::NotCancellable { status }
            }
            TransitionFailure::Illegal(status) => ServiceError::Internal(format!(
                "illegal transition from {status} on {event:?}"
            )),
        })
    }

    fn apply_transition(
        &self,
        id: &OrderId,
        event: LifecycleEvent,
    ) -> Result<Order, TransitionFailure> {
        let snapshot = {
            let mut indices = self.indices.write();
            let order = indices
                .orders
                .get_mut(id)
                .ok_or(TransitionFailure::NotFound)?;
            let next =
                transition(order.status, event).ok_or(TransitionFailure::Illegal(order.status))?;
            order.status = next;
            order.updated_at = current_time_millis();
            let snapshot = order.clone();
            if next.is_terminal()
                && let Some(stops) = indices.pending_stops.get_mut(&snapshot.symbol)
            {
                stops.remove(id);
            }
            snapshot
        };

        if snapshot.status.is_terminal() {
            self.cache.invalidate(id);
        } else {
            self.cache.put(snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Expire an order that has passed its `expires_at`. Used by the sweeper.
    pub(super) fn expire(&self, id: &OrderId, symbol: &str) -> Result<Order, ServiceError> {
        match self.engine.cancel(id, symbol) {
            Ok(())
            | Err(OrderBookError::OrderNotFound(_))
            | Err(OrderBookError::UnknownSymbol(_)) => {}
            Err(other) => return Err(other.into()),
        }
        let expired = self.finish(id, LifecycleEvent::Expire)?;
        self.events
            .publish(OrderEvent::OrderExpired(expired.clone()));
        info!(order = %id, "order expired");
        Ok(expired)
    }

    /// Orders eligible for expiry right now: non-terminal with a non-zero
    /// `expires_at` at or before `now_ms`.
    pub(super) fn expired_candidates(&self, now_ms: u64) -> Vec<(OrderId, String)> {
        let indices = self.indices.read();
        indices
            .orders
            .values()
            .filter(|order| {
                matches!(
                    order.status,
                    OrderStatus::New | OrderStatus::Pending | OrderStatus::PartiallyFilled
                ) && order.expires_at.is_some_and(|at| at <= now_ms)
            })
            .map(|order| (order.id, order.symbol.clone()))
            .collect()
    }
}
