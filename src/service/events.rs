//! Outbound event stream consumed by transport and persistence collaborators.

use crate::types::{Order, Trade};
use tokio::sync::broadcast;
use tracing::trace;

/// Default buffer size for the broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Lifecycle and execution events, in causal order per order.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    /// A new order was admitted.
    OrderCreated(Order),
    /// An order's state changed (fill, reject, update).
    OrderUpdated(Order),
    /// An order was canceled by its owner.
    OrderCanceled(Order),
    /// An order was expired by the sweeper.
    OrderExpired(Order),
    /// A trade executed.
    TradeExecuted(Trade),
}

/// Broadcast fan-out of [`OrderEvent`]s. Slow subscribers lag and lose
/// events rather than back-pressuring the service.
pub(crate) struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the stream from this point on.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A send with no subscribers is not an error.
    pub(crate) fn publish(&self, event: OrderEvent) {
        if self.sender.send(event).is_err() {
            trace!("order event dropped: no subscribers");
        }
    }
}
