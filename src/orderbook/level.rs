//! A single price level: the FIFO queue of resting entries at one price.

use crate::types::{OrderId, Price, Quantity};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A resting order's footprint in the book. Holds the order id as a back
/// reference; the full record stays in the service's primary index.
#[derive(Debug, Clone, Copy)]
pub struct BookEntry {
    /// Back reference to the order.
    pub order_id: OrderId,
    /// Resting price.
    pub price: Price,
    /// Quantity still resting.
    pub remaining: Quantity,
    /// Arrival sequence, monotonic per book. Breaks price ties.
    pub seq: u64,
}

/// One fill consumed from a level during matching, in arrival order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LevelFill {
    /// The maker order consumed.
    pub maker_order_id: OrderId,
    /// Quantity taken from the maker.
    pub quantity: Quantity,
    /// Whether the maker entry was fully consumed and popped.
    pub maker_exhausted: bool,
}

/// Arrival-order queue of entry ids.
///
/// `Fifo` preserves strict time priority. `Relaxed` is the lock-free fast
/// path: push and pop never block, but a partially filled head is re-queued
/// at the back, so time priority within the level is relaxed. Only selected
/// when the fast path is explicitly enabled.
enum ArrivalQueue {
    Fifo(Mutex<VecDeque<OrderId>>),
    Relaxed(SegQueue<OrderId>),
}

/// A price level: arrival queue plus an entry map keyed by order id.
///
/// Cancellation removes the entry from the map and leaves the id in the
/// queue as a tombstone; matching skips tombstones lazily. The aggregate
/// quantity is an atomic so depth queries never touch the queue.
pub(crate) struct PriceLevel {
    price: Price,
    queue: ArrivalQueue,
    entries: DashMap<OrderId, BookEntry>,
    total_quantity: AtomicU64,
}

impl PriceLevel {
    pub(crate) fn new(price: Price, relaxed: bool) -> Self {
        let queue = if relaxed {
            ArrivalQueue::Relaxed(SegQueue::new())
        } else {
            ArrivalQueue::Fifo(Mutex::new(VecDeque::new()))
        };
        Self {
            price,
            queue,
            entries: DashMap::new(),
            total_quantity: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn price(&self) -> Price {
        self.price
    }

    /// Append a resting entry at the back of the arrival queue.
    pub(crate) fn add(&self, entry: BookEntry) {
        self.total_quantity
            .fetch_add(entry.remaining.raw(), Ordering::Relaxed);
        let id = entry.order_id;
        self.entries.insert(id, entry);
        match &self.queue {
            ArrivalQueue::Fifo(q) => q.lock().push_back(id),
            ArrivalQueue::Relaxed(q) => q.push(id),
        }
    }

    /// Remove a resting entry. Returns the removed entry, or `None` when the
    /// id is unknown at this level. The queue keeps the id as a tombstone.
    pub(crate) fn remove(&self, order_id: &OrderId) -> Option<BookEntry> {
        let (_, entry) = self.entries.remove(order_id)?;
        self.total_quantity
            .fetch_sub(entry.remaining.raw(), Ordering::Relaxed);
        Some(entry)
    }

    /// Total resting quantity at this level.
    #[inline]
    pub(crate) fn total_quantity(&self) -> Quantity {
        Quantity::from_raw(self.total_quantity.load(Ordering::Relaxed))
    }

    /// Number of live entries at this level.
    #[inline]
    pub(crate) fn order_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume entries in arrival order until `remaining` is exhausted or the
    /// level runs dry. Fills are appended to `fills` in consumption order.
    pub(crate) fn match_incoming(&self, remaining: &mut Quantity, fills: &mut Vec<LevelFill>) {
        match &self.queue {
            ArrivalQueue::Fifo(q) => {
                let mut queue = q.lock();
                while !remaining.is_zero() {
                    let Some(id) = queue.pop_front() else { break };
                    match self.fill_entry(&id, remaining) {
                        FillOutcome::Tombstone => continue,
                        FillOutcome::Consumed(fill) => fills.push(fill),
                        FillOutcome::Partial(fill) => {
                            // Maker keeps its place at the head.
                            queue.push_front(id);
                            fills.push(fill);
                        }
                    }
                }
            }
            ArrivalQueue::Relaxed(q) => {
                while !remaining.is_zero() {
                    let Some(id) = q.pop() else { break };
                    match self.fill_entry(&id, remaining) {
                        FillOutcome::Tombstone => continue,
                        FillOutcome::Consumed(fill) => fills.push(fill),
                        FillOutcome::Partial(fill) => {
                            // Re-queued at the back: time priority within the
                            // level is relaxed on this path.
                            q.push(id);
                            fills.push(fill);
                        }
                    }
                }
            }
        }
    }

    fn fill_entry(&self, id: &OrderId, remaining: &mut Quantity) -> FillOutcome {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return FillOutcome::Tombstone;
        };
        let fill = (*remaining).min(entry.remaining);
        entry.remaining = entry.remaining.saturating_sub(fill);
        *remaining = remaining.saturating_sub(fill);
        self.total_quantity.fetch_sub(fill.raw(), Ordering::Relaxed);
        let exhausted = entry.remaining.is_zero();
        drop(entry);
        if exhausted {
            self.entries.remove(id);
        }
        let level_fill = LevelFill {
            maker_order_id: *id,
            quantity: fill,
            maker_exhausted: exhausted,
        };
        if exhausted {
            FillOutcome::Consumed(level_fill)
        } else {
            FillOutcome::Partial(level_fill)
        }
    }
}

enum FillOutcome {
    /// Canceled earlier; id skipped.
    Tombstone,
    /// Entry fully consumed and removed.
    Consumed(LevelFill),
    /// Entry partially consumed, still resting.
    Partial(LevelFill),
}
