//! Bounded TTL cache for order-id lookups.
//!
//! Write-through on create and update, invalidated on terminal transitions.
//! Misses fall through to the primary index. A background sweep drops
//! expired entries.

use crate::types::{Order, OrderId};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Most entries the cache retains; least-recently-used beyond this.
const DEFAULT_CAPACITY: usize = 10_000;

struct CachedOrder {
    order: Order,
    inserted_at: Instant,
    last_access: Instant,
}

/// Order lookup cache keyed by order id.
pub(crate) struct OrderCache {
    entries: DashMap<OrderId, CachedOrder>,
    ttl: Duration,
    capacity: usize,
}

impl OrderCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Fetch a live entry, refreshing its recency. Expired entries are
    /// dropped on access.
    pub(crate) fn get(&self, id: &OrderId) -> Option<Order> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(id)?;
            if now.duration_since(entry.inserted_at) <= self.ttl {
                entry.last_access = now;
                return Some(entry.order.clone());
            }
        }
        self.entries.remove(id);
        None
    }

    /// Insert or refresh an entry, evicting the least recently used entry
    /// when at capacity.
    pub(crate) fn put(&self, order: Order) {
        let now = Instant::now();
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&order.id) {
            self.evict_lru();
        }
        self.entries.insert(
            order.id,
            CachedOrder {
                order,
                inserted_at: now,
                last_access: now,
            },
        );
    }

    /// Drop an entry.
    pub(crate) fn invalidate(&self, id: &OrderId) {
        self.entries.remove(id);
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub(crate) fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, cached| now.duration_since(cached.inserted_at) <= self.ttl);
        before - self.entries.len()
    }

    /// Live entry count.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Spawn the periodic sweep task.
    pub(crate) fn start_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let dropped = cache.sweep();
                if dropped > 0 {
                    debug!(dropped, remaining = cache.len(), "order cache sweep");
                }
            }
        })
    }

    fn evict_lru(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_access)
            .map(|entry| *entry.key());
        if let Some(id) = oldest {
            self.entries.remove(&id);
        }
    }
}
