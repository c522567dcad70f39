//! Per-engine throughput and latency counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomics tracking orders processed, trades produced and single-order
/// latency. Shared freely across producer threads; never locked.
#[derive(Debug, Default)]
pub struct EngineStats {
    orders_processed: AtomicU64,
    trades_produced: AtomicU64,
    avg_latency_ns: AtomicU64,
    max_latency_ns: AtomicU64,
}

impl EngineStats {
    /// Create zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed order: its latency in nanoseconds and the number
    /// of trades it produced.
    ///
    /// The running mean is updated with a CAS loop over
    /// `(old_mean * (n - 1) + sample) / n`. Under contention the result is an
    /// approximation; batch samples offline for exact statistics.
    pub fn record(&self, latency_ns: u64, trade_count: usize) {
        let n = self.orders_processed.fetch_add(1, Ordering::Relaxed) + 1;
        if trade_count > 0 {
            self.trades_produced
                .fetch_add(trade_count as u64, Ordering::Relaxed);
        }

        loop {
            let old = self.avg_latency_ns.load(Ordering::Relaxed);
            let new = ((old as u128 * (n - 1) as u128 + latency_ns as u128) / n as u128) as u64;
            if self
                .avg_latency_ns
                .compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        loop {
            let old = self.max_latency_ns.load(Ordering::Relaxed);
            if latency_ns <= old {
                break;
            }
            if self
                .max_latency_ns
                .compare_exchange_weak(old, latency_ns, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> EngineMetrics {
        EngineMetrics {
            total_orders: self.orders_processed.load(Ordering::Relaxed),
            total_trades: self.trades_produced.load(Ordering::Relaxed),
            avg_latency_ns: self.avg_latency_ns.load(Ordering::Relaxed),
            max_latency_ns: self.max_latency_ns.load(Ordering::Relaxed),
        }
    }
}

/// A consistent snapshot of [`EngineStats`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineMetrics {
    /// Orders processed since engine start.
    pub total_orders: u64,
    /// Trades produced since engine start.
    pub total_trades: u64,
    /// Cumulative average single-order latency, nanoseconds.
    pub avg_latency_ns: u64,
    /// Maximum single-order latency, nanoseconds.
    pub max_latency_ns: u64,
}
