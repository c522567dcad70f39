//! Background expiry sweeper.
//!
//! Scans the primary index on a fixed cadence for open orders whose
//! `expires_at` has passed, expires them and forwards the cancel to the
//! engine. The scan is linear in open orders.

use super::service::OrderService;
use crate::utils::current_time_millis;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

impl OrderService {
    /// Run one sweep now. Returns the number of orders expired.
    pub fn sweep_expired(&self) -> usize {
        let now = current_time_millis();
        let candidates = self.expired_candidates(now);
        let mut expired = 0;
        for (id, symbol) in candidates {
            match self.expire(&id, &symbol) {
                Ok(_) => expired += 1,
                // Lost a race with a fill or cancel; nothing to do.
                Err(err) => warn!(order = %id, %err, "expiry skipped"),
            }
        }
        expired
    }

    /// Spawn the periodic sweeper at the configured cadence.
    pub fn start_expiry_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let period = Duration::from_secs(service.config().expiry_scan_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let expired = service.sweep_expired();
                if expired > 0 {
                    info!(expired, "expiry sweep");
                }
            }
        })
    }
}
