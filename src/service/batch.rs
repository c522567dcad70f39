//! Optional batched admission channel.
//!
//! Admissions and updates can be enqueued on a bounded channel and drained
//! by a worker that groups them by operation kind. A full channel falls back
//! to synchronous processing; back-pressure is never propagated to the
//! caller.

use super::requests::{OrderRequest, UpdateRequest};
use super::service::OrderService;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An operation accepted by the batch channel.
#[derive(Debug)]
pub enum BatchOp {
    /// Admit a new order.
    Create(OrderRequest),
    /// Update an existing order.
    Update(UpdateRequest),
}

/// Handle for submitting batched operations.
pub struct BatchSubmitter {
    service: Arc<OrderService>,
    sender: mpsc::Sender<BatchOp>,
    worker: JoinHandle<()>,
}

impl BatchSubmitter {
    /// Enqueue an operation. When the channel is full the operation is
    /// processed synchronously instead; results and errors are logged, not
    /// returned.
    pub fn submit(&self, op: BatchOp) {
        match self.sender.try_send(op) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(op))
            | Err(mpsc::error::TrySendError::Closed(op)) => {
                debug!("batch channel unavailable, processing synchronously");
                process_op(&self.service, op);
            }
        }
    }

    /// Stop the worker. Queued operations past this point are dropped.
    pub fn shutdown(self) {
        self.worker.abort();
    }
}

impl OrderService {
    /// Start the batch worker with the configured channel capacity.
    pub fn start_batch_worker(self: &Arc<Self>) -> BatchSubmitter {
        let capacity = self.config().batch_channel_size.max(1);
        let (sender, mut receiver) = mpsc::channel::<BatchOp>(capacity);
        let service = Arc::clone(self);

        let worker = tokio::spawn(async move {
            let mut creates: Vec<OrderRequest> = Vec::new();
            let mut updates: Vec<UpdateRequest> = Vec::new();
            while let Some(op) = receiver.recv().await {
                stage(op, &mut creates, &mut updates);
                while let Ok(more) = receiver.try_recv() {
                    stage(more, &mut creates, &mut updates);
                }

                debug!(
                    creates = creates.len(),
                    updates = updates.len(),
                    "draining batch"
                );
                for request in creates.drain(..) {
                    if let Err(err) = service.create(request) {
                        warn!(%err, "batched create failed");
                    }
                }
                for request in updates.drain(..) {
                    if let Err(err) = service.update(request) {
                        warn!(%err, "batched update failed");
                    }
                }
            }
        });

        BatchSubmitter {
            service: Arc::clone(self),
            sender,
            worker,
        }
    }
}

fn stage(op: BatchOp, creates: &mut Vec<OrderRequest>, updates: &mut Vec<UpdateRequest>) {
    match op {
        BatchOp::Create(request) => creates.push(request),
        BatchOp::Update(request) => updates.push(request),
    }
}

fn process_op(service: &OrderService, op: BatchOp) {
    match op {
        BatchOp::Create(request) => {
            if let Err(err) = service.create(request) {
                warn!(%err, "synchronous fallback create failed");
            }
        }
        BatchOp::Update(request) => {
            if let Err(err) = service.update(request) {
                warn!(%err, "synchronous fallback update failed");
            }
        }
    }
}
