//! Audit consumer worker pool
//!
//! Reads audit events off the queue and materializes them as audit
//! rows. Delivery is at-least-once, so the insert is idempotent and a
//! redelivered event is simply acknowledged again. An unparseable
//! message goes straight to the dead-letter queue; a transient store
//! failure is retried by republishing the event with its retry count
//! bumped (the original delivery is acked), until the retry budget is
//! exhausted and the event is dead-lettered.
//!
//! Workers never lose an unacknowledged message: a crash before ack
//! leaves the message with the broker for redelivery.

use shared::models::AuditEvent;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::AuditStore;
use crate::queue::{AuditQueue, Delivery};

/// Deliveries of one event before it is dead-lettered
pub const RETRY_LIMIT: u32 = 3;

/// Competing-consumer pool over the audit queue
pub struct AuditConsumer {
    store: Arc<dyn AuditStore>,
    queue: Arc<dyn AuditQueue>,
    workers: usize,
}

impl AuditConsumer {
    pub fn new(store: Arc<dyn AuditStore>, queue: Arc<dyn AuditQueue>, workers: usize) -> Self {
        Self {
            store,
            queue,
            workers: workers.max(1),
        }
    }

    /// Run the pool until the token is cancelled or the queue closes,
    /// then drain: a worker finishes its in-flight event before exiting.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(workers = self.workers, "Audit consumer started");

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let worker = Worker {
                store: self.store.clone(),
                queue: self.queue.clone(),
                worker_id,
            };
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move { worker.run(cancel).await }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = ?e, "Consumer worker panicked");
            }
        }
        tracing::info!("Audit consumer stopped");
    }
}

struct Worker {
    store: Arc<dyn AuditStore>,
    queue: Arc<dyn AuditQueue>,
    worker_id: usize,
}

impl Worker {
    async fn run(&self, cancel: CancellationToken) {
        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.queue.receive() => next,
            };
            match delivery {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, worker = self.worker_id, "Failed to read from audit queue");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }
        tracing::debug!(worker = self.worker_id, "Consumer worker stopping");
    }

    async fn process(&self, delivery: Delivery) {
        let event: AuditEvent = match serde_json::from_slice(&delivery.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting unparseable audit event to dead-letter queue");
                if let Err(e) = delivery.nack(false).await {
                    tracing::error!(error = %e, "Failed to dead-letter unparseable event");
                }
                return;
            }
        };

        let started = now_millis();
        let redelivered = delivery.redelivered;
        match self.store.insert_audit_row(&event).await {
            Ok(()) => {
                if let Err(e) = delivery.ack().await {
                    tracing::error!(
                        error = %e,
                        message_id = %event.message_id,
                        "Failed to ack processed audit event"
                    );
                    return;
                }
                tracing::debug!(
                    message_id = %event.message_id,
                    prefix = %event.prefix,
                    counter = event.counter,
                    full_number = %event.full_number,
                    elapsed_ms = now_millis() - started,
                    redelivered = redelivered,
                    "Audit row recorded"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    message_id = %event.message_id,
                    prefix = %event.prefix,
                    counter = event.counter,
                    retry_count = event.retry_count,
                    "Failed to insert audit row"
                );
                self.retry_or_dead_letter(delivery, event).await;
            }
        }
    }

    /// Transient store failure: bump the retry count durably by
    /// republishing, or dead-letter once the budget is spent. The
    /// original delivery is only acked after the replacement is safely
    /// with the broker, so the event can never be lost in between.
    async fn retry_or_dead_letter(&self, delivery: Delivery, mut event: AuditEvent) {
        let attempts = event.retry_count + 1;
        if attempts >= RETRY_LIMIT {
            tracing::error!(
                message_id = %event.message_id,
                prefix = %event.prefix,
                counter = event.counter,
                "AUDIT EVENT DEAD-LETTERED after {} attempts",
                attempts
            );
            if let Err(e) = delivery.nack(false).await {
                tracing::error!(error = %e, "Failed to dead-letter audit event");
            }
            return;
        }

        event.retry_count = attempts;
        match self.queue.publish(&event).await {
            Ok(()) => {
                tracing::warn!(
                    message_id = %event.message_id,
                    retry_count = attempts,
                    "Requeued audit event after store failure"
                );
                if let Err(e) = delivery.ack().await {
                    tracing::error!(error = %e, "Failed to ack requeued audit event");
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    message_id = %event.message_id,
                    "Failed to republish audit event; leaving delivery for broker redelivery"
                );
                if let Err(e) = delivery.nack(true).await {
                    tracing::error!(error = %e, "Failed to nack audit event");
                }
            }
        }
    }
}
