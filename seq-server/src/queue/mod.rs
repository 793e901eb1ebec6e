//! Audit queue
//!
//! Durable queue between the issuer and the audit consumers. Publishing
//! is fire-and-forget with broker ack; consumption is manual-ack with
//! bounded prefetch so an unacknowledged message is redelivered if a
//! consumer dies mid-flight.
//!
//! The trait is the integration seam: production speaks AMQP, tests run
//! against the in-memory queue which keeps the same redelivery and
//! dead-letter semantics.

mod amqp;
mod memory;

pub use amqp::{AmqpQueue, AmqpSettings};
pub use memory::MemoryQueue;

use async_trait::async_trait;
use shared::models::AuditEvent;
use thiserror::Error;

/// Routing key all audit events are published under
pub const ROUTING_KEY: &str = "seq.log";

/// Queue-level message TTL (24h), after which the broker dead-letters
pub const MESSAGE_TTL_MS: i64 = 86_400_000;

/// Queue error types
#[derive(Debug, Error)]
pub enum QueueError {
    /// Broker unreachable or refused the operation (retryable)
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Manual acknowledgement handle for one in-flight delivery
#[async_trait]
pub trait Acker: Send {
    async fn ack(self: Box<Self>) -> Result<(), QueueError>;

    /// Reject the delivery. `requeue` sends it back for redelivery;
    /// otherwise it goes to the dead-letter queue.
    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), QueueError>;
}

/// One in-flight message read from the queue
pub struct Delivery {
    pub payload: Vec<u8>,
    pub redelivered: bool,
    acker: Box<dyn Acker>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, acker: Box<dyn Acker>) -> Self {
        Self {
            payload,
            redelivered,
            acker,
        }
    }

    pub async fn ack(self) -> Result<(), QueueError> {
        self.acker.ack().await
    }

    pub async fn nack(self, requeue: bool) -> Result<(), QueueError> {
        self.acker.nack(requeue).await
    }
}

/// Audit queue seam
#[async_trait]
pub trait AuditQueue: Send + Sync {
    /// Publish one event durably. Returns once the broker has taken
    /// responsibility for the message; consumers are never awaited.
    async fn publish(&self, event: &AuditEvent) -> Result<(), QueueError>;

    /// Receive the next delivery, waiting if the queue is empty.
    /// Returns `None` once the queue has been closed.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), QueueError>;
}
