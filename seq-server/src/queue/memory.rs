//! In-memory audit queue (tests and same-process runs)
//!
//! Keeps the broker semantics the consumers rely on: FIFO delivery,
//! manual ack, redelivery on nack-with-requeue, and a dead-letter
//! buffer for rejected messages.

use async_trait::async_trait;
use shared::models::AuditEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{Acker, AuditQueue, Delivery, QueueError};

#[derive(Debug, Clone)]
struct QueuedMessage {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct Inner {
    ready: Mutex<VecDeque<QueuedMessage>>,
    dead: Mutex<Vec<Vec<u8>>>,
    notify: Notify,
    closed: AtomicBool,
    fail_publishes: AtomicBool,
}

/// In-process audit queue
#[derive(Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw payload, bypassing serialization. Lets tests feed
    /// consumers unparseable messages.
    pub fn publish_raw(&self, payload: Vec<u8>) {
        self.inner.ready.lock().unwrap().push_back(QueuedMessage {
            payload,
            redelivered: false,
        });
        self.inner.notify.notify_waiters();
    }

    /// Make subsequent publishes fail (or succeed again).
    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Stop delivery; pending receivers get `None`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn pending_count(&self) -> usize {
        self.inner.ready.lock().unwrap().len()
    }

    pub fn dead_letter_count(&self) -> usize {
        self.inner.dead.lock().unwrap().len()
    }
}

#[async_trait]
impl AuditQueue for MemoryQueue {
    async fn publish(&self, event: &AuditEvent) -> Result<(), QueueError> {
        if self.inner.fail_publishes.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("broker rejected publish".into()));
        }
        let payload =
            serde_json::to_vec(event).map_err(|e| QueueError::Unavailable(e.to_string()))?;
        self.publish_raw(payload);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        loop {
            if self.inner.closed.load(Ordering::SeqCst) {
                return Ok(None);
            }
            // Arm the waiter before checking so a publish racing this
            // check cannot be missed.
            let notified = self.inner.notify.notified();
            if let Some(msg) = self.inner.ready.lock().unwrap().pop_front() {
                let acker = MemoryAcker {
                    inner: self.inner.clone(),
                    payload: msg.payload.clone(),
                };
                return Ok(Some(Delivery::new(
                    msg.payload,
                    msg.redelivered,
                    Box::new(acker),
                )));
            }
            notified.await;
        }
    }

    async fn ping(&self) -> Result<(), QueueError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("queue is closed".into()));
        }
        Ok(())
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    payload: Vec<u8>,
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        Ok(())
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), QueueError> {
        if requeue {
            self.inner.ready.lock().unwrap().push_front(QueuedMessage {
                payload: self.payload,
                redelivered: true,
            });
            self.inner.notify.notify_waiters();
        } else {
            self.inner.dead.lock().unwrap().push(self.payload);
        }
        Ok(())
    }
}
