//! AMQP (RabbitMQ) audit queue implementation
//!
//! Topology declared on connect: a durable direct exchange, a durable
//! queue bound under [`ROUTING_KEY`] with a 24h message TTL and a
//! dead-letter route to `<queue>_dlq`, and the dead-letter queue itself.
//! Messages are published persistent (delivery mode 2).

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use shared::models::AuditEvent;
use tokio::sync::Mutex;

use super::{Acker, AuditQueue, Delivery, QueueError, MESSAGE_TTL_MS, ROUTING_KEY};

/// Connection settings for the audit queue
#[derive(Debug, Clone)]
pub struct AmqpSettings {
    pub url: String,
    pub exchange: String,
    pub queue: String,
    pub prefetch: u16,
}

/// Audit queue backed by RabbitMQ
pub struct AmqpQueue {
    conn: Connection,
    channel: Channel,
    consumer: Mutex<Option<Consumer>>,
    exchange: String,
    queue: String,
}

impl AmqpQueue {
    /// Connect and declare the full topology.
    pub async fn connect(settings: &AmqpSettings) -> Result<Self, QueueError> {
        let conn = Connection::connect(&settings.url, ConnectionProperties::default())
            .await
            .map_err(unavailable)?;
        let channel = conn.create_channel().await.map_err(unavailable)?;

        channel
            .exchange_declare(
                &settings.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(unavailable)?;

        let dlq_name = format!("{}_dlq", settings.queue);
        let mut args = FieldTable::default();
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString("".into()),
        );
        args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(dlq_name.clone().into()),
        );
        args.insert("x-message-ttl".into(), AMQPValue::LongLongInt(MESSAGE_TTL_MS));

        channel
            .queue_declare(
                &settings.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                args,
            )
            .await
            .map_err(unavailable)?;

        channel
            .queue_declare(
                &dlq_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(unavailable)?;

        channel
            .queue_bind(
                &settings.queue,
                &settings.exchange,
                ROUTING_KEY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(unavailable)?;

        channel
            .basic_qos(settings.prefetch, BasicQosOptions::default())
            .await
            .map_err(unavailable)?;

        Ok(Self {
            conn,
            channel,
            consumer: Mutex::new(None),
            exchange: settings.exchange.clone(),
            queue: settings.queue.clone(),
        })
    }
}

#[async_trait]
impl AuditQueue for AmqpQueue {
    async fn publish(&self, event: &AuditEvent) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(event).map_err(|e| QueueError::Unavailable(e.to_string()))?;

        let mut properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_content_type("application/json".into())
            .with_message_id(event.message_id.to_string().into());
        if let Some(correlation_id) = &event.correlation_id {
            properties = properties.with_correlation_id(correlation_id.clone().into());
        }

        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                ROUTING_KEY,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(unavailable)?;
        confirm.await.map_err(unavailable)?;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let mut guard = self.consumer.lock().await;
        if guard.is_none() {
            let consumer = self
                .channel
                .basic_consume(
                    &self.queue,
                    "seq-audit-consumer",
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(unavailable)?;
            *guard = Some(consumer);
        }

        match guard.as_mut().unwrap().next().await {
            None => Ok(None),
            Some(Err(e)) => Err(unavailable(e)),
            Some(Ok(delivery)) => {
                let redelivered = delivery.redelivered;
                let payload = delivery.data.clone();
                let acker = AmqpAcker {
                    acker: delivery.acker,
                };
                Ok(Some(Delivery::new(payload, redelivered, Box::new(acker))))
            }
        }
    }

    async fn ping(&self) -> Result<(), QueueError> {
        if self.conn.status().connected() {
            Ok(())
        } else {
            Err(QueueError::Unavailable("connection is closed".into()))
        }
    }
}

struct AmqpAcker {
    acker: lapin::acker::Acker,
}

#[async_trait]
impl Acker for AmqpAcker {
    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(unavailable)
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), QueueError> {
        self.acker
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await
            .map_err(unavailable)
    }
}

fn unavailable(e: lapin::Error) -> QueueError {
    QueueError::Unavailable(e.to_string())
}
