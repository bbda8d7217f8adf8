use std::sync::Arc;

use async_trait::async_trait;
use billing_core::domain::{DomainEvent, EventEnvelope};
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::Connection;
use tokio::sync::watch;

use crate::error::AmqpError;
use crate::topology::declare_topology;

/// Handles one decoded [`DomainEvent`] off the queue. Implementations own
/// whatever idempotent write the event drives; returning `Err` nacks the
/// delivery without requeue (§4.7 step 3 — dead-lettering, if any, is a
/// broker-config concern outside this crate).
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: DomainEvent) -> Result<(), AmqpError>;
}

/// Binds a durable queue to every routing key in
/// [`crate::topology::ROUTING_KEYS`] and dispatches each delivery to `H`,
/// per §4.7: prefetch=1, manual ack, malformed or handler-rejected
/// deliveries nacked without requeue.
pub struct EventConsumer<H: EventHandler> {
    connection: Connection,
    exchange: String,
    queue: String,
    consumer_tag: String,
    handler: Arc<H>,
}

impl<H: EventHandler> EventConsumer<H> {
    pub fn new(
        connection: Connection,
        exchange: impl Into<String>,
        queue: impl Into<String>,
        consumer_tag: impl Into<String>,
        handler: Arc<H>,
    ) -> Self {
        Self {
            connection,
            exchange: exchange.into(),
            queue: queue.into(),
            consumer_tag: consumer_tag.into(),
            handler,
        }
    }

    /// Consumes until `shutdown` reports `true`. On shutdown, cancels the
    /// consumer tag and lets whatever delivery is already in flight
    /// finish before returning, per the drain requirement in §4.7.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AmqpError> {
        let channel = self.connection.create_channel().await?;
        declare_topology(&channel, &self.exchange, Some(&self.queue)).await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;

        let mut consumer = channel
            .basic_consume(
                &self.queue,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        loop {
            tokio::select! {
                delivery = consumer.next() => {
                    let Some(delivery) = delivery else { break };
                    self.dispatch(delivery?).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        channel
                            .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
                            .await?;
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn dispatch(&self, delivery: Delivery) {
        let routing_key = delivery.routing_key.as_str().to_string();

        match serde_json::from_slice::<EventEnvelope>(&delivery.data) {
            Ok(envelope) => match self.handler.handle(envelope.event).await {
                Ok(()) => {
                    if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                        tracing::error!(error = %err, routing_key, "failed to ack delivery");
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, routing_key, "handler rejected delivery, nacking without requeue");
                    nack(&delivery).await;
                }
            },
            Err(err) => {
                tracing::error!(error = %err, routing_key, "malformed delivery body, nacking without requeue");
                nack(&delivery).await;
            }
        }
    }
}

async fn nack(delivery: &Delivery) {
    let options = BasicNackOptions {
        multiple: false,
        requeue: false,
    };
    if let Err(err) = delivery.nack(options).await {
        tracing::error!(error = %err, "failed to nack delivery");
    }
}
