use async_trait::async_trait;
use billing_core::domain::{DomainEvent, EventEnvelope};
use billing_core::error::{BillingError, BillingResult};
use billing_core::service::EventPublisher;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::types::ShortString;
use lapin::{BasicProperties, Connection};

use crate::topology::declare_topology;

/// Publishes [`DomainEvent`]s to the topic exchange described in §4.7.
///
/// Opens (and confirms) a fresh channel per publish rather than holding a
/// long-lived one: per §5, channel isolation per message keeps a transient
/// broker error from corrupting an unrelated in-flight request.
pub struct LapinEventPublisher {
    connection: Connection,
    exchange: String,
    app_id: String,
}

impl LapinEventPublisher {
    pub fn new(connection: Connection, exchange: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            connection,
            exchange: exchange.into(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for LapinEventPublisher {
    async fn publish(&self, event: DomainEvent) -> BillingResult<()> {
        let channel = match self.connection.create_channel().await {
            Ok(channel) => channel,
            Err(first_err) => {
                tracing::warn!(error = %first_err, "failed to open amqp channel, retrying once");
                self.connection
                    .create_channel()
                    .await
                    .map_err(|err| BillingError::Internal(format!("failed to open amqp channel: {err}")))?
            }
        };

        declare_topology(&channel, &self.exchange, None)
            .await
            .map_err(|err| BillingError::Internal(format!("failed to declare amqp topology: {err}")))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|err| BillingError::Internal(format!("failed to enable publisher confirms: {err}")))?;

        let routing_key = event.routing_key();
        let envelope = EventEnvelope {
            timestamp: chrono::Utc::now(),
            app_id: self.app_id.clone(),
            event,
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|err| BillingError::Internal(format!("failed to encode domain event: {err}")))?;

        let properties = BasicProperties::default()
            .with_content_type(ShortString::from("application/json"))
            .with_delivery_mode(2) // persistent
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_app_id(ShortString::from(self.app_id.clone()));

        let confirm = channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(|err| BillingError::Internal(format!("failed to publish domain event: {err}")))?
            .await
            .map_err(|err| BillingError::Internal(format!("broker did not confirm publish: {err}")))?;

        if confirm.is_nack() {
            return Err(BillingError::Internal(
                "broker nacked the published domain event".to_string(),
            ));
        }

        Ok(())
    }
}
