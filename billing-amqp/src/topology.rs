use billing_core::domain::{
    ROUTING_KEY_CUSTOMER_CREATED, ROUTING_KEY_CUSTOMER_DELINQUENCY_CHANGED, ROUTING_KEY_CUSTOMER_UPDATED,
};
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::error::AmqpError;

/// The three routing keys every customer mutation is published under (§4.7).
pub const ROUTING_KEYS: [&str; 3] = [
    ROUTING_KEY_CUSTOMER_CREATED,
    ROUTING_KEY_CUSTOMER_UPDATED,
    ROUTING_KEY_CUSTOMER_DELINQUENCY_CHANGED,
];

/// Opens an AMQP connection on the tokio reactor, per the topology shared
/// by the publisher (billing-server) and consumer (notify-service) sides.
pub async fn open_connection(uri: &str) -> Result<Connection, AmqpError> {
    let properties = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);
    Connection::connect(uri, properties).await.map_err(AmqpError::from)
}

/// Declares the durable topic exchange, and — when `queue_name` is given
/// — a durable queue bound to every routing key in [`ROUTING_KEYS`].
/// Idempotent: safe to call on both the publishing and consuming side.
pub async fn declare_topology(
    channel: &Channel,
    exchange: &str,
    queue_name: Option<&str>,
) -> Result<(), AmqpError> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    if let Some(queue_name) = queue_name {
        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        for routing_key in ROUTING_KEYS {
            channel
                .queue_bind(
                    queue_name,
                    exchange,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }
    }

    Ok(())
}
