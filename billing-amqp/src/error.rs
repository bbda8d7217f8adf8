use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmqpError {
    #[error("amqp connection error: {0}")]
    Connection(#[from] lapin::Error),

    #[error("failed to decode event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("delivery handler failed: {0}")]
    Handler(String),
}
