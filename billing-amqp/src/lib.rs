pub mod consumer;
pub mod error;
pub mod publisher;
pub mod topology;

pub use consumer::{EventConsumer, EventHandler};
pub use error::AmqpError;
pub use publisher::LapinEventPublisher;
pub use topology::{declare_topology, open_connection, ROUTING_KEYS};
