//! Transport layer: the broker link abstraction and its MQTT implementation.

use crate::error::StreamResult;

pub mod mqtt;

/// Minimal broker operations the connection manager needs.
///
/// The adapter targets exactly one subscription and one publish target, so
/// the trait is deliberately narrow. The MQTT implementation wraps a live
/// client; tests substitute a recording mock.
#[async_trait::async_trait]
pub trait BrokerLink: Send + Sync {
    /// Subscribe to a topic. Subscribing to an already-subscribed topic is
    /// a broker-side no-op, so duplicate calls after reconnects are fine.
    async fn subscribe(&self, topic: &str) -> StreamResult<()>;

    /// Publish a payload. At-most-once, no acknowledgement awaited.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> StreamResult<()>;
}

pub use mqtt::{ConnectionManager, ConnectionState, MqttLink};
