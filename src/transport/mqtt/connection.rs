//! Pure connection state management for the MQTT transport
//!
//! State types, option construction, and the packet-to-event routing the
//! supervisor task relies on. Nothing in this module performs I/O.

use crate::config::StreamConfig;
use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::{Event, MqttOptions};
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;

/// Connection-establishment budget. Fixed by design, not tunable per call.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Keep-alive interval for the broker connection.
pub const KEEP_ALIVE: Duration = Duration::from_secs(3600);

/// Delay between event loop poll attempts after a transport failure. The
/// event loop re-establishes the TCP session on the next poll, so this is
/// the effective reconnect pacing.
pub const RECONNECT_POLL_DELAY: Duration = Duration::from_secs(1);

/// Connection lifecycle state.
///
/// Transitions are driven only by transport lifecycle events. A transport
/// `error` on its own never changes state; the terminal "closed" state does
/// not exist in this design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection established, or the broker closed the session
    Disconnected,
    /// Connection attempt in flight, ConnAck not yet received
    Connecting,
    /// ConnAck received, subscription active, pull/push may progress
    Connected,
    /// Transport dropped; the supervisor is retrying in the background
    Offline,
}

/// Transport event distilled to what the connection manager acts on.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// ConnAck received: (re)subscribe and unblock pull/push
    ConnectionAcknowledged,
    /// Payload arrived on the subscribed topic. The topic is not retained
    /// past this point: with a single subscription, every inbound message
    /// belongs to this stream.
    MessageArrived { topic: String, payload: Bytes },
    /// Broker closed the session
    Disconnected,
    /// SubAck, PingResp and the rest of the protocol machinery
    Infrastructure(String),
    /// Locally originated packet, handled by the event loop itself
    Outgoing,
}

/// Route a raw MQTT event to the action the manager takes on it.
pub fn route_link_event(event: &Event) -> LinkEvent {
    match event {
        Event::Incoming(incoming) => match incoming {
            Packet::ConnAck(_) => LinkEvent::ConnectionAcknowledged,
            Packet::Publish(publish) => LinkEvent::MessageArrived {
                topic: String::from_utf8_lossy(&publish.topic).to_string(),
                payload: publish.payload.clone(),
            },
            Packet::Disconnect(_) => LinkEvent::Disconnected,
            other => LinkEvent::Infrastructure(format!("{other:?}")),
        },
        Event::Outgoing(_) => LinkEvent::Outgoing,
    }
}

/// Build MQTT options from a stream config. TLS is selected solely by the
/// configured port being the well-known secure port.
pub fn configure_mqtt_options(config: &StreamConfig) -> MqttOptions {
    // Unique client id per connection attempt so a replaced connection never
    // collides with its predecessor on the broker.
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let client_id = format!(
        "feedpipe-{}-{}-{timestamp}",
        config.identity, config.stream_id
    );

    let mut mqtt_options = MqttOptions::new(client_id, &config.host, config.port);

    if config.is_secure() {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(secret) = config.credential_secret() {
        mqtt_options.set_credentials(config.credential_name(), &secret);
    }

    mqtt_options.set_keep_alive(KEEP_ALIVE);

    mqtt_options
}
