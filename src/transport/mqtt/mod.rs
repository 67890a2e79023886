//! MQTT transport implementation
//!
//! Split into pure and impure halves, mirroring how the event loop is
//! supervised: `connection` holds state types, option construction, and
//! packet-to-event routing (all pure and unit-testable); `manager` owns the
//! live client, the supervisor task, and the shared stream state.

pub mod connection;
pub mod manager;

pub use connection::{ConnectionState, LinkEvent, CONNECT_TIMEOUT, KEEP_ALIVE};
pub use manager::{ConnectionManager, MqttLink};
