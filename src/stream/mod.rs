//! Stream-side components: topic derivation, the inbound buffer, and the
//! duplex adapter that presents the pull/push contract to consumers.

pub mod adapter;
pub mod buffer;
pub mod topics;

pub use adapter::FeedStream;
pub use buffer::InboundBuffer;
pub use topics::TopicRouter;

/// Asynchronous notifications exposed to observers of a stream.
///
/// These mirror the transport lifecycle: `Connected` fires on every
/// transition into the connected state (including reconnects), `Message`
/// fires when a payload lands in the inbound buffer, and `Error` carries
/// transport-originated failures that have no synchronous caller to return
/// to.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Disconnected,
    Message,
    Error(String),
}
