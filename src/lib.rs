//! feedpipe - bidirectional stream adapter over MQTT
//!
//! Bridges a topic-based publish/subscribe broker connection to a plain
//! pull/push byte-stream contract, so stream-consuming code (parsers,
//! loggers, pipes) can read and write chunks with no awareness of broker
//! semantics: topics, subscriptions, credentials, and reconnection all stay
//! inside the adapter.
//!
//! # Overview
//!
//! One [`FeedStream`] instance owns one broker connection, one subscription
//! (`{identity}/{channel_type}/{stream_id}/json`), and one publish target
//! (`{identity}/{channel_type}/{stream_id}`). Inbound messages queue in an
//! unbounded FIFO and come out of [`FeedStream::pull`] in arrival order;
//! [`FeedStream::push`] trims a chunk and sends it as a single
//! fire-and-forget message. Both paths suspend while the connection is
//! down and resume on reconnect; the supervisor re-subscribes after every
//! reconnect on its own.
//!
//! # Quick Start
//!
//! ```no_run
//! use feedpipe::{FeedStream, StreamConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config: StreamConfig = toml::from_str(r#"
//! identity = "io_acme"
//! stream_id = "pump-1"
//! credential_secret_env = "FEEDPIPE_KEY"
//! "#)?;
//!
//! let mut stream = FeedStream::new(config)?;
//! stream.connect(None).await?;
//!
//! stream.push(b"on\n").await;          // publishes "on"
//! let chunk = stream.pull().await;     // next inbound payload, FIFO
//! println!("{}", String::from_utf8_lossy(&chunk));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod stream;
pub mod testing;
pub mod transport;

pub use config::{ConfigError, StreamConfig, SECURE_PORT};
pub use error::{StreamError, StreamResult};
pub use stream::{FeedStream, InboundBuffer, StreamEvent, TopicRouter};
pub use transport::mqtt::{ConnectionManager, ConnectionState};
pub use transport::BrokerLink;
