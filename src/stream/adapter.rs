//! Duplex stream adapter
//!
//! Bridges the broker connection to a plain pull/push byte-stream contract.
//! Consumers read chunks and write chunks; topics, subscriptions,
//! credentials, and reconnection stay on this side of the boundary.
//!
//! Both paths follow the same shape: check the guard, suspend on the
//! relevant notification if it fails, then retry from the top. The re-check
//! after every resumption is mandatory since the condition may have changed
//! again before the woken task runs.

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::stream::{StreamEvent, TopicRouter};
use crate::transport::mqtt::connection::{configure_mqtt_options, CONNECT_TIMEOUT};
use crate::transport::mqtt::manager::{create_connection, start_supervisor};
use crate::transport::mqtt::{ConnectionManager, ConnectionState, MqttLink};
use crate::transport::BrokerLink;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Bidirectional stream over one subscribe/publish topic pair.
///
/// One instance corresponds to one logical conversation with one remote
/// endpoint: a single broker connection, a single subscription, a single
/// publish target.
pub struct FeedStream {
    config: StreamConfig,
    manager: Arc<ConnectionManager>,
    supervisor: Option<JoinHandle<()>>,
}

impl FeedStream {
    /// Build an adapter from a config. No connection is attempted until
    /// [`connect`](Self::connect) is called.
    pub fn new(config: StreamConfig) -> StreamResult<Self> {
        let config = config.normalized()?;
        let router = TopicRouter::from_config(&config);

        Ok(Self {
            config,
            manager: Arc::new(ConnectionManager::new(router)),
            supervisor: None,
        })
    }

    /// Adapter over an externally supplied broker link, with no MQTT event
    /// loop. The caller (usually a test) drives the state machine through
    /// the manager directly.
    pub fn with_link(config: StreamConfig, link: Arc<dyn BrokerLink>) -> StreamResult<Self> {
        let config = config.normalized()?;
        let router = TopicRouter::from_config(&config);

        Ok(Self {
            config,
            manager: Arc::new(ConnectionManager::with_link(router, link)),
            supervisor: None,
        })
    }

    /// Connect to the broker, optionally overriding the configured stream
    /// id for this session. Waits up to the fixed connection budget for the
    /// broker's acknowledgement; the supervisor keeps the session alive
    /// (and re-subscribes) across later drops on its own.
    ///
    /// Re-invoking replaces the underlying connection: the previous
    /// supervisor is stopped and the state machine restarts at
    /// `Connecting`. The inbound buffer is preserved.
    pub async fn connect(&mut self, stream_id: Option<&str>) -> StreamResult<()> {
        if let Some(id) = stream_id {
            self.manager.override_stream_id(id);
        }

        if let Some(previous) = self.supervisor.take() {
            debug!("Replacing existing broker connection");
            previous.abort();
        }

        info!(
            "Establishing connection to {}:{}",
            self.config.host, self.config.port
        );

        let options = configure_mqtt_options(&self.config);
        let (client, event_loop) = create_connection(options);
        self.manager.install_link(Arc::new(MqttLink::new(client))).await;
        self.manager.mark_connecting();

        let handle = start_supervisor(self.manager.clone(), event_loop);

        let mut state_rx = self.manager.subscribe_state();
        let confirmed = tokio::time::timeout(
            CONNECT_TIMEOUT,
            state_rx.wait_for(|state| *state == ConnectionState::Connected),
        )
        .await;

        match confirmed {
            Ok(_) => {
                self.supervisor = Some(handle);
                Ok(())
            }
            Err(_) => {
                handle.abort();
                self.manager.clear_link().await;
                self.manager.mark_disconnected();
                Err(StreamError::ConnectTimeout(CONNECT_TIMEOUT.as_secs()))
            }
        }
    }

    /// Pull the next chunk of readable data, suspending while the
    /// connection is down or the inbound buffer is empty.
    ///
    /// Chunks come out in broker arrival order. The message is popped only
    /// at the moment it can be returned by value, so nothing is lost if
    /// this future is dropped while suspended.
    pub async fn pull(&self) -> Bytes {
        loop {
            if !self.manager.is_connected() {
                self.manager.wait_connected().await;
                continue;
            }

            if let Some(payload) = self.manager.buffer().pop_or_null() {
                return payload;
            }

            self.manager.buffer().wait_for_arrival().await;
        }
    }

    /// Push a chunk for transmission, suspending while the connection is
    /// down. The chunk is trimmed of surrounding whitespace and sent as a
    /// single broker message; completion means the send was handed to the
    /// transport, not that the broker acknowledged it.
    pub async fn push(&self, chunk: &[u8]) {
        loop {
            if !self.manager.is_connected() {
                self.manager.wait_connected().await;
                continue;
            }

            let payload = trim_chunk(chunk).to_vec();
            self.manager.publish(payload).await;
            return;
        }
    }

    /// Observer notifications for the owning session.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.manager.events()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Watch receiver for connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.manager.subscribe_state()
    }

    /// The manager backing this stream. Exposed so tests and embedders can
    /// drive lifecycle events without a live broker.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl Drop for FeedStream {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.take() {
            handle.abort();
        }
    }
}

/// Strip leading and trailing ASCII whitespace. Each push maps to exactly
/// one broker message, so line-oriented consumers can write `"on\n"` and
/// the remote side sees `"on"`.
fn trim_chunk(chunk: &[u8]) -> &[u8] {
    let start = chunk
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(chunk.len());
    let end = chunk
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &chunk[start..end]
}
