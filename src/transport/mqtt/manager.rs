//! Impure half of the MQTT transport: the connection manager and the
//! supervisor task that drives the event loop.
//!
//! The manager owns exactly one logical broker connection. Lifecycle events
//! from the transport are the sole drivers of state transitions; the duplex
//! adapter only ever observes state, it never sets it.

use super::connection::{route_link_event, ConnectionState, LinkEvent, RECONNECT_POLL_DELAY};
use crate::error::{StreamError, StreamResult};
use crate::stream::{InboundBuffer, StreamEvent, TopicRouter};
use crate::transport::BrokerLink;
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, EventLoop};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Live MQTT client behind the [`BrokerLink`] seam.
pub struct MqttLink {
    client: AsyncClient,
}

impl MqttLink {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrokerLink for MqttLink {
    async fn subscribe(&self, topic: &str) -> StreamResult<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| StreamError::SubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> StreamResult<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| StreamError::PublishFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Supervises one broker connection: state machine, subscription, inbound
/// buffering, and fire-and-forget publishing.
pub struct ConnectionManager {
    router: std::sync::Mutex<TopicRouter>,
    link: Mutex<Option<Arc<dyn BrokerLink>>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    buffer: Arc<InboundBuffer>,
    events_tx: broadcast::Sender<StreamEvent>,
}

impl ConnectionManager {
    pub fn new(router: TopicRouter) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            router: std::sync::Mutex::new(router),
            link: Mutex::new(None),
            state_tx,
            state_rx,
            buffer: Arc::new(InboundBuffer::new()),
            events_tx,
        }
    }

    /// Manager with a link already installed. Used by tests and by callers
    /// substituting a non-MQTT link.
    pub fn with_link(router: TopicRouter, link: Arc<dyn BrokerLink>) -> Self {
        let mut manager = Self::new(router);
        manager.link = Mutex::new(Some(link));
        manager
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Derived boolean the pull/push guards check. True iff the state
    /// machine is in `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch receiver for state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Suspend until the state machine enters `Connected`. Callers must
    /// re-check their own guard after this returns: the state may have
    /// moved again before they run.
    pub async fn wait_connected(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx
            .wait_for(|state| *state == ConnectionState::Connected)
            .await;
    }

    /// Observer notifications (`Connected`, `Disconnected`, `Message`,
    /// `Error`). Each call returns an independent receiver.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.events_tx.subscribe()
    }

    pub fn buffer(&self) -> &Arc<InboundBuffer> {
        &self.buffer
    }

    pub fn subscribe_topic(&self) -> String {
        self.router
            .lock()
            .expect("router lock poisoned")
            .subscribe_topic()
    }

    pub fn publish_topic(&self) -> String {
        self.router
            .lock()
            .expect("router lock poisoned")
            .publish_topic()
    }

    /// Replace the stream id ahead of a (re)connect.
    pub fn override_stream_id(&self, stream_id: &str) {
        let mut router = self.router.lock().expect("router lock poisoned");
        *router = router.with_stream_id(stream_id);
    }

    pub async fn install_link(&self, link: Arc<dyn BrokerLink>) {
        *self.link.lock().await = Some(link);
    }

    pub async fn clear_link(&self) {
        *self.link.lock().await = None;
    }

    async fn current_link(&self) -> Option<Arc<dyn BrokerLink>> {
        self.link.lock().await.clone()
    }

    pub fn mark_connecting(&self) {
        self.state_tx.send_replace(ConnectionState::Connecting);
    }

    pub fn mark_disconnected(&self) {
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Transport dropped. The state transition pauses pull/push; the error
    /// notification is the only report the failure gets.
    pub fn mark_offline(&self, reason: String) {
        self.state_tx.send_replace(ConnectionState::Offline);
        self.emit(StreamEvent::Error(reason));
    }

    /// Apply one transport lifecycle event to the stream state. This is the
    /// single entry point through which the supervisor (or a test driving a
    /// mock link) advances the state machine.
    pub async fn apply_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::ConnectionAcknowledged => {
                let topic = self.subscribe_topic();
                if let Some(link) = self.current_link().await {
                    match link.subscribe(&topic).await {
                        Ok(()) => debug!("Subscribed to {topic}"),
                        Err(e) => {
                            // Fatal to this connection attempt only; the
                            // supervisor keeps the session alive.
                            error!("Subscribe to {topic} failed: {e}");
                            self.emit(StreamEvent::Error(e.to_string()));
                        }
                    }
                }
                self.state_tx.send_replace(ConnectionState::Connected);
                info!("Connected");
                self.emit(StreamEvent::Connected);
            }
            LinkEvent::MessageArrived { topic, payload } => {
                trace!("Message on {topic} ({} bytes)", payload.len());
                self.buffer.push(payload);
                self.emit(StreamEvent::Message);
            }
            LinkEvent::Disconnected => {
                warn!("Broker closed the session");
                self.state_tx.send_replace(ConnectionState::Disconnected);
                self.emit(StreamEvent::Disconnected);
            }
            LinkEvent::Infrastructure(desc) => {
                trace!("Transport event: {desc}");
            }
            LinkEvent::Outgoing => {}
        }
    }

    /// Fire-and-forget publish to the stream's publish topic. No error
    /// reaches the caller; a failed send surfaces only as an `Error`
    /// notification.
    pub async fn publish(&self, payload: Vec<u8>) {
        let topic = self.publish_topic();
        let Some(link) = self.current_link().await else {
            warn!("Publish to {topic} dropped: no broker link installed");
            return;
        };

        if let Err(e) = link.publish(&topic, payload).await {
            warn!("Publish to {topic} failed: {e}");
            self.emit(StreamEvent::Error(e.to_string()));
        }
    }

    fn emit(&self, event: StreamEvent) {
        // Send only fails when nobody is listening, which is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Drive the MQTT event loop for the lifetime of the connection. A poll
/// failure marks the stream offline and retries after a fixed delay; the
/// event loop re-dials on the next poll, and the resulting ConnAck performs
/// the re-subscription.
pub(crate) fn start_supervisor(
    manager: Arc<ConnectionManager>,
    mut event_loop: EventLoop,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reconnect_attempts = 0u32;
        loop {
            match event_loop.poll().await {
                Ok(event) => {
                    let link_event = route_link_event(&event);
                    if matches!(link_event, LinkEvent::ConnectionAcknowledged)
                        && reconnect_attempts > 0
                    {
                        info!("Reconnected after {reconnect_attempts} attempts");
                        reconnect_attempts = 0;
                    }
                    manager.apply_event(link_event).await;
                }
                Err(e) => {
                    reconnect_attempts += 1;
                    warn!("Transport error (reconnect attempt {reconnect_attempts}): {e}");
                    manager.mark_offline(e.to_string());
                    tokio::time::sleep(RECONNECT_POLL_DELAY).await;
                }
            }
        }
    })
}

/// Construct a fresh client/event-loop pair for a connection attempt.
pub(crate) fn create_connection(
    options: rumqttc::v5::MqttOptions,
) -> (AsyncClient, EventLoop) {
    AsyncClient::new(options, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBroker;
    use bytes::Bytes;

    fn test_manager(link: Arc<MockBroker>) -> ConnectionManager {
        let router = TopicRouter::new("io_acme", "feeds", "pump-1");
        ConnectionManager::with_link(router, link)
    }

    #[tokio::test]
    async fn test_connack_subscribes_and_connects() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker.clone());
        let mut events = manager.events();

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        manager.apply_event(LinkEvent::ConnectionAcknowledged).await;

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert!(manager.is_connected());
        assert_eq!(
            broker.subscriptions().await,
            vec!["io_acme/feeds/pump-1/json".to_string()]
        );
        assert_eq!(events.recv().await.unwrap(), StreamEvent::Connected);
    }

    #[tokio::test]
    async fn test_message_arrival_buffers_and_notifies() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker);
        let mut events = manager.events();

        manager
            .apply_event(LinkEvent::MessageArrived {
                topic: "io_acme/feeds/pump-1/json".to_string(),
                payload: Bytes::from_static(b"21.5"),
            })
            .await;

        assert_eq!(manager.buffer().len(), 1);
        assert_eq!(
            manager.buffer().pop_or_null(),
            Some(Bytes::from_static(b"21.5"))
        );
        assert_eq!(events.recv().await.unwrap(), StreamEvent::Message);
    }

    #[tokio::test]
    async fn test_disconnect_event_sets_state() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker);

        manager.apply_event(LinkEvent::ConnectionAcknowledged).await;
        manager.apply_event(LinkEvent::Disconnected).await;

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_offline_emits_error_and_keeps_buffer() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker);
        let mut events = manager.events();

        manager
            .apply_event(LinkEvent::MessageArrived {
                topic: "io_acme/feeds/pump-1/json".to_string(),
                payload: Bytes::from_static(b"kept"),
            })
            .await;
        let _ = events.recv().await;

        manager.mark_offline("connection reset".to_string());

        assert_eq!(manager.state(), ConnectionState::Offline);
        // Buffer is not flushed on connection loss
        assert_eq!(manager.buffer().len(), 1);
        match events.recv().await.unwrap() {
            StreamEvent::Error(reason) => assert!(reason.contains("connection reset")),
            other => panic!("expected Error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_is_fire_and_forget() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker.clone());

        manager.publish(b"on".to_vec()).await;

        assert_eq!(
            broker.published().await,
            vec![("io_acme/feeds/pump-1".to_string(), b"on".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_publish_failure_surfaces_only_as_event() {
        let broker = Arc::new(MockBroker::with_publish_failure());
        let manager = test_manager(broker);
        let mut events = manager.events();

        // Does not return an error and does not panic
        manager.publish(b"on".to_vec()).await;

        match events.recv().await.unwrap() {
            StreamEvent::Error(_) => {}
            other => panic!("expected Error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribe_failure_still_connects() {
        let broker = Arc::new(MockBroker::with_subscribe_failure());
        let manager = test_manager(broker);
        let mut events = manager.events();

        manager.apply_event(LinkEvent::ConnectionAcknowledged).await;

        // Malformed-topic style failures are fatal to the subscription but
        // the session itself stays up; the failure is observable as an event.
        assert_eq!(manager.state(), ConnectionState::Connected);
        match events.recv().await.unwrap() {
            StreamEvent::Error(_) => {}
            other => panic!("expected Error event, got {other:?}"),
        }
        assert_eq!(events.recv().await.unwrap(), StreamEvent::Connected);
    }

    #[tokio::test]
    async fn test_override_stream_id() {
        let broker = Arc::new(MockBroker::new());
        let manager = test_manager(broker);

        manager.override_stream_id("pump-2");
        assert_eq!(manager.subscribe_topic(), "io_acme/feeds/pump-2/json");
        assert_eq!(manager.publish_topic(), "io_acme/feeds/pump-2");
    }
}
