//! Mock broker link
//!
//! Records every subscribe and publish so tests can assert on ordering,
//! idempotence, and fire-and-forget behavior. Publishes are never
//! acknowledged — there is nothing to acknowledge — which is exactly the
//! contract the adapter promises its consumers.

use crate::error::{StreamError, StreamResult};
use crate::transport::BrokerLink;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Recording [`BrokerLink`] implementation.
#[derive(Debug, Default)]
pub struct MockBroker {
    subscriptions: Arc<Mutex<Vec<String>>>,
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    fail_subscribe: bool,
    fail_publish: bool,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker whose subscribe calls fail, for malformed-topic style errors.
    pub fn with_subscribe_failure() -> Self {
        Self {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    /// Broker whose publish calls fail at the transport layer.
    pub fn with_publish_failure() -> Self {
        Self {
            fail_publish: true,
            ..Default::default()
        }
    }

    /// Every subscribe call in order, duplicates included.
    pub async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().await.clone()
    }

    /// Distinct topics ever subscribed to. The broker treats a duplicate
    /// subscribe as a no-op, so this is the number of logical subscriptions.
    pub async fn unique_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .await
            .iter()
            .collect::<HashSet<_>>()
            .len()
    }

    /// Every publish in order as (topic, payload).
    pub async fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.subscriptions.lock().await.clear();
        self.published.lock().await.clear();
    }
}

#[async_trait]
impl BrokerLink for MockBroker {
    async fn subscribe(&self, topic: &str) -> StreamResult<()> {
        if self.fail_subscribe {
            return Err(StreamError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "mock subscribe failure".to_string(),
            });
        }
        self.subscriptions.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> StreamResult<()> {
        if self.fail_publish {
            return Err(StreamError::PublishFailed {
                topic: topic.to_string(),
                reason: "mock publish failure".to_string(),
            });
        }
        self.published.lock().await.push((topic.to_string(), payload));
        Ok(())
    }
}
