//! Topic derivation
//!
//! Pure construction of the subscribe/publish topic pair from an identity,
//! a channel type, and a stream id. No state, no errors: a malformed segment
//! is rejected at config load, and anything that slips through is simply a
//! topic the broker refuses.

use crate::config::StreamConfig;

/// Derives the one subscribe topic and one publish topic an adapter
/// instance uses.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRouter {
    identity: String,
    channel_type: String,
    stream_id: String,
}

impl TopicRouter {
    pub fn new(identity: &str, channel_type: &str, stream_id: &str) -> Self {
        Self {
            identity: identity.to_string(),
            channel_type: channel_type.to_string(),
            stream_id: stream_id.to_string(),
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(&config.identity, &config.channel_type, &config.stream_id)
    }

    /// Replace the stream id, keeping identity and channel type. Used when
    /// `connect()` is given an override id.
    pub fn with_stream_id(&self, stream_id: &str) -> Self {
        Self::new(&self.identity, &self.channel_type, stream_id)
    }

    /// Inbound topic: `{identity}/{channel_type}/{stream_id}/json`
    pub fn subscribe_topic(&self) -> String {
        format!(
            "{}/{}/{}/json",
            self.identity, self.channel_type, self.stream_id
        )
    }

    /// Outbound topic: `{identity}/{channel_type}/{stream_id}`
    pub fn publish_topic(&self) -> String {
        format!("{}/{}/{}", self.identity, self.channel_type, self.stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_pair() {
        let router = TopicRouter::new("io_acme", "feeds", "pump-1");
        assert_eq!(router.subscribe_topic(), "io_acme/feeds/pump-1/json");
        assert_eq!(router.publish_topic(), "io_acme/feeds/pump-1");
    }

    #[test]
    fn test_from_config() {
        let config: StreamConfig = toml::from_str(
            r#"
identity = "io_acme"
stream_id = "pump-1"
"#,
        )
        .unwrap();
        let config = config.normalized().unwrap();

        let router = TopicRouter::from_config(&config);
        assert_eq!(router.subscribe_topic(), "io_acme/feeds/pump-1/json");
    }

    #[test]
    fn test_with_stream_id_override() {
        let router = TopicRouter::new("io_acme", "feeds", "pump-1");
        let overridden = router.with_stream_id("pump-2");

        assert_eq!(overridden.publish_topic(), "io_acme/feeds/pump-2");
        // Original is untouched
        assert_eq!(router.publish_topic(), "io_acme/feeds/pump-1");
    }
}
