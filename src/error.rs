//! Error types for stream operations
//!
//! Transport-originated failures are forwarded to observers as asynchronous
//! `StreamEvent::Error` notifications; the errors here cover the synchronous
//! surface only (configuration, connection setup, broker client calls).

use thiserror::Error;

/// Errors surfaced by the stream adapter's synchronous entry points.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Connect timed out after {0} seconds")]
    ConnectTimeout(u64),

    #[error("Subscribe failed on {topic}: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    #[error("Publish failed on {topic}: {reason}")]
    PublishFailed { topic: String, reason: String },
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            StreamError::ConnectTimeout(60),
            StreamError::SubscribeFailed {
                topic: "a/feeds/b/json".to_string(),
                reason: "channel closed".to_string(),
            },
            StreamError::PublishFailed {
                topic: "a/feeds/b".to_string(),
                reason: "channel closed".to_string(),
            },
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = crate::config::ConfigError::InvalidIdentity("x y".to_string());
        let err: StreamError = config_err.into();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
