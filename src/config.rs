//! Stream configuration
//!
//! A fully enumerated configuration struct replaces free-form option
//! overlaying: every field is declared, defaults are resolved once at load
//! time, and credentials are referenced by environment variable name rather
//! than stored inline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Well-known TLS port for MQTT brokers. Connecting on this port selects the
/// encrypted transport; any other port uses plaintext TCP.
pub const SECURE_PORT: u16 = 8883;

/// Configuration for one logical stream: one broker connection, one
/// subscribe topic, one publish topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// Broker hostname
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker port; 8883 enables TLS
    #[serde(default = "default_port")]
    pub port: u16,
    /// Channel/type label used as the middle topic segment
    #[serde(default = "default_channel_type")]
    pub channel_type: String,
    /// Identity owning the topic namespace, also the broker username
    pub identity: String,
    /// Broker username override; falls back to `identity` when absent
    pub credential_name: Option<String>,
    /// Environment variable containing the credential secret
    pub credential_secret_env: Option<String>,
    /// Instance identifier, the final topic segment
    pub stream_id: String,
}

fn default_host() -> String {
    "io.adafruit.com".to_string()
}

fn default_port() -> u16 {
    SECURE_PORT
}

fn default_channel_type() -> String {
    "feeds".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid identity format: {0}")]
    InvalidIdentity(String),
    #[error("Invalid stream id format: {0}")]
    InvalidStreamId(String),
}

impl StreamConfig {
    /// Load configuration from a TOML file, normalize aliases, and validate
    /// topic segment formats.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: StreamConfig = toml::from_str(&content)?;
        config.normalized()
    }

    /// Resolve aliases and validate. The `data` channel type is a historical
    /// alias for `feeds` and is normalized away here so the rest of the crate
    /// never sees it.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if self.channel_type == "data" {
            self.channel_type = "feeds".to_string();
        }

        validate_segment(&self.identity).map_err(ConfigError::InvalidIdentity)?;
        validate_segment(&self.stream_id).map_err(ConfigError::InvalidStreamId)?;

        Ok(self)
    }

    /// Broker username: explicit credential name, or the identity itself.
    pub fn credential_name(&self) -> &str {
        self.credential_name.as_deref().unwrap_or(&self.identity)
    }

    /// Resolve the credential secret from the configured environment
    /// variable. `None` means anonymous access.
    pub fn credential_secret(&self) -> Option<String> {
        self.credential_secret_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }

    /// True when the configured port selects the TLS transport.
    pub fn is_secure(&self) -> bool {
        self.port == SECURE_PORT
    }
}

/// Topic segments must match [a-zA-Z0-9._-]+ so the derived topics are
/// acceptable to the broker. A malformed segment would otherwise surface
/// only as a connection-time error.
fn validate_segment(segment: &str) -> Result<(), String> {
    let valid_chars = segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if segment.is_empty() || !valid_chars {
        return Err(format!(
            "'{segment}' must match pattern [a-zA-Z0-9._-]+"
        ));
    }

    Ok(())
}
