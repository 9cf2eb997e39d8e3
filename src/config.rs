//! Addressing and tuning for the feed adapters
//!
//! All configuration is passed in by the caller. Structs can be built in code or
//! parsed from a YAML document:
//!
//! ```rust
//! use sensorlink::LinkConfig;
//!
//! let config = LinkConfig::from_yaml_str(
//!     r#"
//! telemetry:
//!   bind_addr: "0.0.0.0:9000"
//!   history_len: 200
//! imagery:
//!   url: "http://192.168.4.1:81/stream"
//!   max_buffer_len: 4194304
//! "#,
//! )
//! .unwrap();
//! assert_eq!(config.telemetry.history_len, 200);
//! assert_eq!(config.imagery.max_buffer_len, Some(4 * 1024 * 1024));
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::{LinkError, Result};

/// Default UDP port the device sends telemetry to.
pub const DEFAULT_TELEMETRY_PORT: u16 = 9000;

/// Default HTTP port of the device's camera stream server.
pub const DEFAULT_STREAM_PORT: u16 = 81;

/// Address of the device when it runs its own access point.
pub const DEFAULT_DEVICE_HOST: &str = "192.168.4.1";

/// Telemetry (datagram) receiver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Local address to bind (wildcard by default)
    pub bind_addr: SocketAddr,
    /// Events buffered per subscriber before it starts missing samples
    pub channel_capacity: usize,
    /// Receive buffer size; longer datagrams are truncated
    pub max_datagram_size: usize,
    /// Samples kept in the rolling history (0 disables it)
    pub history_len: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_TELEMETRY_PORT),
            channel_capacity: 256,
            max_datagram_size: 2048,
            history_len: 0,
        }
    }
}

/// Imagery (multipart HTTP stream) receiver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    /// Stream URL
    pub url: String,
    /// Frames buffered per subscriber before it starts missing frames
    pub channel_capacity: usize,
    /// Upper bound on bytes held while waiting for a boundary (unbounded if unset)
    pub max_buffer_len: Option<usize>,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self::for_device(DEFAULT_DEVICE_HOST)
    }
}

impl ImageryConfig {
    /// Settings for the stream served at `http://<host>:81/stream`.
    pub fn for_device(host: &str) -> Self {
        Self {
            url: format!("http://{}:{}/stream", host, DEFAULT_STREAM_PORT),
            channel_capacity: 16,
            max_buffer_len: None,
            connect_timeout_ms: None,
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for both feeds and the lifecycle manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub telemetry: TelemetryConfig,
    pub imagery: ImageryConfig,
    /// Publish a disconnected status when services are stopped
    pub reset_status_on_stop: bool,
}

impl LinkConfig {
    /// Default settings for a device reachable at `host`.
    pub fn for_device(host: &str) -> Self {
        Self { imagery: ImageryConfig::for_device(host), ..Self::default() }
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] for malformed documents or invalid values.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: LinkConfig = serde_yaml_ng::from_str(text)
            .map_err(|e| LinkError::config_error("YAML parsing", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.telemetry.channel_capacity == 0 {
            return Err(LinkError::config_error("telemetry", "channel_capacity must be at least 1"));
        }
        if self.telemetry.max_datagram_size == 0 {
            return Err(LinkError::config_error("telemetry", "max_datagram_size must be at least 1"));
        }
        if self.imagery.channel_capacity == 0 {
            return Err(LinkError::config_error("imagery", "channel_capacity must be at least 1"));
        }
        if self.imagery.url.trim().is_empty() {
            return Err(LinkError::config_error("imagery", "url must not be empty"));
        }
        Ok(())
    }
}

/// Settings for the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { endpoint: String::new(), timeout_ms: 10_000 }
    }
}
