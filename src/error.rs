//! Error types for sensor feed processing.
//!
//! This module provides the error handling for the sensorlink library. All errors
//! implement the `std::error::Error` trait and carry structured context for
//! debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: Malformed telemetry packets and incomplete multipart parts.
//!   These are contained inside the decoders and never reach subscribers.
//! - **Transport Errors**: Bind failures, connection resets, unexpected closes.
//!   These end the current session of the affected feed.
//! - **HTTP Errors**: Non-success responses to the stream request or an upload.
//! - **Configuration Errors**: Invalid configuration documents.
//! - **Encoding Errors**: Upload payloads that cannot be serialized or decoded.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use sensorlink::LinkError;
//!
//! let error = LinkError::transport("connection reset by device");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::types::Feed;

/// Result type alias for sensorlink operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for sensor feed operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Malformed telemetry packet: expected at least 16 bytes, got {len}")]
    MalformedPacket { len: usize },

    #[error("Incomplete multipart part: no header/body separator in {part_len} bytes")]
    IncompleteFrame { part_len: usize },

    #[error("Failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Stream request rejected with HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Upload rejected with HTTP status {status}")]
    UploadFailure { status: u16, body: String },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Encoding error in {context}: {details}")]
    Encoding { context: String, details: String },

    #[error("{feed} receiver has been disposed")]
    Disposed { feed: Feed },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable by starting a new session.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Transport { .. } => true,
            LinkError::Timeout { .. } => true,
            LinkError::HttpStatus { status } => *status >= 500,
            LinkError::UploadFailure { status, .. } => *status >= 500,
            LinkError::Bind { .. } => false,
            LinkError::MalformedPacket { .. } => false,
            LinkError::IncompleteFrame { .. } => false,
            LinkError::Config { .. } => false,
            LinkError::Encoding { .. } => false,
            LinkError::Disposed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::MalformedPacket { .. } => vec![
                "Check the device firmware packet layout",
                "Ignore occasional short datagrams caused by network noise",
            ],
            LinkError::IncompleteFrame { .. } => vec![
                "Verify the camera sends a header block terminated by a blank line",
                "Check the boundary token advertised in the Content-Type header",
            ],
            LinkError::Bind { .. } => vec![
                "Check that no other process is listening on the telemetry port",
                "Use a different bind address or port",
                "Verify permissions for binding low port numbers",
            ],
            LinkError::Transport { .. } => vec![
                "Check that the device is powered and on the same network",
                "Start a new session once the device is reachable",
            ],
            LinkError::HttpStatus { .. } => vec![
                "Verify the stream URL and port",
                "Check that the camera stream is enabled on the device",
            ],
            LinkError::UploadFailure { .. } => vec![
                "Verify the upload endpoint URL",
                "Inspect the response body for the rejection reason",
            ],
            LinkError::Config { .. } => vec![
                "Check the configuration document syntax",
                "Verify field names and value types",
            ],
            LinkError::Encoding { .. } => vec![
                "Check that the keyframe field holds standard base64",
                "Verify the envelope was produced by this library version",
            ],
            LinkError::Disposed { .. } => vec!["Create a new receiver after disposing the old one"],
            LinkError::Timeout { .. } => vec![
                "Increase the timeout duration",
                "Check network latency to the device",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        LinkError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for payload encoding errors.
    pub fn encoding_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::Encoding { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Transport { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<reqwest::Error> for LinkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return LinkError::HttpStatus { status: status.as_u16() };
        }
        LinkError::Transport { reason: "HTTP transport error".to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_context(
            reason in ".*",
            len in 0usize..16usize,
            status in 100u16..600u16,
        ) {
            let transport = LinkError::transport(reason.clone());
            prop_assert!(transport.to_string().contains(&reason));

            let malformed = LinkError::MalformedPacket { len };
            prop_assert!(malformed.to_string().contains(&len.to_string()));

            let http = LinkError::HttpStatus { status };
            prop_assert!(http.to_string().contains(&status.to_string()));
        }

        #[test]
        fn source_chain_preserves_io_message(message in "[a-z ]{1,40}") {
            let err: LinkError = std::io::Error::other(message.clone()).into();
            let source = std::error::Error::source(&err).map(|s| s.to_string());
            prop_assert_eq!(source, Some(message));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LinkError>();

        let error = LinkError::transport("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(LinkError::transport("reset").is_retryable());
        assert!(LinkError::HttpStatus { status: 503 }.is_retryable());
        assert!(!LinkError::HttpStatus { status: 404 }.is_retryable());
        assert!(!LinkError::MalformedPacket { len: 3 }.is_retryable());
        assert!(!LinkError::Disposed { feed: Feed::Telemetry }.is_retryable());

        let bind = LinkError::Bind {
            addr: "127.0.0.1:9000".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(!bind.is_retryable());
        assert!(bind.to_string().contains("127.0.0.1:9000"));
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            LinkError::transport("test"),
            LinkError::MalformedPacket { len: 0 },
            LinkError::IncompleteFrame { part_len: 10 },
            LinkError::config_error("yaml", "bad"),
            LinkError::encoding_error("keyframe", "bad"),
            LinkError::UploadFailure { status: 400, body: String::new() },
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
