//! Async receivers for an embedded sensor device's two data feeds.
//!
//! Sensorlink decodes the two streams a small camera + IMU board publishes on
//! its local network and hands typed values to any number of subscribers.
//!
//! # Features
//!
//! - **Telemetry**: 16-byte little-endian inertial datagrams over UDP, decoded into
//!   [`TelemetrySample`] values with derived g and °/s readings
//! - **Imagery**: `multipart/x-mixed-replace` camera streams over HTTP, split into
//!   [`ImageFrame`] values regardless of how the network chunks the body
//! - **Lifecycle**: [`ConnectionManager`] starts both feeds together and tracks
//!   per-feed connectivity
//! - **Upload**: keyframe + inertial window packaging for a remote endpoint
//!
//! Decoding noise (short datagrams, parts without a header separator) is dropped
//! inside the decoders. Only transport failures reach subscribers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use sensorlink::{FeedEvent, SensorLink};
//!
//! #[tokio::main]
//! async fn main() -> sensorlink::Result<()> {
//!     let manager = SensorLink::connect("192.168.4.1").await?;
//!     let mut samples = manager.subscribe_telemetry();
//!
//!     while let Some(event) = samples.next().await {
//!         if let FeedEvent::Item(sample) = event {
//!             println!("#{} accel {:?} g", sample.sequence(), sample.accel_g());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Pure decoders
pub mod multipart;
pub mod packet;

// Transport adapters and their sessions
pub mod connection;
mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Composition and collaborators
pub mod capability;
pub mod history;
pub mod manager;
pub mod upload;

// Core exports
pub use config::{ImageryConfig, LinkConfig, TelemetryConfig, UploadConfig};
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::{ImageryReceiver, TelemetryReceiver};
pub use manager::ConnectionManager;
pub use multipart::BoundaryScanner;
pub use stream::FeedStream;
pub use upload::{ImuRecord, UploadClient, UploadEnvelope};

/// Unified entry point for sensorlink receivers.
///
/// # Examples
///
/// ## Both feeds
/// ```rust,no_run
/// use sensorlink::SensorLink;
///
/// #[tokio::main]
/// async fn main() -> sensorlink::Result<()> {
///     let mut manager = SensorLink::connect("192.168.4.1").await?;
///     println!("{:?}", manager.status());
///     manager.dispose().await;
///     Ok(())
/// }
/// ```
///
/// ## Telemetry only
/// ```rust,no_run
/// use sensorlink::{SensorLink, TelemetryConfig};
///
/// #[tokio::main]
/// async fn main() -> sensorlink::Result<()> {
///     let mut receiver = SensorLink::telemetry(TelemetryConfig::default());
///     let samples = receiver.subscribe();
///     receiver.start().await?;
///     # drop(samples);
///     Ok(())
/// }
/// ```
pub struct SensorLink;

impl SensorLink {
    /// Datagram receiver for the telemetry feed (not started).
    pub fn telemetry(config: TelemetryConfig) -> TelemetryReceiver {
        TelemetryReceiver::new(config)
    }

    /// Chunked byte receiver for the imagery feed (not started).
    pub fn imagery(config: ImageryConfig) -> ImageryReceiver {
        ImageryReceiver::new(config)
    }

    /// Start both feeds for the device at `host` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the telemetry port cannot be bound. Imagery
    /// connection problems are reported on the imagery feed instead.
    pub async fn connect(host: &str) -> Result<ConnectionManager> {
        Self::connect_with(LinkConfig::for_device(host)).await
    }

    /// Start both feeds with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] for invalid settings and otherwise behaves
    /// like [`connect`](Self::connect).
    pub async fn connect_with(config: LinkConfig) -> Result<ConnectionManager> {
        config.validate()?;
        let mut manager = ConnectionManager::new(config);
        if let Err(e) = manager.start_services().await {
            manager.stop_services().await;
            return Err(e);
        }
        Ok(manager)
    }
}
