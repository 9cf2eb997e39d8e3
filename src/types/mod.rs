//! Core types for sensor feed data representation.
//!
//! - [`TelemetrySample`] is one decoded inertial reading with derived physical units
//! - [`ImageFrame`] is one encoded still image split out of the multipart stream
//! - [`FeedEvent`] is what every feed publishes to its subscribers
//! - [`ConnectionStatus`] aggregates per-feed connectivity flags
//!
//! ## Usage Example
//!
//! ```rust
//! use sensorlink::types::TelemetrySample;
//!
//! let sample = TelemetrySample::new(1, 1000, [16384, 0, -16384], [131, 0, -131]);
//! assert_eq!(sample.accel_g(), [1.0, 0.0, -1.0]);
//! assert_eq!(sample.gyro_dps(), [1.0, 0.0, -1.0]);
//! ```

mod frame;
mod sample;
mod status;

pub use frame::ImageFrame;
pub use sample::{ACCEL_LSB_PER_G, GYRO_LSB_PER_DPS, TelemetrySample};
pub use status::{ConnectionStatus, Feed, FeedEvent};
