//! Keyframe + inertial window upload
//!
//! Packages one image frame together with the telemetry samples around it into
//! a JSON document and posts it to a remote endpoint:
//!
//! ```json
//! {
//!   "timestamp": 1700000000000,
//!   "keyframe_jpeg_base64": "/9j/...",
//!   "imu": [{ "t": 1000, "ax": 1.0, "ay": 0.0, "az": -1.0, "gx": 1.0, "gy": 0.0, "gz": -1.0 }]
//! }
//! ```
//!
//! Inertial values are in physical units (g and °/s). No retry is attempted.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::types::{ImageFrame, TelemetrySample};
use crate::{LinkError, Result};

/// One inertial reading in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ImuRecord {
    /// Device timestamp in milliseconds (wraps at 65536)
    pub t: u16,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl From<&TelemetrySample> for ImuRecord {
    fn from(sample: &TelemetrySample) -> Self {
        let [ax, ay, az] = sample.accel_g();
        let [gx, gy, gz] = sample.gyro_dps();
        Self { t: sample.timestamp_ms(), ax, ay, az, gx, gy, gz }
    }
}

/// Upload request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEnvelope {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub keyframe_jpeg_base64: String,
    pub imu: Vec<ImuRecord>,
}

impl UploadEnvelope {
    /// Build an envelope stamped with the current wall-clock time.
    ///
    /// Samples keep the order they are given in.
    pub fn new<'a>(frame: &ImageFrame, samples: impl IntoIterator<Item = &'a TelemetrySample>) -> Self {
        Self {
            timestamp: now_millis(),
            keyframe_jpeg_base64: BASE64.encode(frame.as_slice()),
            imu: samples.into_iter().map(ImuRecord::from).collect(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Decode the keyframe back into raw bytes.
    pub fn keyframe_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.keyframe_jpeg_base64)
            .map_err(|e| LinkError::encoding_error("keyframe_jpeg_base64", e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LinkError::encoding_error("upload envelope", e.to_string()))
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Posts envelopes to a fixed endpoint.
///
/// Redirects are not followed: any status of 300 or above is a failure.
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl UploadClient {
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] for an empty endpoint.
    pub fn new(config: UploadConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(LinkError::config_error("upload", "endpoint must not be empty"));
        }
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, endpoint: config.endpoint, timeout })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one envelope as the JSON request body.
    ///
    /// # Errors
    ///
    /// - [`LinkError::UploadFailure`] for any status of 300 or above
    /// - [`LinkError::Timeout`] if the request exceeds the configured timeout
    /// - [`LinkError::Transport`] if the endpoint is unreachable
    pub async fn upload(&self, envelope: &UploadEnvelope) -> Result<()> {
        debug!(endpoint = %self.endpoint, samples = envelope.imu.len(), "Uploading keyframe");

        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Upload rejected");
            return Err(LinkError::UploadFailure { status: status.as_u16(), body });
        }

        info!(%status, "Upload accepted");
        Ok(())
    }

    fn classify(&self, err: reqwest::Error) -> LinkError {
        if err.is_timeout() { LinkError::Timeout { duration: self.timeout } } else { err.into() }
    }
}
