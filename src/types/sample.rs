//! Decoded inertial measurement sample

use serde::{Deserialize, Serialize};

/// Raw accelerometer counts per g at the device's ±2 g range.
pub const ACCEL_LSB_PER_G: f64 = 16384.0;

/// Raw gyroscope counts per degree/second at the device's ±250 °/s range.
pub const GYRO_LSB_PER_DPS: f64 = 131.0;

/// One decoded inertial reading (linear acceleration + angular rate).
///
/// Samples are immutable values. Raw register counts are stored; physical units
/// are derived on access so no precision is lost in transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct TelemetrySample {
    sequence: u16,
    timestamp_ms: u16,
    accel: [i16; 3],
    gyro: [i16; 3],
}

impl TelemetrySample {
    /// Create a sample from raw field values.
    pub const fn new(sequence: u16, timestamp_ms: u16, accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self { sequence, timestamp_ms, accel, gyro }
    }

    /// Device sequence number (wraps at 65536)
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Device timestamp in milliseconds (wraps at 65536)
    pub fn timestamp_ms(&self) -> u16 {
        self.timestamp_ms
    }

    /// Raw accelerometer counts (x, y, z)
    pub fn accel_raw(&self) -> [i16; 3] {
        self.accel
    }

    /// Raw gyroscope counts (x, y, z)
    pub fn gyro_raw(&self) -> [i16; 3] {
        self.gyro
    }

    /// Linear acceleration in g per axis.
    pub fn accel_g(&self) -> [f64; 3] {
        self.accel.map(|raw| f64::from(raw) / ACCEL_LSB_PER_G)
    }

    /// Angular rate in degrees/second per axis.
    pub fn gyro_dps(&self) -> [f64; 3] {
        self.gyro.map(|raw| f64::from(raw) / GYRO_LSB_PER_DPS)
    }

    pub fn ax_g(&self) -> f64 {
        self.accel_g()[0]
    }

    pub fn ay_g(&self) -> f64 {
        self.accel_g()[1]
    }

    pub fn az_g(&self) -> f64 {
        self.accel_g()[2]
    }

    pub fn gx_dps(&self) -> f64 {
        self.gyro_dps()[0]
    }

    pub fn gy_dps(&self) -> f64 {
        self.gyro_dps()[1]
    }

    pub fn gz_dps(&self) -> f64 {
        self.gyro_dps()[2]
    }

    /// Returns whether `self` was sequenced after `other`, accounting for u16 wraparound.
    ///
    /// The device counter wraps at 65536, so a plain comparison misorders samples
    /// around the wrap. A forward distance under half the range counts as "after".
    pub fn is_after(&self, other: &TelemetrySample) -> bool {
        let delta = self.sequence.wrapping_sub(other.sequence);
        delta != 0 && delta < 0x8000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_uses_fixed_scales() {
        let sample = TelemetrySample::new(1, 1000, [16384, 0, -16384], [131, 0, -131]);
        assert_eq!(sample.accel_g(), [1.0, 0.0, -1.0]);
        assert_eq!(sample.gyro_dps(), [1.0, 0.0, -1.0]);
        assert_eq!(sample.ax_g(), 1.0);
        assert_eq!(sample.gz_dps(), -1.0);
    }

    #[test]
    fn extreme_raw_values_convert_without_clamping() {
        let sample = TelemetrySample::new(0, 0, [i16::MIN, i16::MAX, 0], [i16::MIN, 0, i16::MAX]);
        assert_eq!(sample.ax_g(), -2.0);
        assert!((sample.ay_g() - 32767.0 / 16384.0).abs() < f64::EPSILON);
        assert!((sample.gx_dps() - (-32768.0 / 131.0)).abs() < 1e-12);
    }

    #[test]
    fn sequence_ordering_handles_wraparound() {
        let before = TelemetrySample::new(65535, 0, [0; 3], [0; 3]);
        let after = TelemetrySample::new(0, 0, [0; 3], [0; 3]);
        assert!(after.is_after(&before));
        assert!(!before.is_after(&after));
        assert!(!after.is_after(&after));
    }
}
