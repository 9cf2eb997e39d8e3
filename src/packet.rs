//! Fixed-layout telemetry packet decoding
//!
//! The device sends one inertial reading per datagram as a 16-byte little-endian
//! record with no padding:
//!
//! | Offset | Size | Field        | Type |
//! |--------|------|--------------|------|
//! | 0      | 2    | sequence     | u16  |
//! | 2      | 2    | timestamp_ms | u16  |
//! | 4      | 2    | accel_x      | i16  |
//! | 6      | 2    | accel_y      | i16  |
//! | 8      | 2    | accel_z      | i16  |
//! | 10     | 2    | gyro_x       | i16  |
//! | 12     | 2    | gyro_y       | i16  |
//! | 14     | 2    | gyro_z       | i16  |
//!
//! Decoding is pure: no validation beyond length, no clamping, trailing bytes ignored.

use crate::types::TelemetrySample;
use crate::{LinkError, Result};

/// Size of one telemetry record on the wire.
pub const PACKET_SIZE: usize = 16;

/// Decode the first [`PACKET_SIZE`] bytes of `data` into a sample.
///
/// # Errors
///
/// Returns [`LinkError::MalformedPacket`] carrying the observed length when `data`
/// is shorter than [`PACKET_SIZE`]. Nothing is partially decoded.
pub fn decode(data: &[u8]) -> Result<TelemetrySample> {
    let record: &[u8; PACKET_SIZE] = data
        .get(..PACKET_SIZE)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(LinkError::MalformedPacket { len: data.len() })?;

    let sequence = read_u16_le(record, 0);
    let timestamp_ms = read_u16_le(record, 2);
    let accel = [read_i16_le(record, 4), read_i16_le(record, 6), read_i16_le(record, 8)];
    let gyro = [read_i16_le(record, 10), read_i16_le(record, 12), read_i16_le(record, 14)];

    Ok(TelemetrySample::new(sequence, timestamp_ms, accel, gyro))
}

impl TelemetrySample {
    /// Encode this sample in the device wire layout.
    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        out[0..2].copy_from_slice(&self.sequence().to_le_bytes());
        out[2..4].copy_from_slice(&self.timestamp_ms().to_le_bytes());
        for (i, value) in self.accel_raw().iter().chain(self.gyro_raw().iter()).enumerate() {
            let offset = 4 + i * 2;
            out[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

// Offsets are compile-time constants inside a fixed-size record, so these cannot go out of bounds.
fn read_u16_le(record: &[u8; PACKET_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

fn read_i16_le(record: &[u8; PACKET_SIZE], offset: usize) -> i16 {
    i16::from_le_bytes([record[offset], record[offset + 1]])
}
