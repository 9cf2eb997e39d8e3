//! Image frame payload extracted from the multipart stream

use bytes::Bytes;

/// One complete encoded still image.
///
/// The bytes are shared with the buffer they were split out of (zero-copy via
/// `Bytes`), so cloning a frame for every subscriber is cheap. Frames are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    data: Bytes,
}

impl ImageFrame {
    /// Wrap a payload, returning `None` for an empty one.
    pub fn new(data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        if data.is_empty() { None } else { Some(Self { data }) }
    }

    /// Encoded image bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for ImageFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_rejected() {
        assert!(ImageFrame::new(Vec::new()).is_none());
        assert!(ImageFrame::new(Bytes::new()).is_none());
    }

    #[test]
    fn payload_is_preserved() {
        let frame = ImageFrame::new(vec![0xFF, 0xD8, 0xFF, 0xD9]).expect("non-empty");
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.as_slice(), &[0xFF, 0xD8, 0xFF, 0xD9]);
        assert!(!frame.is_empty());
    }
}
