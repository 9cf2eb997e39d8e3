//! Incremental boundary scanner over the accumulated stream buffer

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::DEFAULT_BOUNDARY;
use crate::types::ImageFrame;
use crate::{LinkError, Result};

/// Separator between a part's header block and its body.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Stateful frame extractor for a multipart byte stream.
///
/// Each [`push`](Self::push) appends a chunk to a single owned buffer and drains
/// every part that is now bounded by two delimiters. Matching always runs over the
/// accumulated buffer, so delimiters and header terminators split across chunk
/// boundaries are found.
///
/// A part without a header terminator is discarded, not re-buffered. Frames are
/// returned in stream order and their bytes leave the buffer on return.
///
/// # Example
///
/// ```rust
/// use sensorlink::multipart::BoundaryScanner;
///
/// let mut scanner = BoundaryScanner::new("frame");
/// assert!(scanner.push(b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJP").is_empty());
/// let frames = scanner.push(b"EG--frame");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].as_slice(), b"JPEG");
/// ```
#[derive(Debug)]
pub struct BoundaryScanner {
    /// `--` followed by the boundary token
    delimiter: Vec<u8>,
    buffer: BytesMut,
    /// Where the next search for a closing delimiter may start.
    /// Reset to 0 whenever the buffer front moves.
    resume_at: usize,
    max_buffer_len: Option<usize>,
    frames_emitted: u64,
    parts_discarded: u64,
    overflow_resyncs: u64,
}

impl BoundaryScanner {
    /// Create a scanner for the given boundary token (without the leading `--`).
    ///
    /// An empty token falls back to the default `frame` token.
    pub fn new(token: impl AsRef<[u8]>) -> Self {
        let token = token.as_ref();
        let token = if token.is_empty() { DEFAULT_BOUNDARY.as_bytes() } else { token };

        let mut delimiter = Vec::with_capacity(token.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(token);

        Self {
            delimiter,
            buffer: BytesMut::with_capacity(64 * 1024),
            resume_at: 0,
            max_buffer_len: None,
            frames_emitted: 0,
            parts_discarded: 0,
            overflow_resyncs: 0,
        }
    }

    /// Bound the buffer to `limit` bytes.
    ///
    /// When a drain leaves more than `limit` bytes buffered, everything before the
    /// last delimiter is dropped. If that is still too much, all but the final
    /// `delimiter_len - 1` bytes are dropped so a delimiter straddling the next
    /// chunk can still be matched. Unbounded by default.
    pub fn with_max_buffer_len(mut self, limit: usize) -> Self {
        self.max_buffer_len = Some(limit);
        self
    }

    /// Append a chunk and return every frame that became complete.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ImageFrame> {
        self.buffer.extend_from_slice(chunk);
        trace!(chunk = chunk.len(), buffered = self.buffer.len(), "Chunk appended");

        let mut frames = Vec::new();
        while let Some(part) = self.next_part() {
            match extract_body(&part) {
                Ok(Some(frame)) => {
                    self.frames_emitted += 1;
                    trace!(len = frame.len(), "Frame extracted");
                    frames.push(frame);
                }
                Ok(None) => {
                    trace!("Part with empty body skipped");
                }
                Err(e) => {
                    self.parts_discarded += 1;
                    debug!("Discarding part: {}", e);
                }
            }
        }

        self.enforce_limit();
        frames
    }

    /// Resolve the next delimiter-bounded part, removing it from the buffer.
    ///
    /// The returned bytes are the region strictly between the two delimiters; the
    /// closing delimiter stays at the buffer front as the next opening delimiter.
    fn next_part(&mut self) -> Option<Bytes> {
        let open = find(&self.buffer, &self.delimiter, 0)?;
        let body_start = open + self.delimiter.len();

        let from = self.resume_at.max(body_start);
        let Some(close) = find(&self.buffer, &self.delimiter, from) else {
            let overlap = self.delimiter.len() - 1;
            self.resume_at = self.buffer.len().saturating_sub(overlap).max(body_start);
            return None;
        };

        let segment = self.buffer.split_to(close).freeze();
        self.resume_at = 0;
        Some(segment.slice(body_start..))
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.max_buffer_len else {
            return;
        };
        if self.buffer.len() <= limit {
            return;
        }

        let before = self.buffer.len();
        if let Some(last) = rfind(&self.buffer, &self.delimiter) {
            self.buffer.advance(last);
        }
        if self.buffer.len() > limit {
            let keep = self.delimiter.len() - 1;
            let excess = self.buffer.len().saturating_sub(keep);
            self.buffer.advance(excess);
        }

        self.resume_at = 0;
        self.overflow_resyncs += 1;
        warn!(
            limit,
            dropped = before - self.buffer.len(),
            "Stream buffer exceeded limit, resynchronising on last boundary"
        );
    }

    /// The delimiter searched for in the body (`--` + token).
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Bytes currently held waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Parts dropped because they had no header terminator.
    pub fn parts_discarded(&self) -> u64 {
        self.parts_discarded
    }

    pub fn overflow_resyncs(&self) -> u64 {
        self.overflow_resyncs
    }

    /// Drop all buffered bytes (counters are kept).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.resume_at = 0;
    }
}

/// Split a part into headers and body, returning the body as a frame.
fn extract_body(part: &Bytes) -> Result<Option<ImageFrame>> {
    let separator = find(part, HEADER_TERMINATOR, 0)
        .ok_or(LinkError::IncompleteFrame { part_len: part.len() })?;
    Ok(ImageFrame::new(part.slice(separator + HEADER_TERMINATOR.len()..)))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|window| window == needle).map(|pos| pos + from)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|window| window == needle)
}
