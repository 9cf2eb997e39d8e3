//! Byte source traits feeding the decoders

use bytes::Bytes;
use std::net::SocketAddr;

use crate::Result;

/// Source of discrete telemetry datagrams.
///
/// Sources abstract over the transport (a bound UDP socket in production, scripted
/// queues in tests). Dropping a source releases the underlying endpoint.
#[async_trait::async_trait]
pub trait DatagramSource: Send + 'static {
    /// Wait for the next datagram payload.
    ///
    /// Returns:
    /// - `Ok(bytes)` - One datagram, possibly empty or truncated
    /// - `Err(e)` - Transport failure; the session ends
    async fn recv(&mut self) -> Result<Bytes>;

    /// Local address the source is bound to, if any.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Source of body chunks for a multipart image stream.
#[async_trait::async_trait]
pub trait ChunkSource: Send + 'static {
    /// Wait for the next body chunk.
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - Next chunk of arbitrary length
    /// - `Ok(None)` - Body finished normally
    /// - `Err(e)` - Transport failure (reset, unexpected close)
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}
