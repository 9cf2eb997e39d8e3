//! UDP datagram source for the telemetry feed

use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, trace};

use crate::provider::DatagramSource;
use crate::{LinkError, Result};

/// Telemetry source reading datagrams from a bound UDP socket.
///
/// The socket is closed when the source is dropped.
pub struct UdpDatagramSource {
    socket: UdpSocket,
    /// Receive buffer; datagrams longer than this are truncated by the OS
    buf: Vec<u8>,
    local_addr: SocketAddr,
}

impl UdpDatagramSource {
    /// Bind a socket on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, max_datagram_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| LinkError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "Telemetry socket bound");

        Ok(Self { socket, buf: vec![0u8; max_datagram_size.max(1)], local_addr })
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpDatagramSource {
    async fn recv(&mut self) -> Result<Bytes> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        trace!(%peer, len, "Datagram received");
        Ok(Bytes::copy_from_slice(&self.buf[..len]))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}
