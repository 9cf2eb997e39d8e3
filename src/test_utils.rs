//! Test utilities: wire encoders, scripted sources, and loopback stub servers
//!
//! Everything here talks to real loopback sockets or in-memory scripts, so feed
//! tests run without a device on the network.

#![cfg(any(test, feature = "benchmark"))]

use bytes::Bytes;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::oneshot;

use crate::provider::{ChunkSource, DatagramSource};
use crate::types::TelemetrySample;
use crate::{LinkError, Result};

/// Reference sample: 1 g on +x, -1 g on z, 1 °/s on +x, -1 °/s on z.
pub const REFERENCE_SAMPLE: TelemetrySample =
    TelemetrySample::new(1, 1000, [16384, 0, -16384], [131, 0, -131]);

/// One multipart part with a JPEG content type header.
pub fn multipart_part(token: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        token,
        payload.len()
    )
    .into_bytes();
    out.extend_from_slice(payload);
    out
}

/// A full multipart body for `payloads`, closed by a trailing delimiter.
pub fn multipart_body(token: &str, payloads: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads {
        out.extend_from_slice(&multipart_part(token, payload));
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}", token).as_bytes());
    out
}

/// A payload that looks like a tiny JPEG (SOI ... EOI).
pub fn fake_jpeg(fill: u8, len: usize) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend(std::iter::repeat_n(fill, len));
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Send each packet as its own datagram to `target`.
pub async fn send_datagrams(target: SocketAddr, packets: &[&[u8]]) -> std::io::Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    for packet in packets {
        socket.send_to(packet, target).await?;
    }
    Ok(())
}

/// What a scripted source does once its script runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    /// Report a normal end of stream
    Finish,
    /// Never produce anything again
    Pending,
}

/// In-memory chunk source replaying a fixed script.
pub struct ScriptedChunkSource {
    script: VecDeque<Result<Bytes>>,
    end: ScriptEnd,
}

impl ScriptedChunkSource {
    pub fn new(chunks: Vec<Vec<u8>>, end: ScriptEnd) -> Self {
        Self { script: chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect(), end }
    }

    /// Append a transport failure after the chunks.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script.push_back(Err(LinkError::transport(reason)));
        self
    }
}

#[async_trait::async_trait]
impl ChunkSource for ScriptedChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.script.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => match self.end {
                ScriptEnd::Finish => Ok(None),
                ScriptEnd::Pending => std::future::pending().await,
            },
        }
    }
}

/// In-memory datagram source replaying a fixed script, then pending forever.
pub struct ScriptedDatagramSource {
    script: VecDeque<Result<Bytes>>,
    local_addr: Option<SocketAddr>,
}

impl ScriptedDatagramSource {
    pub fn new(datagrams: Vec<Vec<u8>>) -> Self {
        Self { script: datagrams.into_iter().map(|d| Ok(Bytes::from(d))).collect(), local_addr: None }
    }

    /// Report `addr` as the bound address.
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script.push_back(Err(LinkError::transport(reason)));
        self
    }
}

#[async_trait::async_trait]
impl DatagramSource for ScriptedDatagramSource {
    async fn recv(&mut self) -> Result<Bytes> {
        match self.script.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    Complete,
    Abort,
    HoldOpen,
}

/// Canned HTTP response for [`serve_once`].
///
/// Bodies are sent with chunked transfer encoding, one HTTP chunk per entry,
/// so tests control exactly where network chunk boundaries fall.
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    content_type: Option<String>,
    chunks: Vec<Vec<u8>>,
    chunk_delay: Duration,
    end: BodyEnd,
}

impl StubResponse {
    /// 200 response with `multipart/x-mixed-replace; boundary=<token>`.
    pub fn multipart(token: &str, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(format!("multipart/x-mixed-replace; boundary={}", token)),
            chunks,
            chunk_delay: Duration::from_millis(5),
            end: BodyEnd::Complete,
        }
    }

    /// Empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            chunks: Vec::new(),
            chunk_delay: Duration::ZERO,
            end: BodyEnd::Complete,
        }
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self
    }

    /// Close the socket mid-body instead of sending the terminating chunk.
    pub fn aborted(mut self) -> Self {
        self.end = BodyEnd::Abort;
        self
    }

    /// Keep the connection open after the last chunk until the client hangs up.
    pub fn held_open(mut self) -> Self {
        self.end = BodyEnd::HoldOpen;
        self
    }

    async fn write_to(&self, socket: &mut TcpStream) -> std::io::Result<()> {
        read_request_head(socket).await?;

        if self.status != 200 {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                self.status,
                reason_phrase(self.status)
            );
            socket.write_all(head.as_bytes()).await?;
            return socket.shutdown().await;
        }

        let mut head = String::from("HTTP/1.1 200 OK\r\n");
        if let Some(content_type) = &self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str("Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n");
        socket.write_all(head.as_bytes()).await?;

        for chunk in self.chunks.iter().filter(|c| !c.is_empty()) {
            socket.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
            socket.write_all(chunk).await?;
            socket.write_all(b"\r\n").await?;
            socket.flush().await?;
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        match self.end {
            BodyEnd::Complete => {
                socket.write_all(b"0\r\n\r\n").await?;
                socket.shutdown().await
            }
            BodyEnd::Abort => {
                // Half a chunk, then hang up
                socket.write_all(b"10\r\npartial").await?;
                socket.shutdown().await
            }
            BodyEnd::HoldOpen => {
                let mut buf = [0u8; 256];
                while socket.read(&mut buf).await? > 0 {}
                Ok(())
            }
        }
    }
}

/// Serve `response` to the first connection on an ephemeral loopback port.
pub async fn serve_once(response: StubResponse) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = response.write_to(&mut socket).await;
        }
    });

    Ok(addr)
}

/// Accept one request, hand its body to the returned receiver, answer with `status`.
pub async fn serve_capture(
    status: u16,
) -> std::io::Result<(SocketAddr, oneshot::Receiver<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let Ok((head, mut body)) = read_request_head(&mut socket).await else {
            return;
        };

        let length = content_length(&head).unwrap_or(0);
        let mut buf = [0u8; 4096];
        while body.len() < length {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => body.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tx.send(body);

        let reply = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status,
            reason_phrase(status)
        );
        let _ = socket.write_all(reply.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    Ok((addr, rx))
}

/// Read up to the end of the request head; returns (head, any body bytes already read).
async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<(String, Vec<u8>)> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let body = request.split_off(pos + 4);
            return Ok((String::from_utf8_lossy(&request).into_owned(), body));
        }
    }
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") { value.trim().parse().ok() } else { None }
    })
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_layout() {
        let body = multipart_body("frame", &[b"ab"]);
        assert_eq!(
            body,
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 2\r\n\r\nab\r\n--frame".to_vec()
        );
    }

    #[test]
    fn content_length_is_case_insensitive() {
        assert_eq!(content_length("POST / HTTP/1.1\r\ncontent-length: 42\r\n"), Some(42));
        assert_eq!(content_length("GET / HTTP/1.1\r\nHost: x\r\n"), None);
    }
}
