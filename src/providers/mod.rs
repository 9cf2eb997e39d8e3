//! Concrete byte sources for the two feeds

pub mod http;
pub mod udp;

pub use http::HttpChunkSource;
pub use udp::UdpDatagramSource;
