//! HTTP chunk source for the imagery feed

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::multipart::boundary_from_content_type;
use crate::provider::ChunkSource;
use crate::{LinkError, Result};

/// Body of one long-lived GET request to a camera stream endpoint.
///
/// Dropping the source drops the response and closes the connection.
pub struct HttpChunkSource {
    response: reqwest::Response,
    boundary: String,
}

impl HttpChunkSource {
    /// Issue the GET request and read the boundary token from `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::HttpStatus`] for non-success responses and
    /// [`LinkError::Transport`] if the connection cannot be established.
    pub async fn open(client: &reqwest::Client, url: &str) -> Result<Self> {
        debug!(url, "Requesting image stream");
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::HttpStatus { status: status.as_u16() });
        }

        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
        let boundary = boundary_from_content_type(content_type);

        info!(url, %status, boundary = %boundary, "Image stream opened");

        Ok(Self { response, boundary })
    }

    /// Boundary token advertised by the response (or the default).
    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

#[async_trait::async_trait]
impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| LinkError::transport_with_source("image stream interrupted", Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubResponse, serve_once};

    #[tokio::test]
    async fn reads_boundary_and_body() {
        let addr = serve_once(StubResponse::multipart("myboundary", vec![b"--myboundary\r\n".to_vec()]))
            .await
            .unwrap();

        let client = reqwest::Client::new();
        let mut source = HttpChunkSource::open(&client, &format!("http://{}/stream", addr)).await.unwrap();
        assert_eq!(source.boundary(), "myboundary");

        let mut body = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            body.extend_from_slice(&chunk);
        }
        assert_eq!(body, b"--myboundary\r\n");
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let addr = serve_once(StubResponse::status(404)).await.unwrap();

        let client = reqwest::Client::new();
        match HttpChunkSource::open(&client, &format!("http://{}/stream", addr)).await {
            Err(LinkError::HttpStatus { status }) => assert_eq!(status, 404),
            Err(other) => panic!("expected HttpStatus, got {:?}", other),
            Ok(_) => panic!("404 should not open a stream"),
        }
    }
}
