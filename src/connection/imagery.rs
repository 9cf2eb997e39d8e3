//! Chunked byte receiver for the imagery feed

use std::future::Future;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::ImageryConfig;
use crate::driver::{Driver, Session};
use crate::provider::ChunkSource;
use crate::providers::HttpChunkSource;
use crate::stream::FeedStream;
use crate::types::{FeedEvent, ImageFrame};
use crate::{LinkError, Result};

/// Imagery feed adapter.
///
/// Every session gets a fresh publish channel. The channel closes when the
/// session ends: after its `Ended` or `Failed` event, or on [`stop`](Self::stop).
pub struct ImageryReceiver {
    config: ImageryConfig,
    /// Kept only to hand out new subscriptions; the session task owns the sender
    channel: Option<broadcast::Receiver<FeedEvent<ImageFrame>>>,
    session: Option<Session>,
}

impl ImageryReceiver {
    pub fn new(config: ImageryConfig) -> Self {
        Self { config, channel: None, session: None }
    }

    /// Issue the stream request and return a subscription right away.
    ///
    /// The request runs in the background; connection failures and non-success
    /// statuses arrive on the stream as `Failed`. While a session is running this
    /// just returns another subscription to it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Transport`] if the HTTP client cannot be built.
    pub fn start(&mut self) -> Result<FeedStream<ImageFrame>> {
        if self.is_running() {
            debug!("Imagery receiver already running");
            return Ok(self.subscribe());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;
        let url = self.config.url.clone();

        info!(url = %url, "Imagery receiver starting");
        Ok(self.spawn(async move {
            let source = HttpChunkSource::open(&client, &url).await?;
            let token = source.boundary().to_string();
            Ok::<_, LinkError>((source, token))
        }))
    }

    /// Start scanning an already-open source for parts delimited by `token`.
    pub fn start_with_source<S>(&mut self, source: S, token: impl Into<String>) -> FeedStream<ImageFrame>
    where
        S: ChunkSource,
    {
        if self.is_running() {
            debug!("Imagery receiver already running");
            return self.subscribe();
        }

        let token = token.into();
        self.spawn(async move { Ok::<_, LinkError>((source, token)) })
    }

    /// Cancel the request, close the connection and the publish channel.
    ///
    /// Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.channel = None;
        if let Some(mut session) = self.session.take() {
            session.shutdown().await;
            info!("Imagery receiver stopped");
        }
    }

    /// Attach to the current session's channel.
    ///
    /// Without a session the returned stream is already finished.
    pub fn subscribe(&self) -> FeedStream<ImageFrame> {
        match &self.channel {
            Some(channel) => FeedStream::new(channel.resubscribe()),
            None => FeedStream::closed(),
        }
    }

    /// A session is active and has not yet ended or failed.
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|session| !session.is_finished())
    }

    pub fn config(&self) -> &ImageryConfig {
        &self.config
    }

    fn spawn<F, S>(&mut self, connect: F) -> FeedStream<ImageFrame>
    where
        F: Future<Output = Result<(S, String)>> + Send + 'static,
        S: ChunkSource,
    {
        let (publisher, receiver) = broadcast::channel(self.config.channel_capacity.max(1));
        let stream = FeedStream::new(receiver.resubscribe());

        self.channel = Some(receiver);
        self.session = Some(Driver::spawn_imagery(connect, self.config.max_buffer_len, publisher));
        stream
    }
}
