//! Datagram receiver for the telemetry feed

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::driver::{Driver, Session};
use crate::history::TelemetryHistory;
use crate::provider::DatagramSource;
use crate::providers::UdpDatagramSource;
use crate::stream::FeedStream;
use crate::types::{Feed, FeedEvent, TelemetrySample};
use crate::{LinkError, Result};

/// Telemetry feed adapter.
///
/// The publish channel lives as long as the receiver, so subscribers attached
/// before a `stop` keep receiving samples after the next `start`. Only
/// [`dispose`](Self::dispose) closes it.
pub struct TelemetryReceiver {
    config: TelemetryConfig,
    /// None once disposed
    publisher: Option<broadcast::Sender<FeedEvent<TelemetrySample>>>,
    history: Option<Arc<TelemetryHistory>>,
    session: Option<Session>,
    local_addr: Option<SocketAddr>,
}

impl TelemetryReceiver {
    pub fn new(config: TelemetryConfig) -> Self {
        let (publisher, _) = broadcast::channel(config.channel_capacity.max(1));
        let history = (config.history_len > 0)
            .then(|| Arc::new(TelemetryHistory::new(config.history_len)));

        Self { config, publisher: Some(publisher), history, session: None, local_addr: None }
    }

    /// Bind the configured address and start receiving.
    ///
    /// Calling `start` on a running receiver does nothing.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Bind`] if the address is unavailable (no retry)
    /// - [`LinkError::Disposed`] after [`dispose`](Self::dispose)
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            debug!("Telemetry receiver already running");
            return Ok(());
        }
        self.ensure_open()?;

        let source =
            UdpDatagramSource::bind(self.config.bind_addr, self.config.max_datagram_size).await?;
        self.start_with_source(source)
    }

    /// Start receiving from an already-open source.
    pub fn start_with_source<S>(&mut self, source: S) -> Result<()>
    where
        S: DatagramSource,
    {
        if self.is_running() {
            debug!("Telemetry receiver already running");
            return Ok(());
        }
        let publisher = self.ensure_open()?.clone();

        self.local_addr = source.local_addr();
        self.session = Some(Driver::spawn_telemetry(source, publisher, self.history.clone()));
        info!(local_addr = ?self.local_addr, "Telemetry receiver started");
        Ok(())
    }

    /// Release the socket. Subscribers stay attached.
    pub async fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown().await;
            info!("Telemetry receiver stopped");
        }
        self.local_addr = None;
    }

    /// Stop and close the publish channel for good.
    pub async fn dispose(&mut self) {
        self.stop().await;
        if self.publisher.take().is_some() {
            info!("Telemetry receiver disposed");
        }
    }

    /// Attach a new subscriber.
    ///
    /// After `dispose` the returned stream is already finished.
    pub fn subscribe(&self) -> FeedStream<TelemetrySample> {
        match &self.publisher {
            Some(publisher) => FeedStream::new(publisher.subscribe()),
            None => FeedStream::closed(),
        }
    }

    /// Address the socket is bound to while running.
    ///
    /// `None` once the session has ended, including after a transport failure.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.filter(|_| self.is_running())
    }

    /// A session is active and has not hit a transport failure.
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|session| !session.is_finished())
    }

    pub fn is_disposed(&self) -> bool {
        self.publisher.is_none()
    }

    /// Rolling sample history, if `history_len` is non-zero.
    pub fn history(&self) -> Option<&Arc<TelemetryHistory>> {
        self.history.as_ref()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<&broadcast::Sender<FeedEvent<TelemetrySample>>> {
        self.publisher.as_ref().ok_or_else(|| LinkError::Disposed { feed: Feed::Telemetry })
    }
}
