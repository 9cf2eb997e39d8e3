//! Connection lifecycle manager for both feeds
//!
//! The manager starts and stops the two receivers together and derives a
//! per-feed connectivity flag from the events each one publishes. It never
//! looks at payloads.

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::connection::{ImageryReceiver, TelemetryReceiver};
use crate::stream::FeedStream;
use crate::types::{ConnectionStatus, Feed, FeedEvent, ImageFrame, TelemetrySample};
use crate::{LinkError, Result};

/// Owns one receiver per feed and tracks their connectivity.
///
/// A feed is marked connected on the first item it publishes in a session and
/// disconnected when it reports a transport failure. Silence never flips a flag,
/// and neither does a normal end of stream.
pub struct ConnectionManager {
    config: LinkConfig,
    telemetry: TelemetryReceiver,
    imagery: ImageryReceiver,
    status: watch::Sender<ConnectionStatus>,
    /// Cancels the monitor tasks of the current session
    monitors: Option<CancellationToken>,
}

impl ConnectionManager {
    pub fn new(config: LinkConfig) -> Self {
        let telemetry = TelemetryReceiver::new(config.telemetry.clone());
        let imagery = ImageryReceiver::new(config.imagery.clone());
        let (status, _) = watch::channel(ConnectionStatus::default());

        Self { config, telemetry, imagery, status, monitors: None }
    }

    /// Start both receivers and begin tracking their status.
    ///
    /// A telemetry bind failure does not prevent the imagery feed from starting;
    /// the first error encountered is returned after both were attempted.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Disposed`] without starting anything once the
    /// manager has been disposed.
    pub async fn start_services(&mut self) -> Result<()> {
        if self.telemetry.is_disposed() {
            return Err(LinkError::Disposed { feed: Feed::Telemetry });
        }
        if let Some(previous) = self.monitors.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();

        // Subscribe before starting so the first sample is not missed
        let telemetry_events = self.telemetry.subscribe();
        let telemetry_result = self.telemetry.start().await;
        match &telemetry_result {
            Ok(()) => {
                tokio::spawn(monitor_feed(
                    Feed::Telemetry,
                    telemetry_events,
                    self.status.clone(),
                    cancel.clone(),
                ));
            }
            Err(e) => warn!("Telemetry feed failed to start: {}", e),
        }

        let imagery_result = self.imagery.start().map(|events| {
            tokio::spawn(monitor_feed(Feed::Imagery, events, self.status.clone(), cancel.clone()));
        });
        if let Err(e) = &imagery_result {
            warn!("Imagery feed failed to start: {}", e);
        }

        self.monitors = Some(cancel);
        info!("Services started");
        telemetry_result.and(imagery_result)
    }

    /// Stop both receivers.
    ///
    /// Connectivity flags keep their last value unless `reset_status_on_stop`
    /// is set.
    pub async fn stop_services(&mut self) {
        if let Some(monitors) = self.monitors.take() {
            monitors.cancel();
        }
        self.telemetry.stop().await;
        self.imagery.stop().await;

        if self.config.reset_status_on_stop {
            self.status.send_if_modified(|status| {
                let changed = *status != ConnectionStatus::default();
                *status = ConnectionStatus::default();
                changed
            });
        }
        info!("Services stopped");
    }

    /// Stop everything and close the telemetry channel for good.
    pub async fn dispose(&mut self) {
        self.stop_services().await;
        self.telemetry.dispose().await;
    }

    /// Current connectivity flags.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// The current status, then every change to either flag.
    pub fn status_updates(&self) -> impl Stream<Item = ConnectionStatus> + Send + 'static {
        WatchStream::new(self.status.subscribe())
    }

    /// Raw watch receiver for the status.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_telemetry(&self) -> FeedStream<TelemetrySample> {
        self.telemetry.subscribe()
    }

    /// Subscription to the running imagery session, if any.
    pub fn subscribe_imagery(&self) -> FeedStream<ImageFrame> {
        self.imagery.subscribe()
    }

    pub fn telemetry(&self) -> &TelemetryReceiver {
        &self.telemetry
    }

    pub fn imagery(&self) -> &ImageryReceiver {
        &self.imagery
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        debug!("Dropping connection manager");
        if let Some(monitors) = self.monitors.take() {
            monitors.cancel();
        }
    }
}

/// Follow one feed's events and mirror them into its connectivity flag.
async fn monitor_feed<T>(
    feed: Feed,
    mut events: FeedStream<T>,
    status: watch::Sender<ConnectionStatus>,
    cancel: CancellationToken,
) where
    T: Clone + Send + 'static,
{
    let mut seen_item = false;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.next() => event,
        };

        match event {
            Some(FeedEvent::Item(_)) => {
                if !seen_item {
                    seen_item = true;
                    set_connected(&status, feed, true);
                }
            }
            Some(FeedEvent::Failed(e)) => {
                warn!(%feed, "Feed failed: {}", e);
                seen_item = false;
                set_connected(&status, feed, false);
            }
            Some(FeedEvent::Ended) => {
                info!(%feed, "Feed ended");
            }
            None => break,
        }
    }

    debug!(%feed, "Status monitor exited");
}

fn set_connected(status: &watch::Sender<ConnectionStatus>, feed: Feed, connected: bool) {
    if status.send_if_modified(|current| current.set(feed, connected)) {
        info!(%feed, connected, "Connectivity changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageryConfig, TelemetryConfig};
    use crate::test_utils::{StubResponse, multipart_part, send_datagrams, serve_once, REFERENCE_SAMPLE};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const WAIT: Duration = Duration::from_secs(2);

    fn loopback_config(stream_addr: std::net::SocketAddr) -> LinkConfig {
        LinkConfig {
            telemetry: TelemetryConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                ..TelemetryConfig::default()
            },
            imagery: ImageryConfig {
                url: format!("http://{}/stream", stream_addr),
                ..ImageryConfig::default()
            },
            reset_status_on_stop: false,
        }
    }

    async fn live_stream() -> std::net::SocketAddr {
        let mut chunk = multipart_part("frame", b"jpeg");
        chunk.extend_from_slice(b"\r\n--frame");
        serve_once(StubResponse::multipart("frame", vec![chunk]).held_open()).await.unwrap()
    }

    async fn wait_for(
        updates: &mut watch::Receiver<ConnectionStatus>,
        predicate: impl FnMut(&ConnectionStatus) -> bool,
    ) -> ConnectionStatus {
        let status = tokio::time::timeout(WAIT, updates.wait_for(predicate))
            .await
            .expect("timed out waiting for status")
            .expect("status channel closed");
        *status
    }

    #[tokio::test]
    async fn monitor_tracks_item_failure_and_end() {
        let (tx, rx) = broadcast::channel(8);
        let (status, mut updates) = watch::channel(ConnectionStatus::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor_feed(Feed::Imagery, FeedStream::new(rx), status, cancel.clone()));

        tx.send(FeedEvent::Item(1u8)).unwrap();
        wait_for(&mut updates, |s| s.imagery).await;

        tx.send(FeedEvent::Failed(Arc::new(LinkError::transport("reset")))).unwrap();
        wait_for(&mut updates, |s| !s.imagery).await;

        // Next session comes back up on its first item
        tx.send(FeedEvent::Item(2u8)).unwrap();
        let status = wait_for(&mut updates, |s| s.imagery).await;
        assert!(!status.telemetry);

        tx.send(FeedEvent::Ended).unwrap();
        drop(tx);
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
        assert!(updates.borrow().imagery, "normal end does not clear the flag");
    }

    #[tokio::test]
    async fn both_feeds_report_connected() {
        let _ = tracing_subscriber::fmt::try_init();

        let mut manager = ConnectionManager::new(loopback_config(live_stream().await));
        let mut updates = manager.watch_status();
        manager.start_services().await.unwrap();

        let target = manager.telemetry().local_addr().expect("telemetry bound");
        let packet = REFERENCE_SAMPLE.to_bytes();
        send_datagrams(target, &[&packet[..]]).await.unwrap();

        let status = wait_for(&mut updates, ConnectionStatus::is_fully_connected).await;
        assert!(status.telemetry && status.imagery);
        assert_eq!(manager.status(), status);

        manager.dispose().await;
    }

    #[tokio::test]
    async fn stop_keeps_flags_by_default() {
        let mut manager = ConnectionManager::new(loopback_config(live_stream().await));
        let mut updates = manager.watch_status();
        manager.start_services().await.unwrap();
        wait_for(&mut updates, |s| s.imagery).await;

        tokio::time::timeout(WAIT, manager.stop_services()).await.expect("stop must not hang");
        assert!(manager.status().imagery);
        assert!(!manager.imagery().is_running());
        assert!(!manager.telemetry().is_running());
    }

    #[tokio::test]
    async fn stop_resets_flags_when_configured() {
        let mut config = loopback_config(live_stream().await);
        config.reset_status_on_stop = true;

        let mut manager = ConnectionManager::new(config);
        let mut updates = manager.watch_status();
        manager.start_services().await.unwrap();
        wait_for(&mut updates, |s| s.imagery).await;

        manager.stop_services().await;
        assert_eq!(manager.status(), ConnectionStatus::default());
    }

    #[tokio::test]
    async fn telemetry_bind_failure_does_not_block_imagery() {
        let occupied = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = loopback_config(live_stream().await);
        config.telemetry.bind_addr = occupied.local_addr().unwrap();

        let mut manager = ConnectionManager::new(config);
        let mut updates = manager.watch_status();

        let result = manager.start_services().await;
        assert!(matches!(result, Err(LinkError::Bind { .. })));

        let status = wait_for(&mut updates, |s| s.imagery).await;
        assert!(!status.telemetry);

        manager.stop_services().await;
    }

    #[tokio::test]
    async fn imagery_failure_clears_only_its_flag() {
        let addr = serve_once(StubResponse::status(500)).await.unwrap();
        let mut manager = ConnectionManager::new(loopback_config(addr));
        let mut updates = manager.watch_status();
        manager.start_services().await.unwrap();

        let target = manager.telemetry().local_addr().unwrap();
        let packet = REFERENCE_SAMPLE.to_bytes();
        send_datagrams(target, &[&packet[..]]).await.unwrap();

        let status = wait_for(&mut updates, |s| s.telemetry).await;
        assert!(!status.imagery);

        manager.stop_services().await;
    }

    #[tokio::test]
    async fn disposed_manager_cannot_restart() {
        let mut manager = ConnectionManager::new(loopback_config(live_stream().await));
        manager.dispose().await;

        match manager.start_services().await {
            Err(LinkError::Disposed { feed }) => assert_eq!(feed, Feed::Telemetry),
            other => panic!("expected Disposed, got {:?}", other),
        }
        assert!(!manager.imagery().is_running());
        assert!(!manager.telemetry().is_running());

        // Nothing was spawned that could flip a flag
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.status(), ConnectionStatus::default());
    }

    #[tokio::test]
    async fn status_updates_yield_current_value_first() {
        let manager = ConnectionManager::new(LinkConfig::default());
        let mut updates = Box::pin(manager.status_updates());
        let first = tokio::time::timeout(WAIT, updates.next()).await.unwrap();
        assert_eq!(first, Some(ConnectionStatus::default()));
    }
}
