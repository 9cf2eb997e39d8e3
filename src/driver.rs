//! Driver spawns and runs the per-session receive loops

use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::history::TelemetryHistory;
use crate::multipart::BoundaryScanner;
use crate::packet;
use crate::provider::{ChunkSource, DatagramSource};
use crate::types::{FeedEvent, ImageFrame, TelemetrySample};
use crate::Result;

/// Handle to one running receive loop.
///
/// Dropping the handle cancels the loop; [`shutdown`](Self::shutdown) also waits
/// for it to release its socket or connection.
pub(crate) struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Session {
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub(crate) async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            debug!("Receive loop did not exit cleanly: {}", e);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Driver spawns receive loops for the two feeds.
///
/// Each loop owns its source and races every read against a cancellation token,
/// so stopping never waits for a datagram or chunk that may never arrive.
/// Publishing is fire-and-forget: a send with no subscribers is not an error.
pub(crate) struct Driver;

impl Driver {
    /// Spawn the telemetry loop: datagram → decode → publish.
    pub(crate) fn spawn_telemetry<S>(
        source: S,
        publisher: broadcast::Sender<FeedEvent<TelemetrySample>>,
        history: Option<Arc<TelemetryHistory>>,
    ) -> Session
    where
        S: DatagramSource,
    {
        let cancel = CancellationToken::new();
        let cancel_loop = cancel.clone();

        let task = tokio::spawn(async move {
            Self::telemetry_task(source, publisher, history, cancel_loop).await;
        });

        Session { cancel, task }
    }

    /// Spawn the imagery loop: connect → chunk → scan → publish.
    ///
    /// `connect` resolves to the chunk source and the boundary token to scan for.
    /// Connection failures are published like any other transport failure.
    pub(crate) fn spawn_imagery<F, S>(
        connect: F,
        max_buffer_len: Option<usize>,
        publisher: broadcast::Sender<FeedEvent<ImageFrame>>,
    ) -> Session
    where
        F: Future<Output = Result<(S, String)>> + Send + 'static,
        S: ChunkSource,
    {
        let cancel = CancellationToken::new();
        let cancel_loop = cancel.clone();

        let task = tokio::spawn(async move {
            Self::imagery_task(connect, max_buffer_len, publisher, cancel_loop).await;
        });

        Session { cancel, task }
    }

    async fn telemetry_task<S>(
        mut source: S,
        publisher: broadcast::Sender<FeedEvent<TelemetrySample>>,
        history: Option<Arc<TelemetryHistory>>,
        cancel: CancellationToken,
    ) where
        S: DatagramSource,
    {
        info!("Telemetry receive loop started");
        let mut decoded = 0u64;
        let mut dropped = 0u64;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Telemetry receive loop cancelled");
                    break;
                }
                result = source.recv() => result,
            };

            match result {
                Ok(datagram) => match packet::decode(&datagram) {
                    Ok(sample) => {
                        decoded += 1;
                        trace!(seq = sample.sequence(), ts = sample.timestamp_ms(), "Sample decoded");

                        if let Some(history) = &history {
                            history.push(sample);
                        }
                        // No subscribers is fine
                        let _ = publisher.send(FeedEvent::Item(sample));
                    }
                    Err(e) => {
                        // Short datagrams are network noise, not a feed failure
                        dropped += 1;
                        trace!("Dropping datagram: {}", e);
                    }
                },
                Err(e) => {
                    error!("Telemetry transport failed: {}", e);
                    let _ = publisher.send(FeedEvent::Failed(Arc::new(e)));
                    break;
                }
            }
        }

        info!(decoded, dropped, "Telemetry receive loop ended");
    }

    async fn imagery_task<F, S>(
        connect: F,
        max_buffer_len: Option<usize>,
        publisher: broadcast::Sender<FeedEvent<ImageFrame>>,
        cancel: CancellationToken,
    ) where
        F: Future<Output = Result<(S, String)>> + Send,
        S: ChunkSource,
    {
        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Image stream cancelled before connecting");
                return;
            }
            result = connect => result,
        };

        let (mut source, token) = match connected {
            Ok(connected) => connected,
            Err(e) => {
                error!("Image stream connection failed: {}", e);
                let _ = publisher.send(FeedEvent::Failed(Arc::new(e)));
                return;
            }
        };

        let mut scanner = BoundaryScanner::new(&token);
        if let Some(limit) = max_buffer_len {
            scanner = scanner.with_max_buffer_len(limit);
        }
        info!(boundary = %token, "Image stream loop started");

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Image stream loop cancelled");
                    break;
                }
                result = source.next_chunk() => result,
            };

            match result {
                Ok(Some(chunk)) => {
                    for frame in scanner.push(&chunk) {
                        let _ = publisher.send(FeedEvent::Item(frame));
                    }
                }
                Ok(None) => {
                    info!("Image stream ended by server");
                    let _ = publisher.send(FeedEvent::Ended);
                    break;
                }
                Err(e) => {
                    error!("Image stream failed: {}", e);
                    let _ = publisher.send(FeedEvent::Failed(Arc::new(e)));
                    break;
                }
            }
        }

        info!(
            frames = scanner.frames_emitted(),
            discarded = scanner.parts_discarded(),
            resyncs = scanner.overflow_resyncs(),
            "Image stream loop ended"
        );
    }
}
