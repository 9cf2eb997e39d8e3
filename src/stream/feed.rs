//! Broadcast subscription stream for feed events

use futures::{Stream, StreamExt, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::types::FeedEvent;

pin_project! {
    /// A subscriber's view of one feed.
    ///
    /// Wraps a broadcast receiver. Events a slow subscriber missed are skipped and
    /// counted in [`missed`](Self::missed) rather than surfaced as errors, so one
    /// inattentive subscriber never affects ingestion or other subscribers.
    ///
    /// The stream ends when the feed closes its channel: on `stop` for the imagery
    /// feed (or right after its terminal event), on `dispose` for the telemetry feed.
    pub struct FeedStream<T> {
        #[pin]
        inner: BroadcastStream<FeedEvent<T>>,
        missed: u64,
    }
}

impl<T: Clone + Send + 'static> FeedStream<T> {
    /// Create a stream from a broadcast receiver
    pub fn new(receiver: broadcast::Receiver<FeedEvent<T>>) -> Self {
        Self { inner: BroadcastStream::new(receiver), missed: 0 }
    }

    /// A stream that is already finished.
    pub fn closed() -> Self {
        let (tx, rx) = broadcast::channel(1);
        drop(tx);
        Self::new(rx)
    }

    /// Number of events skipped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Only the payloads, dropping terminal notifications.
    pub fn items(self) -> impl Stream<Item = T> + Send + 'static {
        self.filter_map(|event| async move { event.into_item() })
    }
}

impl<T: Clone + Send + 'static> Stream for FeedStream<T> {
    type Item = FeedEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    *this.missed += skipped;
                    debug!(skipped, total = *this.missed, "Subscriber lagged, events dropped");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
