//! Polled host capability checks (accessory or headset presence)

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A yes/no query against the host environment.
pub trait CapabilityProbe: Send + Sync + 'static {
    fn is_available(&self) -> bool;
}

impl<F> CapabilityProbe for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn is_available(&self) -> bool {
        self()
    }
}

/// Poll `probe` every `interval` and publish its answer.
///
/// The returned receiver holds the first answer immediately and is updated only
/// when the answer changes. Polling stops when `cancel` fires or every receiver
/// is dropped.
pub fn spawn_capability_poller<P>(
    probe: P,
    interval: Duration,
    cancel: CancellationToken,
) -> watch::Receiver<bool>
where
    P: CapabilityProbe,
{
    let (tx, rx) = watch::channel(probe.is_available());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately and the initial answer is already published
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                _ = ticker.tick() => {
                    let available = probe.is_available();
                    if tx.send_if_modified(|current| {
                        let changed = *current != available;
                        *current = available;
                        changed
                    }) {
                        info!(available, "Capability changed");
                    }
                }
            }
        }
        debug!("Capability poller exited");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn initial_answer_is_available_immediately() {
        let cancel = CancellationToken::new();
        let rx = spawn_capability_poller(|| true, Duration::from_secs(60), cancel.clone());
        assert!(*rx.borrow());
        cancel.cancel();
    }

    #[tokio::test]
    async fn change_is_published() {
        let flag = Arc::new(AtomicBool::new(false));
        let probe = {
            let flag = Arc::clone(&flag);
            move || flag.load(Ordering::SeqCst)
        };
        let cancel = CancellationToken::new();
        let mut rx = spawn_capability_poller(probe, Duration::from_millis(5), cancel.clone());
        assert!(!*rx.borrow_and_update());

        flag.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|available| *available))
            .await
            .expect("change should be observed")
            .expect("poller alive");

        cancel.cancel();
    }

    #[tokio::test]
    async fn cancel_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            }
        };
        let cancel = CancellationToken::new();
        let mut rx = spawn_capability_poller(probe, Duration::from_millis(5), cancel.clone());

        cancel.cancel();
        // The sender is dropped once the task exits
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("poller should exit")
            .expect_err("no change is ever sent");

        let after_exit = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_exit);
    }
}
