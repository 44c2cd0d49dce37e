//! Periodic composition refresh

use super::RefreshSummary;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Events emitted by the refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Refreshed(RefreshSummary),
    Stopped,
}

/// Cancellable background task that reruns a sweep at a fixed interval
///
/// The first sweep runs immediately. Dropping the refresher without calling
/// [`CompositionRefresher::stop`] aborts the task.
pub struct CompositionRefresher {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl CompositionRefresher {
    pub fn spawn<F, Fut>(
        interval: Duration,
        sweep: F,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshEvent>)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = RefreshSummary> + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let summary = sweep().await;
                        tracing::info!(
                            "Refreshed compositions in {}: {} stored, {} purged",
                            summary.namespace,
                            summary.stored,
                            summary.purged
                        );
                        if event_tx.send(RefreshEvent::Refreshed(summary)).is_err() {
                            break;
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            let _ = event_tx.send(RefreshEvent::Stopped);
            tracing::debug!("Composition refresher stopped");
        });

        (
            Self {
                shutdown,
                handle: Some(handle),
            },
            event_rx,
        )
    }

    /// Signal the loop to stop and wait for it to finish its current sweep
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Composition refresher ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CompositionRefresher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
