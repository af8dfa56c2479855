//! Typing indicator kept alive while the backend works.

use georgi_core::traits::Channel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Handle to a running typing loop.
///
/// The loop emits immediately, then once per interval, until [`stop`](Self::stop)
/// is awaited or the handle is dropped. Failed emissions are logged and skipped.
pub struct TypingIndicator {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    pub fn start(channel: Arc<dyn Channel>, target: String, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the handle is dropped.
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        // A dropped emission only costs one tick.
                        if let Err(e) = channel.send_typing(&target).await {
                            warn!("typing indicator for {target} failed: {e}");
                        }
                    }
                }
            }
            debug!("typing indicator for {target} finished");
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop the loop and wait until it has fully exited.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
