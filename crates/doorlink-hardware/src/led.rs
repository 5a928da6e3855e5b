//! Fire-and-forget LED signalling.
//!
//! Lock and unlock paths must never wait for a blink pattern to finish, so
//! callers hand [`LedEvent`]s to a bounded [`LedQueue`]. A single worker task
//! plays them in order through a [`LedPatterns`] implementation. When the
//! queue is full the oldest pending event is overwritten.
//!
//! ```
//! use doorlink_hardware::led::{LedSink, LedWorker};
//! use doorlink_hardware::mock::MockLeds;
//! use doorlink_hardware::LedEvent;
//!
//! #[tokio::main]
//! async fn main() {
//!     let leds = MockLeds::new();
//!     let (queue, worker) = LedWorker::spawn(leds.clone(), 32);
//!
//!     queue.signal(LedEvent::LockSuccess);
//!
//!     worker.shutdown().await;
//! }
//! ```

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::traits::LedPatterns;
use crate::types::LedEvent;

/// Non-blocking LED signalling endpoint.
pub trait LedSink: Send + Sync {
    /// Enqueue `event`; never blocks and never fails.
    fn signal(&self, event: LedEvent);
}

/// Cloneable producer side of the LED queue.
#[derive(Debug, Clone)]
pub struct LedQueue {
    tx: broadcast::Sender<LedEvent>,
}

impl LedSink for LedQueue {
    fn signal(&self, event: LedEvent) {
        if self.tx.send(event).is_err() {
            trace!(%event, "LED worker stopped, dropping event");
        }
    }
}

/// Handle to the task playing queued LED events.
#[derive(Debug)]
pub struct LedWorker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LedWorker {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// `capacity` is the number of pending events kept before the oldest
    /// ones are dropped.
    pub fn spawn<P>(patterns: P, capacity: usize) -> (LedQueue, LedWorker)
    where
        P: LedPatterns + 'static,
    {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(play_events(patterns, rx, cancel.clone()));

        (LedQueue { tx }, LedWorker { cancel, task })
    }

    /// Stop the worker. Events still queued are discarded.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "LED worker task failed");
        }
    }
}

async fn play_events<P: LedPatterns>(
    mut patterns: P,
    mut rx: broadcast::Receiver<LedEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "LED queue full, oldest events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if let Err(e) = patterns.play(event).await {
            warn!(%event, error = %e, "Failed to play LED pattern");
        }
    }

    debug!("LED worker stopped");
}
