//! Fire-and-forget alert delivery.
//!
//! The hub raises alerts for door events and liveness transitions through an
//! [`AlertSink`]. [`AlertQueue`] is the provided sink: texts are queued and
//! a single worker hands them to an [`AlertDelivery`] one at a time. A slow
//! or failing delivery never blocks the receive loop; when the queue is full
//! the oldest pending alert is dropped.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Destination for alert texts.
pub trait AlertSink: Send + Sync {
    /// Hand `text` off for delivery; never blocks and never fails.
    fn notify(&self, text: String);
}

/// Delivery failure, logged by the worker and otherwise dropped.
#[derive(Debug, thiserror::Error)]
#[error("Alert delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Transport an alert leaves the hub on, e.g. a chat webhook.
pub trait AlertDelivery: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if the alert could not be delivered.
    fn deliver(&mut self, text: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDelivery;

impl AlertDelivery for TracingDelivery {
    async fn deliver(&mut self, text: &str) -> Result<(), DeliveryError> {
        info!(alert = text, "Alert");
        Ok(())
    }
}

/// Cloneable producer side of the alert queue.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    tx: broadcast::Sender<String>,
}

impl AlertSink for AlertQueue {
    fn notify(&self, text: String) {
        if let Err(broadcast::error::SendError(text)) = self.tx.send(text) {
            trace!(alert = %text, "Alert worker stopped, dropping alert");
        }
    }
}

/// Handle to the task delivering queued alerts.
#[derive(Debug)]
pub struct AlertWorker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AlertWorker {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn<D>(delivery: D, capacity: usize) -> (AlertQueue, AlertWorker)
    where
        D: AlertDelivery + 'static,
    {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(deliver_alerts(delivery, rx, cancel.clone()));

        (AlertQueue { tx }, AlertWorker { cancel, task })
    }

    /// Stop the worker. Alerts still queued are discarded.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Alert worker task failed");
        }
    }
}

async fn deliver_alerts<D: AlertDelivery>(
    mut delivery: D,
    mut rx: broadcast::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(text) => text,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Alert queue full, oldest alerts dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if let Err(e) = delivery.deliver(&text).await {
            warn!(alert = %text, error = %e, "Dropping undeliverable alert");
        }
    }

    debug!("Alert worker stopped");
}
