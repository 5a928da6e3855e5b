//! The hub process: sockets, receive loop and query surface.
//!
//! ```text
//!  notify socket ────┐                      ┌──> AlertSink
//!                    ├──> receive loop ──> Registry <── CommandDispatcher ──> notify socket
//!  heartbeat socket ─┘        │  ▲
//!                             └──┘ liveness sweep (tick, and after each batch)
//! ```
//!
//! The receive loop drains every queued datagram on both sockets before
//! sweeping, so a burst of heartbeats is applied before anything is declared
//! offline.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertSink;
use crate::config::HubConfig;
use crate::dispatcher::{CommandAck, CommandDispatcher, lock};
use crate::error::{DispatchError, Result};
use crate::history::HistoryEvent;
use crate::registry::{ModuleStatus, Registry};
use doorlink_core::ModuleId;
use doorlink_hardware::LedSink;
use doorlink_network::{Datagram, TransportError, UdpTransport};

/// Applies received traffic to the registry and forwards alerts.
#[derive(Clone)]
struct Ingest {
    registry: Arc<Mutex<Registry>>,
    alerts: Arc<dyn AlertSink>,
}

impl Ingest {
    fn datagram(&self, datagram: Datagram) {
        let now = Instant::now();
        let mut alerts = Vec::new();
        {
            let mut registry = lock(&self.registry);
            for message in &datagram.messages {
                debug!(from = %datagram.from, line = %message, "Received");
                alerts.extend(registry.ingest(message, datagram.from, now));
            }
        }
        self.notify(alerts);
    }

    fn line(&self, line: &str, from: SocketAddr) {
        let alerts = lock(&self.registry).ingest_line(line, from, Instant::now());
        self.notify(alerts);
    }

    fn sweep(&self) {
        let alerts = lock(&self.registry).sweep(Instant::now());
        self.notify(alerts);
    }

    fn received(&self, result: std::result::Result<Datagram, TransportError>) {
        match result {
            Ok(datagram) => self.datagram(datagram),
            Err(e) => log_receive_error(&e),
        }
    }

    /// Apply everything already queued on `transport`.
    fn drain(&self, transport: &UdpTransport) {
        loop {
            match transport.try_recv() {
                Ok(Some(datagram)) => self.datagram(datagram),
                Ok(None) => break,
                Err(e) => {
                    log_receive_error(&e);
                    if !e.is_transient() {
                        break;
                    }
                }
            }
        }
    }

    fn notify(&self, alerts: Vec<String>) {
        for text in alerts {
            self.alerts.notify(text);
        }
    }
}

/// Running hub.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use doorlink_hub::{AlertWorker, Hub, HubConfig, TracingDelivery};
/// use doorlink_hardware::mock::MockLeds;
///
/// # async fn example() -> doorlink_hub::Result<()> {
/// let config = HubConfig::default();
/// let (alerts, _worker) = AlertWorker::spawn(TracingDelivery, config.alert_queue_capacity);
///
/// let hub = Hub::start(config, Arc::new(alerts), Arc::new(MockLeds::new())).await?;
/// for event in hub.get_history(20) {
///     println!("{event}");
/// }
/// hub.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Hub {
    ingest: Ingest,
    dispatcher: CommandDispatcher,
    notify_addr: SocketAddr,
    heartbeat_addr: SocketAddr,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl Hub {
    /// Bind the sockets and start the receive loop.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Config` for an invalid configuration and
    /// `HubError::Transport` if a socket cannot be bound.
    pub async fn start(
        config: HubConfig,
        alerts: Arc<dyn AlertSink>,
        leds: Arc<dyn LedSink>,
    ) -> Result<Self> {
        config.validate()?;

        let notify = Arc::new(UdpTransport::bind(config.notify_addr()).await?);
        let heartbeat = if config.shares_socket() {
            None
        } else {
            Some(Arc::new(UdpTransport::bind(config.heartbeat_addr()).await?))
        };

        let notify_addr = notify.local_addr().map_err(TransportError::Receive)?;
        let heartbeat_addr = match &heartbeat {
            Some(transport) => transport.local_addr().map_err(TransportError::Receive)?,
            None => notify_addr,
        };

        let registry = Arc::new(Mutex::new(Registry::from_config(&config)));
        let ingest = Ingest {
            registry: Arc::clone(&registry),
            alerts,
        };
        let dispatcher = CommandDispatcher::new(registry, Arc::clone(&notify), leds, config.commands);

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        tasks.spawn(receive_loop(
            ingest.clone(),
            notify,
            heartbeat,
            config.sweep_interval(),
            cancel.clone(),
        ));

        info!(%notify_addr, %heartbeat_addr, "Hub started");

        Ok(Self {
            ingest,
            dispatcher,
            notify_addr,
            heartbeat_addr,
            cancel,
            tasks,
        })
    }

    /// Address modules send HELLO, EVENT and FEEDBACK to.
    pub fn notify_addr(&self) -> SocketAddr {
        self.notify_addr
    }

    /// Address modules send HEARTBEATs to.
    pub fn heartbeat_addr(&self) -> SocketAddr {
        self.heartbeat_addr
    }

    pub fn get_status(&self, module_id: &ModuleId) -> Option<ModuleStatus> {
        lock(&self.ingest.registry).status(module_id)
    }

    pub fn modules(&self) -> Vec<ModuleStatus> {
        lock(&self.ingest.registry).modules()
    }

    /// The most recent `max_n` history entries, oldest first.
    pub fn get_history(&self, max_n: usize) -> Vec<HistoryEvent> {
        lock(&self.ingest.registry).history(max_n)
    }

    /// See [`CommandDispatcher::send_command`].
    pub async fn send_command(
        &self,
        module_id: &ModuleId,
        target: &str,
        action: &str,
    ) -> std::result::Result<CommandAck, DispatchError> {
        self.dispatcher.send_command(module_id, target, action).await
    }

    /// Apply a line as if it had arrived from `from`.
    pub fn ingest_line(&self, line: &str, from: SocketAddr) {
        self.ingest.line(line, from);
    }

    /// Run the liveness check now.
    pub fn sweep(&self) {
        self.ingest.sweep();
    }

    /// Stop the receive loop and close the sockets.
    pub async fn shutdown(mut self) {
        info!("Hub stopping");
        self.cancel.cancel();

        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("Hub task cancelled"),
                Err(e) => error!(error = %e, "Hub task panicked"),
            }
        }
    }
}

async fn receive_loop(
    ingest: Ingest,
    notify: Arc<UdpTransport>,
    heartbeat: Option<Arc<UdpTransport>>,
    sweep_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                ingest.sweep();
                continue;
            }
            received = notify.recv() => ingest.received(received),
            received = recv_optional(heartbeat.as_deref()) => ingest.received(received),
        }

        ingest.drain(&notify);
        if let Some(heartbeat) = &heartbeat {
            ingest.drain(heartbeat);
        }
        ingest.sweep();
    }

    debug!("Receive loop stopped");
}

async fn recv_optional(
    transport: Option<&UdpTransport>,
) -> std::result::Result<Datagram, TransportError> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

fn log_receive_error(error: &TransportError) {
    if error.is_transient() {
        debug!(error = %error, "Dropped datagram");
    } else {
        warn!(error = %error, "Receive failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorlink_hardware::mock::MockLeds;
    use std::sync::PoisonError;

    #[derive(Default)]
    struct Collected(Mutex<Vec<String>>);

    impl AlertSink for Collected {
        fn notify(&self, text: String) {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).push(text);
        }
    }

    impl Collected {
        fn texts(&self) -> Vec<String> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    fn local_config() -> HubConfig {
        HubConfig {
            bind_address: "127.0.0.1".parse().unwrap(),
            notify_port: 0,
            heartbeat_port: 0,
            ..HubConfig::default()
        }
    }

    fn id(s: &str) -> ModuleId {
        ModuleId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_binds_two_sockets() {
        let hub = Hub::start(local_config(), Arc::new(Collected::default()), Arc::new(MockLeds::new()))
            .await
            .unwrap();

        assert_ne!(hub.notify_addr(), hub.heartbeat_addr());
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_ingest_line_raises_alerts() {
        let alerts = Arc::new(Collected::default());
        let hub = Hub::start(local_config(), alerts.clone(), Arc::new(MockLeds::new()))
            .await
            .unwrap();
        let from: SocketAddr = "10.1.1.1:5000".parse().unwrap();

        hub.ingest_line("D3 EVENT D0 LOCK UNLOCKED", from);

        assert_eq!(alerts.texts(), ["[D3] D0 LOCK is now UNLOCKED"]);
        assert_eq!(hub.get_status(&id("D3")).unwrap().last_addr, Some(from));
        assert_eq!(hub.get_history(10).len(), 1);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = HubConfig {
            max_modules: 0,
            ..local_config()
        };
        let result = Hub::start(config, Arc::new(Collected::default()), Arc::new(MockLeds::new())).await;
        assert!(result.is_err());
    }
}
