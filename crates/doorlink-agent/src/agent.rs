//! Door agent runtime.
//!
//! A [`DoorAgent`] owns one [`DoorController`] and connects it to the hub:
//!
//! ```text
//!  hub ──COMMAND──> command listener ──┐
//!                                      ├──> DoorController ──> StateReporter ──EVENT/HEARTBEAT──> hub
//!  heartbeat tick ─────────────────────┘
//! ```
//!
//! The controller sits behind one async mutex, so door operations, the
//! heartbeat sample and command execution never interleave. Reporting
//! happens while that mutex is held, which keeps the hub's view in the
//! order the hardware changed.
//!
//! If the transport cannot be opened the agent still works locally: lock,
//! unlock and status operate the door, and nothing is reported.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::AgentConfig;
use crate::door::{DoorController, DoorOutcome};
use crate::error::Result;
use crate::reporter::{ReportMode, StateReporter};
use doorlink_core::{DoorState, ModuleId};
use doorlink_hardware::{DistanceSensor, LedEvent, LedSink, LockActuator};
use doorlink_network::{TransportError, UdpTransport};
use doorlink_protocol::{DoorAction, Message, MessageKind};

struct AgentShared<S, A> {
    module_id: ModuleId,
    door: Mutex<DoorController<S, A>>,
    reporter: Option<Mutex<StateReporter>>,
}

impl<S, A> AgentShared<S, A>
where
    S: DistanceSensor + 'static,
    A: LockActuator + 'static,
{
    async fn execute(&self, action: DoorAction) -> DoorOutcome {
        let mut door = self.door.lock().await;
        let outcome = match action {
            DoorAction::Lock => door.lock().await,
            DoorAction::Unlock => door.unlock().await,
            DoorAction::Status => door.status().await,
        };
        debug!(module_id = %self.module_id, %action, ?outcome, "Door operation finished");

        if let Some(reporter) = &self.reporter {
            match door.snapshot().await {
                Ok(snapshot) => {
                    if let Err(e) = reporter.lock().await.report(snapshot).await {
                        warn!(error = %e, "Failed to report door state");
                    }
                }
                Err(e) => debug!(error = %e, "Sensor unreadable, skipping report"),
            }
        }

        outcome
    }

    async fn heartbeat(&self) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let mut door = self.door.lock().await;
        let snapshot = match door.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Sensor unreadable, skipping heartbeat");
                return;
            }
        };

        if let Err(e) = reporter.lock().await.heartbeat(snapshot).await {
            warn!(error = %e, "Failed to send heartbeat");
        }
        drop(door);
    }
}

/// Running door agent.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use doorlink_agent::{AgentConfig, DoorAgent};
/// use doorlink_core::{Centimeters, Degrees, ModuleId};
/// use doorlink_hardware::mock::{MockDistanceSensor, MockLeds, MockLockActuator};
///
/// # async fn example() -> doorlink_agent::Result<()> {
/// let config = AgentConfig::new(ModuleId::new("D1").unwrap());
/// let (sensor, _) = MockDistanceSensor::new(Centimeters(4));
/// let (actuator, _) = MockLockActuator::new(Degrees(0));
///
/// let agent = DoorAgent::start(config, sensor, actuator, Arc::new(MockLeds::new())).await?;
/// agent.lock().await;
/// agent.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct DoorAgent<S, A> {
    shared: Arc<AgentShared<S, A>>,
    local_addr: Option<std::net::SocketAddr>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl<S, A> DoorAgent<S, A>
where
    S: DistanceSensor + 'static,
    A: LockActuator + 'static,
{
    /// Start the agent.
    ///
    /// Opens the command socket, reads the initial door state, announces the
    /// module with HELLO and a first HEARTBEAT, then spawns the heartbeat
    /// and command listener tasks.
    ///
    /// # Errors
    /// Returns `AgentError::Config` for an invalid configuration. Transport
    /// failures are not errors: the agent continues without networking.
    pub async fn start(
        config: AgentConfig,
        sensor: S,
        actuator: A,
        leds: Arc<dyn LedSink>,
    ) -> Result<Self> {
        config.validate()?;

        let module_id = config.module_id.clone();
        let transport = match UdpTransport::bind(config.listen_addr()).await {
            Ok(transport) => Some(Arc::new(transport)),
            Err(e) => {
                warn!(module_id = %module_id, error = %e, "Transport unavailable, running offline");
                leds.signal(LedEvent::NetworkError);
                None
            }
        };
        let local_addr = transport.as_ref().and_then(|t| t.local_addr().ok());

        let reporter = transport.as_ref().map(|transport| {
            StateReporter::new(
                Arc::clone(transport),
                module_id.clone(),
                config.hub.notify_addr(),
                config.hub.heartbeat_addr(),
                ReportMode {
                    events: config.report_events,
                    heartbeats: config.report_heartbeats,
                },
            )
        });

        let mut door = DoorController::new(sensor, actuator, leds, config.door.clone());
        let initial = door.status().await;
        info!(module_id = %module_id, ?initial, "Door agent starting");

        if let Some(reporter) = &reporter
            && let Err(e) = reporter.hello().await
        {
            warn!(error = %e, "Failed to send HELLO");
        }

        let shared = Arc::new(AgentShared {
            module_id,
            door: Mutex::new(door),
            reporter: reporter.map(Mutex::new),
        });

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        if let Some(transport) = transport {
            // Initial full-state report.
            shared.heartbeat().await;

            tasks.spawn(heartbeat_loop(
                Arc::clone(&shared),
                config.heartbeat_interval(),
                cancel.clone(),
            ));
            tasks.spawn(command_loop(
                Arc::clone(&shared),
                transport,
                config.hub.notify_addr(),
                cancel.clone(),
            ));
        }

        Ok(Self {
            shared,
            local_addr,
            cancel,
            tasks,
        })
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.shared.module_id
    }

    /// Address of the command socket, if the transport is up.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.local_addr
    }

    pub fn is_online(&self) -> bool {
        self.shared.reporter.is_some()
    }

    pub async fn lock(&self) -> DoorOutcome {
        self.shared.execute(DoorAction::Lock).await
    }

    pub async fn unlock(&self) -> DoorOutcome {
        self.shared.execute(DoorAction::Unlock).await
    }

    pub async fn status(&self) -> DoorOutcome {
        self.shared.execute(DoorAction::Status).await
    }

    /// Last state reached by a door operation.
    pub async fn state(&self) -> DoorState {
        self.shared.door.lock().await.state()
    }

    /// Stop the background tasks and wait for them to finish.
    pub async fn shutdown(mut self) {
        info!(module_id = %self.shared.module_id, "Door agent stopping");
        self.cancel.cancel();

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result
                && !e.is_cancelled()
            {
                warn!(error = %e, "Agent task failed");
            }
        }
    }
}

async fn heartbeat_loop<S, A>(
    shared: Arc<AgentShared<S, A>>,
    period: std::time::Duration,
    cancel: CancellationToken,
) where
    S: DistanceSensor + 'static,
    A: LockActuator + 'static,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the initial report was already sent.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => shared.heartbeat().await,
        }
    }

    debug!("Heartbeat task stopped");
}

async fn command_loop<S, A>(
    shared: Arc<AgentShared<S, A>>,
    transport: Arc<UdpTransport>,
    feedback_dest: std::net::SocketAddr,
    cancel: CancellationToken,
) where
    S: DistanceSensor + 'static,
    A: LockActuator + 'static,
{
    loop {
        let datagram = tokio::select! {
            _ = cancel.cancelled() => break,
            received = transport.recv() => received,
        };

        let datagram = match datagram {
            Ok(datagram) => datagram,
            Err(e) => {
                log_receive_error(&e);
                continue;
            }
        };

        for message in datagram.messages {
            if message.module_id != shared.module_id {
                trace!(target_module = %message.module_id, "Message for another module");
                continue;
            }

            let (command_id, target, action) = match message.kind {
                MessageKind::Command {
                    command_id,
                    target,
                    action,
                } => (command_id, target, action),
                other => {
                    trace!(from = %datagram.from, kind = ?other, "Ignoring non-command");
                    continue;
                }
            };

            info!(command_id, %target, %action, from = %datagram.from, "Command received");
            match action.parse::<DoorAction>() {
                Ok(door_action) => {
                    shared.execute(door_action).await;
                }
                Err(_) => warn!(command_id, %action, "Unsupported action"),
            }

            let feedback = Message::feedback(shared.module_id.clone(), command_id, &target, &action);
            if let Err(e) = transport.send_to(&feedback, feedback_dest).await {
                warn!(command_id, error = %e, "Failed to send FEEDBACK");
            }
        }
    }

    debug!("Command listener stopped");
}

fn log_receive_error(error: &TransportError) {
    if error.is_transient() {
        debug!(error = %error, "Dropped datagram");
    } else {
        warn!(error = %error, "Receive failed");
    }
}
