//! Command delivery with retries.
//!
//! A command is registered in the [`Registry`] before the first send, so a
//! FEEDBACK that arrives at any point, including during a backoff sleep,
//! completes it. Each attempt sends the COMMAND to the module's last known
//! address and waits for the ack:
//!
//! | Outcome of attempt `n` (0-based) | Pause before the next attempt |
//! |----------------------------------|-------------------------------|
//! | send failed                      | `20 ms * 2^(n + 1)`           |
//! | sent, no FEEDBACK in time        | `50 ms * (n + 1)`             |
//!
//! There is no pause after the last attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::CommandConfig;
use crate::error::DispatchError;
use crate::registry::{CommandTicket, Registry};
use doorlink_core::ModuleId;
use doorlink_core::constants::{ACK_BACKOFF_STEP_MS, SEND_BACKOFF_BASE_MS};
use doorlink_hardware::{LedEvent, LedSink};
use doorlink_network::UdpTransport;
use doorlink_protocol::Message;

/// A command the module acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAck {
    pub command_id: u64,

    /// Id carried by the acknowledging FEEDBACK (at least `command_id`)
    pub feedback_id: u64,

    /// Sends it took, starting at 1
    pub attempts: u32,
}

/// Sends COMMANDs and waits for their FEEDBACK.
pub struct CommandDispatcher {
    registry: Arc<Mutex<Registry>>,
    transport: Arc<UdpTransport>,
    leds: Arc<dyn LedSink>,
    config: CommandConfig,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<Mutex<Registry>>,
        transport: Arc<UdpTransport>,
        leds: Arc<dyn LedSink>,
        config: CommandConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            leds,
            config,
        }
    }

    /// Send `action` for `target` to a module and wait for its FEEDBACK.
    ///
    /// An ack means the module received and attempted the command; the
    /// outcome shows up in its next EVENT or HEARTBEAT.
    ///
    /// # Errors
    ///
    /// `UnknownModule` or `NoRoute` if the module cannot be reached,
    /// `InvalidCommand` if target or action are not single tokens, and
    /// `NoAck` once every attempt went unanswered.
    pub async fn send_command(
        &self,
        module_id: &ModuleId,
        target: &str,
        action: &str,
    ) -> Result<CommandAck, DispatchError> {
        let CommandTicket {
            command_id,
            dest,
            mut ack,
        } = lock(&self.registry).begin_command(module_id, target, action)?;
        let _pending = PendingGuard {
            registry: &self.registry,
            command_id,
        };

        let message = Message::command(module_id.clone(), command_id, target, action)?;

        let attempts = self.config.attempts();
        for attempt in 0..attempts {
            if let Ok(feedback_id) = ack.try_recv() {
                return Ok(self.acked(command_id, feedback_id, attempt));
            }

            let last = attempt + 1 == attempts;
            debug!(command_id, attempt = attempt + 1, %dest, "Sending command");

            if let Err(e) = self.transport.send_to(&message, dest).await {
                warn!(command_id, error = %e, "Failed to send command");
                if !last {
                    sleep(send_backoff(attempt)).await;
                }
                continue;
            }

            match timeout(self.config.ack_timeout(), &mut ack).await {
                Ok(Ok(feedback_id)) => {
                    return Ok(self.acked(command_id, feedback_id, attempt + 1));
                }
                Ok(Err(_)) => break,
                Err(_) => {
                    debug!(command_id, attempt = attempt + 1, "No FEEDBACK in time");
                    if !last {
                        sleep(ack_backoff(attempt)).await;
                    }
                }
            }
        }

        warn!(%module_id, command_id, %target, %action, attempts, "Command not acknowledged");
        self.leds.signal(LedEvent::HubCmdFailure);
        self.leds.signal(LedEvent::NetworkError);
        Err(DispatchError::NoAck { attempts })
    }

    fn acked(&self, command_id: u64, feedback_id: u64, attempts: u32) -> CommandAck {
        info!(command_id, feedback_id, attempts, "Command acknowledged");
        self.leds.signal(LedEvent::HubCmdSuccess);
        CommandAck {
            command_id,
            feedback_id,
            attempts,
        }
    }
}

/// Drops the pending entry when `send_command` returns or its future is
/// dropped mid-flight.
struct PendingGuard<'a> {
    registry: &'a Mutex<Registry>,
    command_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.registry).cancel_command(self.command_id);
    }
}

fn send_backoff(attempt: u32) -> Duration {
    Duration::from_millis(SEND_BACKOFF_BASE_MS << (attempt + 1).min(10))
}

fn ack_backoff(attempt: u32) -> Duration {
    Duration::from_millis(ACK_BACKOFF_STEP_MS * u64::from(attempt + 1))
}

pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
