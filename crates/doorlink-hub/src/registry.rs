//! Module table, history and pending commands.
//!
//! The [`Registry`] is plain data: it never touches a socket or a clock.
//! Callers pass the receive time in, and alert texts come back out, so the
//! hub can hold its lock for the bookkeeping only and notify afterwards.

use std::mem;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::HubConfig;
use crate::error::DispatchError;
use crate::history::{HistoryEvent, HistoryRing};
use doorlink_core::constants::UNTRACKED_HISTORY_TEXT;
use doorlink_core::{Channel, ModuleId, Point, PointState};
use doorlink_protocol::{ChannelReport, Message, MessageKind, MessageParser};

/// Most recent FEEDBACK from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub command_id: u64,
    pub target: String,
    pub action: String,
    pub received_at: Instant,
}

/// Everything the hub knows about one module.
#[derive(Debug, Clone)]
pub struct ModuleStatus {
    pub module_id: ModuleId,

    /// Primary channel (D0)
    pub door_open: bool,
    pub lock_locked: bool,

    /// Secondary channel (D1)
    pub d1_open: bool,
    pub d1_locked: bool,

    pub first_seen_at: Instant,
    pub last_heartbeat_at: Option<Instant>,
    pub last_event_at: Option<Instant>,

    pub online: bool,
    pub last_online_transition_at: Option<Instant>,

    /// Where the module last sent from; COMMANDs go here.
    pub last_addr: Option<SocketAddr>,

    pub last_feedback: Option<FeedbackRecord>,

    /// State tokens of the last HEARTBEAT, e.g. `D0=CLOSED,LOCKED D1=CLOSED,LOCKED`
    pub last_heartbeat_line: Option<String>,
}

impl ModuleStatus {
    fn new(module_id: ModuleId, now: Instant) -> Self {
        Self {
            module_id,
            door_open: false,
            lock_locked: false,
            d1_open: false,
            d1_locked: false,
            first_seen_at: now,
            last_heartbeat_at: None,
            last_event_at: None,
            online: true,
            last_online_transition_at: None,
            last_addr: None,
            last_feedback: None,
            last_heartbeat_line: None,
        }
    }

    /// `(open, locked)` of `channel`.
    pub fn channel(&self, channel: Channel) -> (bool, bool) {
        match channel {
            Channel::D0 => (self.door_open, self.lock_locked),
            Channel::D1 => (self.d1_open, self.d1_locked),
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> (&mut bool, &mut bool) {
        match channel {
            Channel::D0 => (&mut self.door_open, &mut self.lock_locked),
            Channel::D1 => (&mut self.d1_open, &mut self.d1_locked),
        }
    }

    fn apply_report(&mut self, channel: Channel, report: &ChannelReport) {
        let (open, locked) = self.channel_mut(channel);
        if let Some(value) = report.open {
            *open = value;
        }
        if let Some(value) = report.locked {
            *locked = value;
        }
    }

    /// Reference point for liveness: last heartbeat, or first contact.
    fn heard_at(&self) -> Instant {
        self.last_heartbeat_at.unwrap_or(self.first_seen_at)
    }
}

/// Handle returned by [`Registry::begin_command`].
#[derive(Debug)]
pub struct CommandTicket {
    pub command_id: u64,

    /// Module address at the time the command was issued
    pub dest: SocketAddr,

    /// Resolves with the acknowledging FEEDBACK id
    pub ack: oneshot::Receiver<u64>,
}

#[derive(Debug)]
struct PendingCommand {
    command_id: u64,
    module_id: ModuleId,
    target: String,
    action: String,
    ack: oneshot::Sender<u64>,
}

impl PendingCommand {
    fn acknowledged_by(
        &self,
        module_id: &ModuleId,
        feedback_id: u64,
        target: &str,
        action: &str,
    ) -> bool {
        self.module_id == *module_id
            && self.command_id <= feedback_id
            && self.target == target
            && self.action == action
    }
}

/// Hub state guarded by one lock.
#[derive(Debug)]
pub struct Registry {
    modules: Vec<ModuleStatus>,
    max_modules: usize,
    history: HistoryRing,
    next_command_id: u64,
    pending: Vec<PendingCommand>,
    offline_timeout: Duration,
}

impl Registry {
    pub fn new(max_modules: usize, history_capacity: usize, offline_timeout: Duration) -> Self {
        Self {
            modules: Vec::with_capacity(max_modules),
            max_modules,
            history: HistoryRing::new(history_capacity),
            next_command_id: 1,
            pending: Vec::new(),
            offline_timeout,
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.max_modules,
            config.history_capacity,
            config.offline_timeout(),
        )
    }

    pub fn status(&self, module_id: &ModuleId) -> Option<ModuleStatus> {
        self.modules
            .iter()
            .find(|m| m.module_id == *module_id)
            .cloned()
    }

    /// All tracked modules in the order they were first seen.
    pub fn modules(&self) -> Vec<ModuleStatus> {
        self.modules.clone()
    }

    /// The most recent `max_n` history entries, oldest first.
    pub fn history(&self, max_n: usize) -> Vec<HistoryEvent> {
        self.history.recent(max_n)
    }

    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Parse one raw line and ingest it. Unusable lines are dropped.
    pub fn ingest_line(&mut self, line: &str, from: SocketAddr, now: Instant) -> Vec<String> {
        match MessageParser::parse(line) {
            Ok(message) => self.ingest(&message, from, now),
            Err(e) => {
                trace!(%from, error = %e, "Dropped line");
                Vec::new()
            }
        }
    }

    /// Apply one message. Returns alert texts for the caller to deliver.
    pub fn ingest(&mut self, message: &Message, from: SocketAddr, now: Instant) -> Vec<String> {
        let module_id = &message.module_id;
        let Some(index) = self.find_or_create(module_id, now) else {
            debug!(%module_id, "Module table full, recording history only");
            self.history.push(now, module_id.clone(), UNTRACKED_HISTORY_TEXT);
            return Vec::new();
        };

        self.history.push(now, module_id.clone(), message.to_string());

        let status = &mut self.modules[index];
        status.last_addr = Some(from);

        let mut alerts = Vec::new();
        match &message.kind {
            MessageKind::Heartbeat { d0, d1 } => {
                status.apply_report(Channel::D0, d0);
                status.apply_report(Channel::D1, d1);
                status.last_heartbeat_at = Some(now);
                status.last_heartbeat_line = Some(state_tokens(message));
            }
            MessageKind::Event {
                channel,
                point,
                state,
            } => {
                let (open, locked) = status.channel_mut(*channel);
                let applied = match (point, state) {
                    (Point::Door, PointState::Open | PointState::Closed) => {
                        *open = *state == PointState::Open;
                        true
                    }
                    (Point::Lock, PointState::Locked | PointState::Unlocked) => {
                        *locked = *state == PointState::Locked;
                        true
                    }
                    _ => false,
                };
                status.last_event_at = Some(now);

                if applied {
                    alerts.push(format!("[{module_id}] {channel} {point} is now {state}"));
                }
            }
            MessageKind::Feedback {
                command_id,
                target,
                action,
            } => {
                status.last_feedback = Some(FeedbackRecord {
                    command_id: *command_id,
                    target: target.clone(),
                    action: action.clone(),
                    received_at: now,
                });
                self.acknowledge(module_id, *command_id, target, action);
            }
            MessageKind::Hello | MessageKind::Command { .. } | MessageKind::Other { .. } => {
                status.last_event_at = Some(now);
            }
        }

        alerts
    }

    /// Edge-triggered liveness check. Returns alert texts for transitions.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let mut alerts = Vec::new();

        for status in &mut self.modules {
            let silence = now.saturating_duration_since(status.heard_at());
            let should_be_offline = silence > self.offline_timeout;

            let label = match (should_be_offline, status.online) {
                (true, true) => {
                    warn!(
                        module_id = %status.module_id,
                        silence_ms = silence.as_millis(),
                        "Module went offline"
                    );
                    "OFFLINE"
                }
                (false, false) => {
                    info!(module_id = %status.module_id, "Module back online");
                    "ONLINE"
                }
                _ => continue,
            };

            status.online = !should_be_offline;
            status.last_online_transition_at = Some(now);
            self.history.push(
                now,
                status.module_id.clone(),
                format!("{} EVENT SYSTEM {label}", status.module_id),
            );
            alerts.push(format!("[{}] MODULE SYSTEM is now {label}", status.module_id));
        }

        alerts
    }

    /// Allocate a command id and register its ack waiter.
    ///
    /// # Errors
    /// `UnknownModule` if the module was never seen, `NoRoute` if no address
    /// is recorded for it.
    pub fn begin_command(
        &mut self,
        module_id: &ModuleId,
        target: &str,
        action: &str,
    ) -> Result<CommandTicket, DispatchError> {
        let status = self
            .modules
            .iter()
            .find(|m| m.module_id == *module_id)
            .ok_or_else(|| DispatchError::UnknownModule(module_id.clone()))?;
        let dest = status
            .last_addr
            .ok_or_else(|| DispatchError::NoRoute(module_id.clone()))?;

        let command_id = self.next_command_id;
        self.next_command_id += 1;

        // Entries whose ticket was dropped can never be delivered.
        self.pending.retain(|p| !p.ack.is_closed());

        let (tx, rx) = oneshot::channel();
        self.pending.push(PendingCommand {
            command_id,
            module_id: module_id.clone(),
            target: target.to_string(),
            action: action.to_string(),
            ack: tx,
        });

        Ok(CommandTicket {
            command_id,
            dest,
            ack: rx,
        })
    }

    /// Forget a command that will not be waited for any more.
    pub fn cancel_command(&mut self, command_id: u64) {
        self.pending.retain(|p| p.command_id != command_id);
    }

    fn find_or_create(&mut self, module_id: &ModuleId, now: Instant) -> Option<usize> {
        if let Some(index) = self.modules.iter().position(|m| m.module_id == *module_id) {
            return Some(index);
        }
        if self.modules.len() >= self.max_modules {
            return None;
        }

        info!(%module_id, "New module");
        self.modules.push(ModuleStatus::new(module_id.clone(), now));
        Some(self.modules.len() - 1)
    }

    fn acknowledge(&mut self, module_id: &ModuleId, feedback_id: u64, target: &str, action: &str) {
        let (acked, waiting): (Vec<_>, Vec<_>) = mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.acknowledged_by(module_id, feedback_id, target, action));
        self.pending = waiting;

        for pending in acked {
            debug!(command_id = pending.command_id, feedback_id, "Command acknowledged");
            if pending.ack.send(feedback_id).is_err() {
                trace!(command_id = pending.command_id, "Dispatcher already gave up");
            }
        }
    }
}

/// Arguments of a HEARTBEAT line as sent on the wire.
fn state_tokens(message: &Message) -> String {
    let line = message.to_string();
    line.splitn(3, ' ').nth(2).unwrap_or_default().to_string()
}
