use doorlink_core::{Channel, Error, ModuleId, Point, PointState, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Door and lock values carried for one channel of a HEARTBEAT.
///
/// Either half may be absent when the sender omitted or garbled it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub open: Option<bool>,
    pub locked: Option<bool>,
}

impl ChannelReport {
    pub fn new(open: bool, locked: bool) -> Self {
        Self {
            open: Some(open),
            locked: Some(locked),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.locked.is_none()
    }
}

impl fmt::Display for ChannelReport {
    /// Formats as `CLOSED,LOCKED`, omitting absent halves.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let door = self.open.map(PointState::door);
        let lock = self.locked.map(PointState::lock);
        match (door, lock) {
            (Some(d), Some(l)) => write!(f, "{d},{l}"),
            (Some(d), None) => write!(f, "{d}"),
            (None, Some(l)) => write!(f, "{l}"),
            (None, None) => Ok(()),
        }
    }
}

/// Payload of a protocol line, keyed by its type token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Module announces itself.
    Hello,

    /// Spontaneous state change of one point.
    Event {
        channel: Channel,
        point: Point,
        state: PointState,
    },

    /// Periodic full state report.
    Heartbeat { d0: ChannelReport, d1: ChannelReport },

    /// Hub instructs a module.
    Command {
        command_id: u64,
        target: String,
        action: String,
    },

    /// Module echoes a command it received.
    Feedback {
        command_id: u64,
        target: String,
        action: String,
    },

    /// Unknown type, or a known type with unusable arguments.
    Other { kind: String, args: Vec<String> },
}

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub module_id: ModuleId,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(module_id: ModuleId, kind: MessageKind) -> Self {
        Message { module_id, kind }
    }

    pub fn hello(module_id: ModuleId) -> Self {
        Self::new(module_id, MessageKind::Hello)
    }

    pub fn event(module_id: ModuleId, channel: Channel, point: Point, state: PointState) -> Self {
        Self::new(
            module_id,
            MessageKind::Event {
                channel,
                point,
                state,
            },
        )
    }

    pub fn heartbeat(module_id: ModuleId, d0: ChannelReport, d1: ChannelReport) -> Self {
        Self::new(module_id, MessageKind::Heartbeat { d0, d1 })
    }

    /// Build a COMMAND line.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if `target` or `action` is not a
    /// single non-empty token.
    pub fn command(module_id: ModuleId, command_id: u64, target: &str, action: &str) -> Result<Self> {
        validate_token("target", target)?;
        validate_token("action", action)?;
        Ok(Self::new(
            module_id,
            MessageKind::Command {
                command_id,
                target: target.to_string(),
                action: action.to_string(),
            },
        ))
    }

    /// Build the FEEDBACK echo of a command.
    pub fn feedback(module_id: ModuleId, command_id: u64, target: &str, action: &str) -> Self {
        Self::new(
            module_id,
            MessageKind::Feedback {
                command_id,
                target: target.to_string(),
                action: action.to_string(),
            },
        )
    }

    /// The type token as it appears on the wire.
    pub fn type_token(&self) -> &str {
        match &self.kind {
            MessageKind::Hello => "HELLO",
            MessageKind::Event { .. } => "EVENT",
            MessageKind::Heartbeat { .. } => "HEARTBEAT",
            MessageKind::Command { .. } => "COMMAND",
            MessageKind::Feedback { .. } => "FEEDBACK",
            MessageKind::Other { kind, .. } => kind,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self.kind, MessageKind::Heartbeat { .. })
    }
}

impl fmt::Display for Message {
    /// Formats the wire line without its terminator.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.module_id, self.type_token())?;
        match &self.kind {
            MessageKind::Hello => Ok(()),
            MessageKind::Event {
                channel,
                point,
                state,
            } => write!(f, " {channel} {point} {state}"),
            MessageKind::Heartbeat { d0, d1 } => {
                if !d0.is_empty() {
                    write!(f, " D0={d0}")?;
                }
                if !d1.is_empty() {
                    write!(f, " D1={d1}")?;
                }
                Ok(())
            }
            MessageKind::Command {
                command_id,
                target,
                action,
            }
            | MessageKind::Feedback {
                command_id,
                target,
                action,
            } => write!(f, " {command_id} {target} {action}"),
            MessageKind::Other { args, .. } => {
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// Actions a door module knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorAction {
    Lock,
    Unlock,
    Status,
}

impl DoorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorAction::Lock => "LOCK",
            DoorAction::Unlock => "UNLOCK",
            DoorAction::Status => "STATUS",
        }
    }
}

impl fmt::Display for DoorAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOCK" => Ok(DoorAction::Lock),
            "UNLOCK" => Ok(DoorAction::Unlock),
            "STATUS" => Ok(DoorAction::Status),
            other => Err(Error::invalid_format(format!("Unknown action: {other}"))),
        }
    }
}

fn validate_token(name: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace()) {
        return Err(Error::invalid_format(format!(
            "{name} must be a single token, got {value:?}"
        )));
    }
    Ok(())
}
