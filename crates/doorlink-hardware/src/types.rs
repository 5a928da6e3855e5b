//! Types shared by door peripherals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome signalled to the operator through the status LEDs.
///
/// Each event maps to one blink pattern on the physical board; the mapping
/// is owned by the [`LedPatterns`](crate::traits::LedPatterns) implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedEvent {
    LockSuccess,
    LockFailure,
    UnlockSuccess,
    UnlockFailure,
    /// Door sensor could not be read.
    DoorError,
    /// Transport could not be opened or a command went unacknowledged.
    NetworkError,
    /// Hub received the FEEDBACK for a command it sent.
    HubCmdSuccess,
    /// Hub gave up on a command.
    HubCmdFailure,
}

impl fmt::Display for LedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LedEvent::LockSuccess => "lock-success",
            LedEvent::LockFailure => "lock-failure",
            LedEvent::UnlockSuccess => "unlock-success",
            LedEvent::UnlockFailure => "unlock-failure",
            LedEvent::DoorError => "door-error",
            LedEvent::NetworkError => "network-error",
            LedEvent::HubCmdSuccess => "hub-cmd-success",
            LedEvent::HubCmdFailure => "hub-cmd-failure",
        };
        f.write_str(name)
    }
}
