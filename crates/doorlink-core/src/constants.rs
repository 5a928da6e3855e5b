//! Protocol and deployment defaults shared by the hub and the door modules.
//!
//! The wire protocol is a line-oriented text protocol carried in UDP
//! datagrams:
//!
//! ```text
//! <module_id> <TYPE> [arguments...]\n
//! ```
//!
//! | Type | Direction | Example |
//! |------|-----------|---------|
//! | `HELLO` | module -> hub | `D1 HELLO` |
//! | `EVENT` | module -> hub | `D1 EVENT D0 DOOR OPEN` |
//! | `HEARTBEAT` | module -> hub | `D1 HEARTBEAT D0=CLOSED,LOCKED D1=CLOSED,LOCKED` |
//! | `COMMAND` | hub -> module | `D1 COMMAND 7 D0 UNLOCK` |
//! | `FEEDBACK` | module -> hub | `D1 FEEDBACK 7 D0 UNLOCK` |
//!
//! Every value here is a default; the hub and agent configurations can
//! override the deployment-specific ones.
//!
//! ```
//! use doorlink_core::constants::*;
//! use std::time::Duration;
//!
//! let offline_after = Duration::from_millis(DEFAULT_OFFLINE_TIMEOUT_MS);
//! assert_eq!(offline_after.as_secs(), 10);
//! ```

// ============================================================================
// Wire format
// ============================================================================

/// Line terminator appended to every outbound message.
pub const LINE_TERMINATOR: char = '\n';

/// Maximum visible length of a module identifier.
pub const MAX_MODULE_ID_LEN: usize = 15;

/// Default maximum accepted line length in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 256;

/// Receive buffer size for one datagram.
pub const MAX_DATAGRAM_SIZE: usize = 512;

// ============================================================================
// Ports
// ============================================================================

/// UDP port for EVENT, HELLO, COMMAND and FEEDBACK traffic.
pub const DEFAULT_NOTIFY_PORT: u16 = 12345;

/// UDP port for HEARTBEAT traffic.
pub const DEFAULT_HEARTBEAT_PORT: u16 = 12346;

// ============================================================================
// Timing
// ============================================================================

/// Interval between HEARTBEAT messages sent by a door module.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// A module with no heartbeat for longer than this is considered offline.
pub const DEFAULT_OFFLINE_TIMEOUT_MS: u64 = 10_000;

/// Period of the hub's receive-loop tick and liveness sweep.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;

/// Time the dispatcher waits for a FEEDBACK after each COMMAND send.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 500;

/// Additional COMMAND attempts after the first one.
pub const DEFAULT_COMMAND_RETRIES: u32 = 2;

/// Base delay of the exponential backoff applied after a failed send.
pub const SEND_BACKOFF_BASE_MS: u64 = 20;

/// Per-attempt delay applied after an unacknowledged send.
pub const ACK_BACKOFF_STEP_MS: u64 = 50;

// ============================================================================
// Hub capacities
// ============================================================================

/// Maximum number of modules tracked by one hub.
pub const DEFAULT_MAX_MODULES: usize = 8;

/// Capacity of the hub's history ring.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// History text recorded for messages from modules the hub cannot track.
pub const UNTRACKED_HISTORY_TEXT: &str = "<NO-STATE> (untracked)";

// ============================================================================
// Door hardware
// ============================================================================

/// A distance reading below this value means the door is closed.
pub const DEFAULT_CLOSED_THRESHOLD_CM: u32 = 10;

/// Actuator angle of the engaged bolt.
pub const DEFAULT_LOCKED_POSITION_DEG: u16 = 180;

/// Actuator angle of the retracted bolt.
pub const DEFAULT_UNLOCKED_POSITION_DEG: u16 = 0;

/// Length of the averaged distance sampling window.
pub const DEFAULT_SAMPLING_WINDOW_MS: u64 = 100;

/// Delay between two samples inside the sampling window.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 5;

/// Capacity of the LED event queue.
pub const DEFAULT_LED_QUEUE_CAPACITY: usize = 32;

/// Capacity of the alert queue.
pub const DEFAULT_ALERT_QUEUE_CAPACITY: usize = 64;
