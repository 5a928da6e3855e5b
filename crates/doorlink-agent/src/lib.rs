//! # doorlink-agent
//!
//! Firmware logic of a door module: drives the lock from a distance sensor
//! and a bolt actuator, reports state changes and heartbeats to the hub, and
//! executes COMMANDs the hub sends.
//!
//! Hardware is reached only through the traits in `doorlink-hardware`, so
//! the same agent runs against real drivers or the mocks used in tests.

pub mod agent;
pub mod config;
pub mod door;
pub mod error;
pub mod reporter;

pub use agent::DoorAgent;
pub use config::{AgentConfig, DoorConfig, HubEndpoint};
pub use door::{DoorController, DoorOutcome, DoorSnapshot};
pub use error::{AgentError, Result};
pub use reporter::{ReportMode, StateReporter};
