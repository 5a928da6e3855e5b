//! Hardware abstraction layer for doorlink door modules.
//!
//! A door module drives three peripherals:
//!
//! - a [`DistanceSensor`] facing the door leaf,
//! - a [`LockActuator`] moving the bolt,
//! - status LEDs, reached through a non-blocking [`LedSink`].
//!
//! All device traits are async and `Send`, so a controller generic over its
//! devices can live on a spawned Tokio task. Simulated devices for tests and
//! for running an agent without a board live in [`mock`].

pub mod error;
pub mod led;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use led::{LedQueue, LedSink, LedWorker};
pub use traits::{DistanceSensor, LedPatterns, LockActuator};
pub use types::LedEvent;
