//! Door peripheral trait definitions.
//!
//! These traits are the contract between the door controller and the
//! physical board: an ultrasonic distance sensor facing the door leaf, a
//! servo driving the bolt, and the status LEDs.
//!
//! Methods return `impl Future + Send` so controllers generic over a device
//! can run on spawned Tokio tasks. Implementations may still be written with
//! plain `async fn`.

use std::future::Future;

use crate::error::Result;
use crate::types::LedEvent;
use doorlink_core::{Centimeters, Degrees};

/// Distance sensor facing the door leaf.
///
/// A reading below the configured threshold means the door is closed.
///
/// # Examples
///
/// ```
/// use doorlink_hardware::mock::MockDistanceSensor;
/// use doorlink_hardware::traits::DistanceSensor;
/// use doorlink_core::Centimeters;
///
/// #[tokio::main]
/// async fn main() -> doorlink_hardware::Result<()> {
///     let (mut sensor, handle) = MockDistanceSensor::new(Centimeters(4));
///     assert_eq!(sensor.read_distance().await?, Centimeters(4));
///
///     handle.set_distance(Centimeters(40));
///     assert_eq!(sensor.read_distance().await?, Centimeters(40));
///     Ok(())
/// }
/// ```
pub trait DistanceSensor: Send + Sync {
    /// Take one reading.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::SensorFault` when no echo was received or
    /// the reading is out of range.
    fn read_distance(&mut self) -> impl Future<Output = Result<Centimeters>> + Send;
}

/// Servo or motor that moves the bolt.
pub trait LockActuator: Send + Sync {
    /// Drive the bolt to `angle`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ActuatorFault` when the actuator did not
    /// confirm the move.
    fn rotate_to(&mut self, angle: Degrees) -> impl Future<Output = Result<()>> + Send;

    /// Current angle of the bolt.
    fn position(&self) -> Degrees;
}

/// Plays LED patterns for [`LedEvent`]s.
///
/// Playback may take hundreds of milliseconds; callers normally go through
/// [`LedQueue`](crate::led::LedQueue) instead of calling this directly.
pub trait LedPatterns: Send + Sync {
    /// Play the pattern for `event` to completion.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::LedFault` if the LED driver rejected the pattern.
    fn play(&mut self, event: LedEvent) -> impl Future<Output = Result<()>> + Send;
}
