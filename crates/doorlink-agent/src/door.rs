//! Door lock controller.
//!
//! Combines the distance sensor and the bolt actuator into the three door
//! operations. Moves, refusals and sensor faults are signalled on the LEDs.
//!
//! # State Transitions
//!
//! | Operation | Condition | New state |
//! |-----------|-----------|-----------|
//! | `lock` | averaged distance below threshold, bolt engaged | `Locked` |
//! | `unlock` | door closed (or trusted locked), bolt retracted | `Unlocked` |
//! | `lock` / `unlock` | distance at or above threshold | `Open` |
//! | `status` | bolt engaged | `Locked` |
//! | `status` | bolt retracted | `Unlocked` or `Open` by distance |
//! | any | sensor unreadable | `Unknown` |
//!
//! The bolt is never driven while the door reads open, and never driven when
//! the sensor cannot be read.

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::DoorConfig;
use doorlink_core::{Centimeters, DoorState};
use doorlink_hardware::{DistanceSensor, HardwareError, LedEvent, LedSink, LockActuator};

/// Result of one door operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorOutcome {
    /// Bolt moved; the door is now in the given state.
    Moved(DoorState),

    /// Bolt was already where it was asked to go; nothing moved.
    AlreadyInPosition(DoorState),

    /// Door reads open; bolt not moved.
    RefusedOpen,

    /// Sensor could not be read; bolt not moved.
    SensorFault,

    /// Actuator did not confirm the move.
    ActuatorFault,

    /// Result of a status query.
    Status(DoorState),
}

/// Live hardware reading used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorSnapshot {
    pub open: bool,
    pub locked: bool,
}

/// Drives one door from its sensor and actuator.
pub struct DoorController<S, A> {
    sensor: S,
    actuator: A,
    leds: Arc<dyn LedSink>,
    config: DoorConfig,
    state: DoorState,
}

impl<S, A> DoorController<S, A>
where
    S: DistanceSensor,
    A: LockActuator,
{
    pub fn new(sensor: S, actuator: A, leds: Arc<dyn LedSink>, config: DoorConfig) -> Self {
        Self {
            sensor,
            actuator,
            leds,
            config,
            state: DoorState::Unknown,
        }
    }

    /// Last state reached by an operation.
    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn config(&self) -> &DoorConfig {
        &self.config
    }

    /// Engage the bolt if the door is closed.
    ///
    /// The door is sampled over the configured window first, so a door
    /// swinging past the sensor is not mistaken for a closed one.
    pub async fn lock(&mut self) -> DoorOutcome {
        let locked = self.config.locked_position();
        if self.actuator.position() == locked {
            debug!("Already locked");
            return DoorOutcome::AlreadyInPosition(self.state);
        }

        let distance = match self.average_distance().await {
            Ok(distance) => distance,
            Err(e) => return self.sensor_failed(e),
        };

        if distance >= self.config.closed_threshold() {
            info!(%distance, "Door open, refusing to lock");
            self.state = DoorState::Open;
            self.leds.signal(LedEvent::LockFailure);
            return DoorOutcome::RefusedOpen;
        }

        match self.actuator.rotate_to(locked).await {
            Ok(()) => {
                info!("Door locked");
                self.state = DoorState::Locked;
                self.leds.signal(LedEvent::LockSuccess);
                DoorOutcome::Moved(DoorState::Locked)
            }
            Err(e) => {
                warn!(error = %e, "Failed to engage bolt");
                self.leds.signal(LedEvent::LockFailure);
                DoorOutcome::ActuatorFault
            }
        }
    }

    /// Retract the bolt.
    ///
    /// A door last seen locked is trusted to be closed when
    /// `trust_last_locked` is set; otherwise one instantaneous reading must
    /// show it closed.
    pub async fn unlock(&mut self) -> DoorOutcome {
        let unlocked = self.config.unlocked_position();
        if self.actuator.position() == unlocked {
            debug!("Already unlocked");
            return DoorOutcome::AlreadyInPosition(self.state);
        }

        let trusted = self.config.trust_last_locked && self.state == DoorState::Locked;
        if !trusted {
            let distance = match self.sensor.read_distance().await {
                Ok(distance) => distance,
                Err(e) => return self.sensor_failed(e),
            };

            if distance >= self.config.closed_threshold() {
                info!(%distance, "Door open, refusing to unlock");
                self.state = DoorState::Open;
                self.leds.signal(LedEvent::UnlockFailure);
                return DoorOutcome::RefusedOpen;
            }
        }

        match self.actuator.rotate_to(unlocked).await {
            Ok(()) => {
                info!("Door unlocked");
                self.state = DoorState::Unlocked;
                self.leds.signal(LedEvent::UnlockSuccess);
                DoorOutcome::Moved(DoorState::Unlocked)
            }
            Err(e) if self.actuator.position() == unlocked => {
                warn!(error = %e, "Actuator reported failure but bolt is retracted");
                self.state = DoorState::Unlocked;
                self.leds.signal(LedEvent::UnlockSuccess);
                DoorOutcome::AlreadyInPosition(DoorState::Unlocked)
            }
            Err(e) => {
                warn!(error = %e, "Failed to retract bolt");
                self.leds.signal(LedEvent::UnlockFailure);
                DoorOutcome::ActuatorFault
            }
        }
    }

    /// Determine the current state.
    ///
    /// An engaged bolt means locked without consulting the sensor.
    pub async fn status(&mut self) -> DoorOutcome {
        if self.actuator.position() == self.config.locked_position() {
            self.state = DoorState::Locked;
            return DoorOutcome::Status(DoorState::Locked);
        }

        match self.sensor.read_distance().await {
            Ok(distance) => {
                self.state = if distance < self.config.closed_threshold() {
                    DoorState::Unlocked
                } else {
                    DoorState::Open
                };
                DoorOutcome::Status(self.state)
            }
            Err(e) => {
                self.sensor_failed(e);
                DoorOutcome::Status(DoorState::Unknown)
            }
        }
    }

    /// Read the hardware once for reporting.
    ///
    /// # Errors
    /// Returns the sensor error; callers skip the report.
    pub async fn snapshot(&mut self) -> Result<DoorSnapshot, HardwareError> {
        let distance = self.sensor.read_distance().await?;
        Ok(DoorSnapshot {
            open: distance >= self.config.closed_threshold(),
            locked: self.actuator.position() == self.config.locked_position(),
        })
    }

    /// Mean of all successful readings taken over the sampling window.
    async fn average_distance(&mut self) -> Result<Centimeters, HardwareError> {
        let window = self.config.sampling_window();
        let interval = self.config.sample_interval();
        let start = Instant::now();

        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        let mut last_error = None;

        loop {
            match self.sensor.read_distance().await {
                Ok(distance) => {
                    sum += u64::from(distance.get());
                    count += 1;
                }
                Err(e) => last_error = Some(e),
            }

            if start.elapsed() >= window {
                break;
            }
            sleep(interval).await;
        }

        if count == 0 {
            return Err(last_error
                .unwrap_or_else(|| HardwareError::sensor_fault("no samples in window")));
        }

        let mean = u32::try_from(sum / count).unwrap_or(u32::MAX);
        debug!(samples = count, mean, "Sampled door distance");
        Ok(Centimeters(mean))
    }

    fn sensor_failed(&mut self, error: HardwareError) -> DoorOutcome {
        warn!(error = %error, "Door sensor unreadable");
        self.state = DoorState::Unknown;
        self.leds.signal(LedEvent::DoorError);
        DoorOutcome::SensorFault
    }
}
