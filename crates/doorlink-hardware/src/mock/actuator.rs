//! Mock lock actuator.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{HardwareError, Result, traits::LockActuator};
use doorlink_core::Degrees;

/// How the mock reacts to a rotation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorBehavior {
    /// Move and confirm.
    #[default]
    Normal,
    /// Stay put and report failure.
    Stalled,
    /// Move but report failure anyway (lost confirmation).
    MovesThenFails,
}

#[derive(Debug)]
struct ActuatorState {
    position: Degrees,
    behavior: ActuatorBehavior,
    rotations: Vec<Degrees>,
}

/// Simulated bolt servo controlled through a [`MockActuatorHandle`].
#[derive(Debug)]
pub struct MockLockActuator {
    state: Arc<Mutex<ActuatorState>>,
}

impl MockLockActuator {
    /// Create an actuator resting at `initial`.
    pub fn new(initial: Degrees) -> (Self, MockActuatorHandle) {
        let state = Arc::new(Mutex::new(ActuatorState {
            position: initial,
            behavior: ActuatorBehavior::Normal,
            rotations: Vec::new(),
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            MockActuatorHandle { state },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActuatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockActuator for MockLockActuator {
    async fn rotate_to(&mut self, angle: Degrees) -> Result<()> {
        let mut state = self.lock();
        state.rotations.push(angle);

        match state.behavior {
            ActuatorBehavior::Normal => {
                state.position = angle;
                Ok(())
            }
            ActuatorBehavior::Stalled => Err(HardwareError::actuator_fault(format!(
                "stalled before reaching {angle}"
            ))),
            ActuatorBehavior::MovesThenFails => {
                state.position = angle;
                Err(HardwareError::actuator_fault("no position confirmation"))
            }
        }
    }

    fn position(&self) -> Degrees {
        self.lock().position
    }
}

/// Handle for controlling a [`MockLockActuator`].
#[derive(Debug, Clone)]
pub struct MockActuatorHandle {
    state: Arc<Mutex<ActuatorState>>,
}

impl MockActuatorHandle {
    pub fn set_behavior(&self, behavior: ActuatorBehavior) {
        self.lock().behavior = behavior;
    }

    /// Move the bolt without going through the controller.
    pub fn set_position(&self, position: Degrees) {
        self.lock().position = position;
    }

    pub fn position(&self) -> Degrees {
        self.lock().position
    }

    /// Every angle requested so far, in order.
    pub fn rotations(&self) -> Vec<Degrees> {
        self.lock().rotations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActuatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
