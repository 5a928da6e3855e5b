//! Mock distance sensor.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{HardwareError, Result, traits::DistanceSensor};
use doorlink_core::Centimeters;

#[derive(Debug)]
struct SensorState {
    /// `None` simulates a sensor that returns no echo.
    reading: Option<Centimeters>,
    reads: usize,
}

/// Simulated distance sensor controlled through a [`MockSensorHandle`].
#[derive(Debug)]
pub struct MockDistanceSensor {
    state: Arc<Mutex<SensorState>>,
}

impl MockDistanceSensor {
    /// Create a sensor that reports `initial` until told otherwise.
    pub fn new(initial: Centimeters) -> (Self, MockSensorHandle) {
        let state = Arc::new(Mutex::new(SensorState {
            reading: Some(initial),
            reads: 0,
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            MockSensorHandle { state },
        )
    }
}

impl DistanceSensor for MockDistanceSensor {
    async fn read_distance(&mut self) -> Result<Centimeters> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reads += 1;
        state
            .reading
            .ok_or_else(|| HardwareError::sensor_fault("no echo received"))
    }
}

/// Handle for controlling a [`MockDistanceSensor`].
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<SensorState>>,
}

impl MockSensorHandle {
    /// Report `distance` from now on.
    pub fn set_distance(&self, distance: Centimeters) {
        self.lock().reading = Some(distance);
    }

    /// Make every following read fail.
    pub fn set_faulty(&self) {
        self.lock().reading = None;
    }

    /// Number of reads performed so far.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
