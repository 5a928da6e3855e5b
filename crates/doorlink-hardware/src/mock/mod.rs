//! Mock door peripherals for testing and development.
//!
//! Each device comes with a handle that lets tests (or the simulated agent
//! in the CLI) change what the device reports while it is owned by a
//! controller.

pub mod actuator;
pub mod leds;
pub mod sensor;

pub use actuator::{ActuatorBehavior, MockActuatorHandle, MockLockActuator};
pub use leds::MockLeds;
pub use sensor::{MockDistanceSensor, MockSensorHandle};
