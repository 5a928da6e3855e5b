//! Error types for door hardware operations.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to door peripherals.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The distance sensor returned no usable reading.
    #[error("Sensor fault: {message}")]
    SensorFault { message: String },

    /// The lock actuator could not reach the requested position.
    #[error("Actuator fault: {message}")]
    ActuatorFault { message: String },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// LED pattern could not be played.
    #[error("LED error: {message}")]
    LedFault { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn sensor_fault(message: impl Into<String>) -> Self {
        Self::SensorFault {
            message: message.into(),
        }
    }

    pub fn actuator_fault(message: impl Into<String>) -> Self {
        Self::ActuatorFault {
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn led_fault(message: impl Into<String>) -> Self {
        Self::LedFault {
            message: message.into(),
        }
    }
}
