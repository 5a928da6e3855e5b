//! Error types for the door agent.

use std::path::PathBuf;

use doorlink_hardware::HardwareError;
use doorlink_network::TransportError;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed or holds invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
