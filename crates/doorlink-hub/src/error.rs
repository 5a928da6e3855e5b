//! Error types for the hub.

use std::path::PathBuf;

use doorlink_core::ModuleId;
use doorlink_network::TransportError;

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed or holds invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a command was not acknowledged.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Module {0} is not known")]
    UnknownModule(ModuleId),

    #[error("No address recorded for module {0}")]
    NoRoute(ModuleId),

    #[error("No acknowledgement after {attempts} attempts")]
    NoAck { attempts: u32 },

    /// Target or action cannot be put on the wire.
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] doorlink_core::Error),
}

impl DispatchError {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            DispatchError::UnknownModule(_) => "unknown_module",
            DispatchError::NoRoute(_) => "no_route",
            DispatchError::NoAck { .. } => "no_ack",
            DispatchError::InvalidCommand(_) => "invalid_command",
        }
    }
}
