use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Invalid module id: {0}")]
    InvalidModuleId(String),

    #[error("Line too long: {size} bytes exceeds maximum of {max_size} bytes")]
    LineTooLong { size: usize, max_size: usize },

    #[error("Datagram is not valid UTF-8")]
    InvalidUtf8,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

impl Error {
    /// Create a new invalid message format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidMessageFormat {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
