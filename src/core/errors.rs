//! Error types for the key/value server
//! Provides structured error handling using thiserror for better error reporting

use thiserror::Error;

/// Main error type for the key/value server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Wire-level errors: malformed RESP frames
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Command-level errors: unknown verbs, bad arity, bad arguments
    #[error("Command error: {message}")]
    Command { message: String },

    /// Snapshot parse errors, fatal at startup
    #[error("Snapshot parse error: {message}")]
    Snapshot { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network/IO related errors
    #[error("Network IO error")]
    NetworkIO(#[from] std::io::Error),

    /// String conversion errors
    #[error("String conversion error")]
    StringConversion(#[from] std::string::FromUtf8Error),
}

/// Result type alias for convenience
pub type ServerResult<T> = std::result::Result<T, ServerError>;

impl ServerError {
    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a command error
    pub fn command<S: Into<String>>(message: S) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Create a snapshot parse error
    pub fn snapshot<S: Into<String>>(message: S) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
