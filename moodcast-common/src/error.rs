//! Common error types for Moodcast

use thiserror::Error;

/// Common result type for Moodcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Moodcast crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broadcaster constructed outside of a Tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
