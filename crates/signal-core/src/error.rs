//! Error types for the signal backtesting core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad configuration or argument. Raised eagerly at construction.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A contract violation: opening an open position, closing a flat one,
    /// or reading a signal before its lookback window is satisfied.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState(message.into())
    }

    /// Whether this error is a bad-argument failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// Whether this error is a contract (state) violation.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
