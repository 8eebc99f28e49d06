//! CLI error types.

use thiserror::Error;
use xo_client::{ClientError, ConfigError, NotFoundError};

/// Exit status when the requested object does not exist.
pub const EXIT_NOT_FOUND: u8 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid connection settings.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// No object matched the query.
    #[error("{0}")]
    NotFound(NotFoundError),
    /// Any other client failure.
    #[error(transparent)]
    Client(ClientError),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::NotFound(_) => EXIT_NOT_FOUND,
            _ => 1,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(not_found) => Self::NotFound(not_found),
            ClientError::Config(config) => Self::Config(config),
            other => Self::Client(other),
        }
    }
}
