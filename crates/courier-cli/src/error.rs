//! CLI error handling.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use courier_common_config::{ConfigError, EnvError};
use courier_dispatch::DispatchError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}: {}", path.display())]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    #[error("request failed: {0}")]
    Network(#[source] DispatchError),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Numeric exit status for this error.
    pub fn status(&self) -> u8 {
        match self {
            Self::Config { .. } => 2,
            Self::Network(_) => 4,
            Self::Interrupted => 130,
            Self::Io { .. } | Self::Request(_) | Self::Other(_) => 1,
        }
    }

    /// Exit code reported for this error.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error for `path`.
    pub fn io(message: impl Into<String>, source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path: path.into(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config {
            message: format!("configuration error: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

impl From<EnvError> for CliError {
    fn from(e: EnvError) -> Self {
        Self::Config {
            message: format!("environment error: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::MalformedRequest(reason) => Self::Request(reason.to_string()),
            DispatchError::Config(message) => Self::config(message),
            DispatchError::Cancelled => Self::Interrupted,
            DispatchError::Runtime(message) => Self::Other(anyhow::anyhow!(message)),
            other => Self::Network(other),
        }
    }
}
