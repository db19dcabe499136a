//! The transport capability.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::request::RequestDescriptor;
use crate::response::Response;

/// Executes one request.
///
/// Every call issues a fresh request; implementations must not replay a
/// cached outcome. The returned future does nothing until polled.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `descriptor`, producing exactly one response or one error.
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Response, TransportError>;
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error: {status}")]
    ServerError { status: u16, body: String },

    #[error("client error: {status}")]
    ClientError { status: u16, body: String },

    #[error("failed to read upload file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a free-form error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Server-provided hint for when to try again.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::ServerError { status, .. } | TransportError::ClientError { status, .. } => {
                Some(*status)
            }
            TransportError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e)
        }
    }
}
