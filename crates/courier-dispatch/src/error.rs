//! Dispatch errors.

use courier_common_http::TransportError;
use thiserror::Error;

/// Why a request could not be turned into a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    /// Target address is empty.
    #[error("empty target address")]
    EmptyUrl,
    /// JSON POST with an empty body string.
    #[error("empty JSON body")]
    EmptyJsonBody,
}

/// Errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was rejected before any transport call.
    #[error("malformed request: {0}")]
    MalformedRequest(Malformed),

    /// Every permitted attempt failed; carries the last transport error.
    #[error("gave up after {attempts} attempt(s): {last}")]
    RetryExhausted {
        /// Transport calls made.
        attempts: u32,
        /// Error of the final call.
        #[source]
        last: TransportError,
    },

    /// The subscription was cancelled. Never delivered to a sink.
    #[error("dispatch cancelled")]
    Cancelled,

    /// No runtime to schedule work on.
    #[error("no async runtime available: {0}")]
    Runtime(String),

    /// Invalid retry policy parameters.
    #[error("invalid retry configuration: {0}")]
    Config(String),
}

impl DispatchError {
    /// The final transport error, for exhausted retries.
    pub fn last_transport_error(&self) -> Option<&TransportError> {
        match self {
            DispatchError::RetryExhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Number of transport calls made before giving up.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            DispatchError::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

impl From<Malformed> for DispatchError {
    fn from(m: Malformed) -> Self {
        DispatchError::MalformedRequest(m)
    }
}

/// Result type alias using [`DispatchError`].
pub type Result<T> = std::result::Result<T, DispatchError>;
