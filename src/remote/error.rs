//! Remote Errors
//!
//! Transient failures the client retries and the fatal outcomes it returns.

use std::fmt;

use thiserror::Error;

/// A failure worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientFailure {
    Connect(String),
    Timeout,
    Status(u16),
}

impl fmt::Display for TransientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientFailure::Connect(msg) => write!(f, "connection failed: {msg}"),
            TransientFailure::Timeout => f.write_str("request timed out"),
            TransientFailure::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

/// Fatal outcome of a remote call. Nothing here is retried further.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint}: gave up after {attempts} attempts, last failure: {last}")]
    Exhausted {
        endpoint: String,
        attempts: u32,
        last: TransientFailure,
    },

    #[error("{endpoint}: HTTP {status}: {detail}")]
    Status {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("{endpoint}: request failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint}: unexpected response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl FetchError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Exhausted { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Exhausted {
                last: TransientFailure::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}
