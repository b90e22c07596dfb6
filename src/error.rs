//! Crate-wide error type.
//!
//! Only the fetch and snapshot layers produce errors. Missing data is an
//! empty result, never an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::FetchError;

const UNAVAILABLE_NOTICE: &str =
    "The statistics service is unavailable right now. Please try again shortly.";

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("unknown delivery length: {0:?}")]
    UnknownLength(String),

    #[error("invalid query: {0}")]
    InvalidContext(String),

    #[error("no dataset for mode {0:?}")]
    UnknownMode(String),

    #[error("snapshot {}: {message}", path.display())]
    Snapshot { path: PathBuf, message: String },

    #[error("remote statistics service is not configured (set FIELD_API_URL)")]
    NotConfigured,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl StatsError {
    pub fn snapshot(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Short text for a user-facing notice.
    pub fn notice(&self) -> String {
        match self {
            StatsError::Fetch(e) if e.is_exhausted() => UNAVAILABLE_NOTICE.to_string(),
            other => other.to_string(),
        }
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
