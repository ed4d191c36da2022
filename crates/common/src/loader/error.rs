use std::time::Duration;

use crate::gateway::MediaKind;

/// Transport-level failure while talking to a gateway or origin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("failed to read local file: {0}")]
    Io(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Why a single load attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed {kind} content: {reason}")]
    Malformed { kind: MediaKind, reason: String },
}

impl LoadError {
    pub fn malformed(kind: MediaKind, reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}
