use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by session operations and automation drivers.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("launch failed: {0}")]
    LaunchFailure(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("not ready: {0}")]
    NotReady(String),

    #[error("session not connected: {0}")]
    NotConnected(String),

    #[error("collaborator timed out: {0}")]
    CollaboratorTimeout(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Raw failure reported by an automation driver. Converted into one of
    /// the other variants before it leaves the registry.
    #[error("driver error: {0}")]
    Driver(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LaunchFailure,
    NotFound,
    NotReady,
    NotConnected,
    CollaboratorTimeout,
    UnsupportedPlatform,
    InvalidRequest,
    Driver,
    Io,
    Other,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::LaunchFailure => "launch_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::CollaboratorTimeout => "collaborator_timeout",
            ErrorKind::UnsupportedPlatform => "unsupported_platform",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Driver => "driver",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::LaunchFailure(_) => ErrorKind::LaunchFailure,
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::NotReady(_) => ErrorKind::NotReady,
            BridgeError::NotConnected(_) => ErrorKind::NotConnected,
            BridgeError::CollaboratorTimeout(_) => ErrorKind::CollaboratorTimeout,
            BridgeError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            BridgeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BridgeError::Driver(_) => ErrorKind::Driver,
            BridgeError::Io(_) => ErrorKind::Io,
            BridgeError::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error is a bounded wait that expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::CollaboratorTimeout(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Other(format!("json error: {e}"))
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_strings() {
        assert_eq!(BridgeError::NotFound("x".into()).kind().as_str(), "not_found");
        assert_eq!(
            BridgeError::CollaboratorTimeout("open".into()).kind().as_str(),
            "collaborator_timeout"
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotConnected).unwrap(),
            "\"not_connected\""
        );
        assert_eq!(
            BridgeError::InvalidRequest("limit".into()).kind().as_str(),
            "invalid_request"
        );
    }

    #[test]
    fn timeout_detection() {
        assert!(BridgeError::CollaboratorTimeout("wait".into()).is_timeout());
        assert!(!BridgeError::Driver("boom".into()).is_timeout());
    }
}
