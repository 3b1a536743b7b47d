use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse classification the sync engine uses to decide whether to retry.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    ServerError,
    NetworkError,
    Unknown,
}

impl FetchErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => FetchErrorKind::NotFound,
            500..=599 => FetchErrorKind::ServerError,
            _ => FetchErrorKind::Unknown,
        }
    }

    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FetchErrorKind::ServerError | FetchErrorKind::NetworkError
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FetchErrorKind::NotFound => "not_found",
            FetchErrorKind::ServerError => "server_error",
            FetchErrorKind::NetworkError => "network_error",
            FetchErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors are `Clone` so a single in-flight request can hand the same
/// failure to every caller that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("execution state request returned HTTP {status}: {body}")]
    Status {
        status: u16,
        kind: FetchErrorKind,
        body: String,
    },
    #[error("execution state request failed: {message}")]
    Transport { message: String },
    #[error("execution state request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("failed to decode execution state: {message}")]
    Decode { message: String },
    #[error("invalid backend url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            kind: FetchErrorKind::from_status(status),
            body: body.into(),
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Status { kind, .. } => *kind,
            // Non-JSON bodies are treated like a dropped connection.
            FetchError::Transport { .. } | FetchError::Timeout { .. } | FetchError::Decode { .. } => {
                FetchErrorKind::NetworkError
            }
            FetchError::InvalidUrl { .. } => FetchErrorKind::Unknown,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(FetchErrorKind::from_status(404), FetchErrorKind::NotFound);
        assert_eq!(FetchErrorKind::from_status(500), FetchErrorKind::ServerError);
        assert_eq!(FetchErrorKind::from_status(503), FetchErrorKind::ServerError);
        assert_eq!(FetchErrorKind::from_status(400), FetchErrorKind::Unknown);
        assert_eq!(FetchErrorKind::from_status(401), FetchErrorKind::Unknown);
    }

    #[test]
    fn only_server_and_network_errors_retry() {
        assert!(FetchError::status(502, "bad gateway").is_retryable());
        assert!(FetchError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(
            FetchError::Decode {
                message: "expected value".to_string()
            }
            .is_retryable()
        );
        assert!(!FetchError::status(404, "").is_retryable());
        assert!(!FetchError::status(409, "").is_retryable());
        assert!(
            !FetchError::InvalidUrl {
                url: "::".to_string(),
                message: "relative URL without a base".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn http_status_is_only_present_for_status_errors() {
        assert_eq!(FetchError::status(503, "").http_status(), Some(503));
        assert_eq!(FetchError::Timeout { timeout_ms: 1 }.http_status(), None);
    }
}
