//! Error model used by YouTrack API client operations.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

const MAX_DIAGNOSTIC_BODY_CHARS: usize = 1000;

/// Classified outcome of a failed API call. `Display` renders the internal
/// diagnostic (status, url, truncated body); [`ApiError::user_message`] is the
/// short text meant for direct display.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed base url: {0}")]
    MalformedUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid credentials (http {status}) at {url}: {body}")]
    InvalidCredentials {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("not found (http 404) at {url}: {body}")]
    NotFound { url: String, body: String },
    #[error("server error (http {status}) at {url}: {body}")]
    Server {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("unexpected http {status} at {url}: {body}")]
    UnexpectedStatus {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl ApiError {
    /// Maps a non-success status into its taxonomy entry. `url` must not
    /// carry credentials; the body is truncated for diagnostics.
    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        let url = url.to_string();
        let body = truncate_body(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::InvalidCredentials { status, url, body }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound { url, body },
            status if status.is_server_error() => ApiError::Server { status, url, body },
            status => ApiError::UnexpectedStatus { status, url, body },
        }
    }

    /// Short, actionable message safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::MalformedUrl(_) => "Invalid YouTrack URL.",
            ApiError::Network(_) => "Connection failed. Check your network and YouTrack URL.",
            ApiError::InvalidCredentials { .. } => {
                "Invalid token. Check your YouTrack permanent token."
            }
            ApiError::NotFound { .. } => {
                "YouTrack URL or API path may be wrong. Check the base URL."
            }
            ApiError::Server { .. } => "YouTrack server error. Try again later.",
            ApiError::UnexpectedStatus { .. } => {
                "Connection failed. Check your YouTrack URL and token."
            }
            ApiError::InvalidResponse(_) => "Invalid response from YouTrack. Try again later.",
            ApiError::NotConfigured(_) => "YouTrack is not configured. Complete setup first.",
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::InvalidCredentials { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::UnexpectedStatus { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    /// Transport failures lose their url so query strings never reach logs.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_builder() {
            ApiError::MalformedUrl(err.to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if err.is_timeout() {
            ApiError::Network(format!("request timed out: {err}"))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_DIAGNOSTIC_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_DIAGNOSTIC_BODY_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        let url = "https://h/api/users/me";
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, url, ""),
            ApiError::InvalidCredentials { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, url, ""),
            ApiError::InvalidCredentials { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, url, ""),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, url, ""),
            ApiError::Server { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, url, ""),
            ApiError::UnexpectedStatus { .. }
        ));
    }

    #[test]
    fn diagnostic_keeps_status_but_user_message_does_not() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "https://h/api/users/me", "nope");
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("nope"));
        assert_eq!(err.user_message(), "Invalid token. Check your YouTrack permanent token.");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(5000);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "u", &body);
        match err {
            ApiError::Server { body, .. } => assert_eq!(body.chars().count(), 1001),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
