//! Error model for the local sync engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use youtrack_api::ApiError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures surfaced by configuration, credential, cache and sync operations.
/// `Display` is the log diagnostic; [`AppError::user_message`] is what the
/// presentation layer shows.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration incomplete: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("token must not be empty")]
    EmptyToken,
    #[error("failed to write credential: {0}")]
    CredentialWrite(String),
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not determine the application data directory")]
    NoDataDir,
    #[error("operation cancelled by shutdown")]
    Cancelled,
    #[error("background task failed: {0}")]
    Task(String),
}

impl AppError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        AppError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::NotConfigured(_) => "YouTrack is not configured. Complete setup first.",
            AppError::Api(err) => err.user_message(),
            AppError::EmptyToken => "Access token must not be empty.",
            AppError::CredentialWrite(_) => {
                "Could not save the token to the system keychain. Check that a keychain is available."
            }
            AppError::Io { .. } | AppError::Serialization(_) => {
                "Could not save local data. Check disk space and permissions."
            }
            AppError::NoDataDir => "Could not locate the application data directory.",
            AppError::Cancelled => "Sync was cancelled.",
            AppError::Task(_) => "Unexpected internal error. Try again.",
        }
    }
}
