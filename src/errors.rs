use serde::{Deserialize, Serialize};

/// Result alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Data loss: {0}")]
    DataLoss(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// The session service could not be reached. Only produced on the client side.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Error classification exposed to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    Database,
    DataLoss,
    Internal,
    Cancelled,
}

impl SessionError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SessionError::InvalidArgument(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        SessionError::Database(msg.into())
    }

    pub fn data_loss(msg: impl Into<String>) -> Self {
        SessionError::DataLoss(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        SessionError::Internal(msg.into())
    }

    /// Wire classification of this error. Transport failures never leave the
    /// client, so they are reported as `Internal` if they ever get that far.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            SessionError::Database(_) => ErrorCode::Database,
            SessionError::DataLoss(_) => ErrorCode::DataLoss,
            SessionError::Internal(_) | SessionError::Transport(_) => ErrorCode::Internal,
            SessionError::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Message without the classification prefix, as sent over the wire.
    pub fn message(&self) -> String {
        match self {
            SessionError::InvalidArgument(m)
            | SessionError::Database(m)
            | SessionError::DataLoss(m)
            | SessionError::Internal(m) => m.clone(),
            SessionError::Cancelled => "operation cancelled".to_string(),
            SessionError::Transport(e) => e.to_string(),
        }
    }

    /// Rebuilds an error from its wire classification and message.
    pub fn from_code(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::InvalidArgument => SessionError::InvalidArgument(message),
            ErrorCode::Database => SessionError::Database(message),
            ErrorCode::DataLoss => SessionError::DataLoss(message),
            ErrorCode::Internal => SessionError::Internal(message),
            ErrorCode::Cancelled => SessionError::Cancelled,
        }
    }

    /// Whether a crawl worker may retry the whole jar operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Database(_) | SessionError::Cancelled | SessionError::Transport(_)
        )
    }
}

impl From<url::ParseError> for SessionError {
    fn from(err: url::ParseError) -> Self {
        SessionError::InvalidArgument(format!("invalid url: {err}"))
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::Internal(format!("backend task failed: {err}"))
    }
}

#[cfg(feature = "sqlite_store")]
impl From<r2d2::Error> for SessionError {
    fn from(err: r2d2::Error) -> Self {
        SessionError::Database(err.to_string())
    }
}

#[cfg(feature = "sqlite_store")]
impl From<r2d2_sqlite::rusqlite::Error> for SessionError {
    fn from(err: r2d2_sqlite::rusqlite::Error) -> Self {
        SessionError::Database(err.to_string())
    }
}
