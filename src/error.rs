//! Error Types
//!
//! One enum per concern. `ApiError` is what every collaborator call returns;
//! the others wrap it where a phase or a user action needs its own meaning.

use thiserror::Error;

/// Common result type for collaborator calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a single call to the platform, the storage target or the feed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The credential was rejected
    #[error("session rejected by the server")]
    Unauthorized,
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Text suitable for a status line
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Your session has expired, please log in again".to_string(),
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Status { status, .. } => format!("Server error ({})", status),
            ApiError::Transport(_) => "Network error, please try again".to_string(),
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
        }
    }
}

/// Durable credential storage failure
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems caught locally before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserInputError {
    #[error("Please select a task")]
    NoTaskSelected,
    #[error("Please select a file to upload")]
    NoFileSelected,
    #[error("Task {0} is not in the pending list")]
    UnknownTask(u32),
    #[error("A submission is already in progress")]
    TransactionInFlight,
    #[error("Please log in first")]
    NotSignedIn,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Crate-level error for the command line surface
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Input(#[from] UserInputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transaction(#[from] crate::upload::TransactionError),
    #[error("{0}")]
    Rejected(String),
}
