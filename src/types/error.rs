//! Error types for Idea Bank
//!
//! One enum covers the whole taxonomy. Handlers catch only the domain kinds
//! (see [`IdeaBankError::is_domain`]); the rest are caller bugs or
//! infrastructure faults and propagate out of the lifecycle.

use hyper::StatusCode;
use rusqlite::ErrorCode;

/// Main error type for Idea Bank operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdeaBankError {
    #[error("{0}")]
    HandlerNotIdle(String),

    #[error("{0}")]
    PrematureResultRetrieval(String),

    #[error("{0}")]
    NoRegisteredProvider(String),

    #[error("{0}")]
    NoSessionToQueryOn(String),

    #[error("{0}")]
    NoQueryToRun(String),

    #[error("{0}")]
    NoResultFound(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    RequestedDataNotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IdeaBankError {
    /// Whether a handler may turn this error into an error response.
    ///
    /// Lifecycle misuse and infrastructure faults are not part of the
    /// recoverable taxonomy.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Self::HandlerNotIdle(_)
                | Self::PrematureResultRetrieval(_)
                | Self::Database(_)
                | Self::Config(_)
        )
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthorized(_) | Self::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            Self::RequestedDataNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for IdeaBankError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for IdeaBankError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<rusqlite::Error> for IdeaBankError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::AlreadyExists(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<r2d2::Error> for IdeaBankError {
    fn from(err: r2d2::Error) -> Self {
        Self::Database(format!("Connection pool error: {}", err))
    }
}

/// Result type alias for Idea Bank operations
pub type Result<T> = std::result::Result<T, IdeaBankError>;
