//! Session error types

use thiserror::Error;

/// Client-side validation failure, raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The server rejected an authentication-related request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Account locked: {0}")]
    AccountLocked(String),

    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
}

impl AuthError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => AuthError::InvalidCredentials(message),
            423 => AuthError::AccountLocked(message),
            500..=599 => AuthError::Server { status, message },
            _ => AuthError::Rejected { status, message },
        }
    }
}

/// Terminal failure of the refresh cycle. Forces the session to `Unauthenticated`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh token rejected: {0}")]
    Rejected(String),

    #[error("Token refresh failed: {0}")]
    Transport(String),

    #[error("Token refresh superseded by logout")]
    Superseded,

    #[error("Token refresh was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Refresh(#[from] RefreshFailure),

    #[error("Request unauthorized after token refresh")]
    Unauthorized,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Request failed (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Result discarded: session changed while the request was in flight")]
    Superseded,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for SessionError {
    fn from(err: reqwest_middleware::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
