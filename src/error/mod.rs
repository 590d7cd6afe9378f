use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Durable store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chat, points, or catalog call failure.
    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError),

    /// Input rejected before any call was made.
    #[error("Validation failed: {field} - {reason}")]
    Validation {
        /// Offending input.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Anything else, e.g. terminal I/O.
    #[error("Internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not open the database.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Error description.
        message: String,
    },

    /// A read or write failed.
    #[error("Query failed: {message}")]
    Query {
        /// Error description.
        message: String,
    },

    /// Schema migration failed.
    #[error("Migration failed: {message}")]
    Migration {
        /// Error description.
        message: String,
    },

    /// Raw sqlx error.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Failure taxonomy for calls to the chat, points, and catalog services.
///
/// Every transport or HTTP failure is normalized into exactly one of these
/// variants; nothing is retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection could not be established.
    #[error("Network unreachable: {message}")]
    NetworkUnreachable {
        /// Transport error text.
        message: String,
    },

    /// The service answered 5xx.
    #[error("Server error: {status} - {}", .message.as_deref().unwrap_or("no details"))]
    Server {
        /// HTTP status (5xx).
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The service rejected the request (4xx).
    #[error("Validation error: {status} - {}", .message.as_deref().unwrap_or("no details"))]
    Validation {
        /// HTTP status (4xx).
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// No answer within the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Unexpected status or undecodable body.
    #[error("Unknown error: {message}")]
    Unknown {
        /// Error description.
        message: String,
    },
}

/// Coarse kind of a [`RemoteError`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// See [`RemoteError::NetworkUnreachable`].
    NetworkUnreachable,
    /// See [`RemoteError::Server`].
    Server,
    /// See [`RemoteError::Validation`].
    Validation,
    /// See [`RemoteError::Timeout`].
    Timeout,
    /// See [`RemoteError::Unknown`].
    Unknown,
}

/// Shown when the service cannot be reached.
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";
/// Shown for a 5xx without a message.
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
/// Shown for a 4xx without a message.
pub const VALIDATION_MESSAGE: &str = "Invalid request. Please check your input.";
/// Shown when a call times out.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
/// Shown for anything else.
pub const DEFAULT_MESSAGE: &str = "An error occurred. Please try again.";

impl RemoteError {
    /// Classify a non-success HTTP status with its (already extracted) body message.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400..=499 => RemoteError::Validation { status, message },
            500..=599 => RemoteError::Server { status, message },
            _ => RemoteError::Unknown {
                message: format!(
                    "unexpected status {}{}",
                    status,
                    message.map(|m| format!(": {}", m)).unwrap_or_default()
                ),
            },
        }
    }

    /// Classify a transport-level failure.
    pub fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout { timeout_ms }
        } else if err.is_connect() {
            RemoteError::NetworkUnreachable {
                message: err.to_string(),
            }
        } else {
            RemoteError::Unknown {
                message: err.to_string(),
            }
        }
    }

    /// Payload-free kind of this error.
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::NetworkUnreachable { .. } => RemoteErrorKind::NetworkUnreachable,
            RemoteError::Server { .. } => RemoteErrorKind::Server,
            RemoteError::Validation { .. } => RemoteErrorKind::Validation,
            RemoteError::Timeout { .. } => RemoteErrorKind::Timeout,
            RemoteError::Unknown { .. } => RemoteErrorKind::Unknown,
        }
    }

    /// Text suitable for showing to the person at the keyboard.
    ///
    /// Prefers the message the server sent back; falls back to a fixed
    /// sentence per kind.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::NetworkUnreachable { .. } => NETWORK_MESSAGE.to_string(),
            RemoteError::Server { message, .. } => message
                .clone()
                .unwrap_or_else(|| SERVER_MESSAGE.to_string()),
            RemoteError::Validation { message, .. } => message
                .clone()
                .unwrap_or_else(|| VALIDATION_MESSAGE.to_string()),
            RemoteError::Timeout { .. } => TIMEOUT_MESSAGE.to_string(),
            RemoteError::Unknown { .. } => DEFAULT_MESSAGE.to_string(),
        }
    }
}

impl AppError {
    /// Displayable text for any application error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote(e) => e.user_message(),
            AppError::Validation { reason, .. } => reason.clone(),
            _ => DEFAULT_MESSAGE.to_string(),
        }
    }

    pub(crate) fn validation(field: &str, reason: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for remote service calls
pub type RemoteResult<T> = Result<T, RemoteError>;
