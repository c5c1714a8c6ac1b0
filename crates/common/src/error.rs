//! Error types for crossfed.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Delivery Errors ===
    /// A single remote delivery failed. Scoped to one target; the caller
    /// records it and continues with the remaining targets.
    #[error("Delivery failed ({status:?}): {message}")]
    Delivery {
        /// HTTP status of the remote response, when one was received.
        status: Option<u16>,
        /// Error detail from the transport or the remote server.
        message: String,
    },

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error was caused by the caller's input rather than by
    /// infrastructure. Client errors are not retried by the queue.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::BadRequest(_) | Self::Validation(_)
        )
    }

    /// Whether re-running the failed operation could plausibly succeed.
    ///
    /// Delivery rejections with a 4xx status are permanent; network-level
    /// failures and 5xx responses are worth retrying.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Delivery { status, .. } => {
                status.is_none_or(|s| s >= 500)
            }
            Self::Database(_)
            | Self::Redis(_)
            | Self::Queue(_)
            | Self::ExternalService(_) => true,
            _ => false,
        }
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
