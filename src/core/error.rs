use std::time::Duration;

use thiserror::Error;

/// Centralized error types for the application
///
/// Every capability (storage, gateway, export) and every handler reports
/// failures through this enum, so the router can decide in one place what is
/// logged, what is shown to the user and what is silently absorbed.
///
/// # Example
///
/// ```no_run
/// use question_bot::core::error::AppError;
///
/// fn describe(err: &AppError) -> &'static str {
///     if err.is_not_found() { "absorbed" } else { "logged" }
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// A user, username or dispatch key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(String),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bounded per-update context expired
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Shutdown was requested
    #[error("Cancelled")]
    Cancelled,

    /// The inbound update feed ended
    #[error("Update source closed")]
    SourceClosed,

    /// A dispatch key was registered twice
    #[error("Duplicate {registry} key: {key}")]
    DuplicateKey { registry: &'static str, key: String },

    /// The question intake queue is saturated
    #[error("Question queue is full")]
    QueueFull,

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A blocking storage task panicked or was aborted
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Generic handler failure that is reported to the user
    #[error("Server error: {0}")]
    Server(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether this is the recoverable "no such entity" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Localized notice the error notifier may show to the user.
    ///
    /// `None` means the failure stays silent: classification misses,
    /// transport errors (we could not deliver the notice anyway) and shutdown.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AppError::Server(_)
            | AppError::Database(_)
            | AppError::DatabasePool(_)
            | AppError::Task(_)
            | AppError::Io(_) => Some("Произошла ошибка на сервере. Попробуйте позже."),
            AppError::Timeout(_) => Some("Операция заняла слишком много времени. Попробуйте позже."),
            AppError::Validation(_) => Some("Некорректный ввод. Проверьте данные и попробуйте снова."),
            _ => None,
        }
    }
}

impl From<refinery::Error> for AppError {
    fn from(err: refinery::Error) -> Self {
        AppError::Migration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_silent() {
        let err = AppError::NotFound("user 42".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), None);
    }

    #[test]
    fn test_server_error_has_notice() {
        let err = AppError::Server("boom".to_string());
        assert!(!err.is_not_found());
        assert!(err.user_message().is_some());
        assert!(AppError::Timeout(Duration::from_secs(1)).user_message().is_some());
    }

    #[test]
    fn test_shutdown_kinds_are_silent() {
        assert_eq!(AppError::Cancelled.user_message(), None);
        assert_eq!(AppError::SourceClosed.user_message(), None);
        assert_eq!(AppError::QueueFull.user_message(), None);
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = AppError::DuplicateKey {
            registry: "command",
            key: "start".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate command key: start");
    }
}
