//! Convenience result type alias for NotifyHub.

use crate::error::AppError;

/// A specialized `Result` type for NotifyHub operations.
pub type AppResult<T> = Result<T, AppError>;
