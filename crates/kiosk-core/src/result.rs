//! Convenience result type alias for the kiosk.

use crate::error::AppError;

/// A specialized `Result` type for kiosk operations.
pub type AppResult<T> = Result<T, AppError>;
