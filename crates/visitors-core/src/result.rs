//! Convenience result type alias for visitor pass operations.

use crate::error::AppError;

/// A specialized `Result` type for visitor pass operations.
pub type AppResult<T> = Result<T, AppError>;
