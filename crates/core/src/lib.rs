//! Shared primitives for all Rust crates in netroles.

#![forbid(unsafe_code)]

/// Identifier newtypes shared across the platform boundary.
pub mod ids;

pub use ids::{AssignmentId, NetworkId, SiteId, UserId};

use thiserror::Error;

/// Result type used across netroles crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage engine rejected or failed an operation.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
