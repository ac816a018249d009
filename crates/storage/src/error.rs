//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, expired or rejected access token.
    #[display("authentication failed: {_0}")]
    Auth(#[error(not(source))] String),
    /// Connection, timeout, throttling or server-side failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Destination already occupied and autorename was not permitted (or failed).
    #[display("conflict at path: {_0}")]
    Conflict(#[error(not(source))] String),
    /// File or folder does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Path is not rooted, contains invalid characters or escapes root
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// The provider answered with something we could not make sense of.
    #[display("malformed response: {_0}")]
    Malformed(#[error(not(source))] String),
    /// Option value the provider does not support.
    #[display("unsupported option: {_0}")]
    Unsupported(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::BackendError(_))
    }

    /// Returns `true` if no further call against the same client can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
