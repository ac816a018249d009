//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A resize run failed; the error tree holds the [`resize`](crate::resize)
    /// error that caused it.
    #[display("resize run failed")]
    Resize,
    /// A destination path could not be derived from the original.
    #[display("cannot derive destination for {_0}")]
    Path(#[error(not(source))] String),
}
