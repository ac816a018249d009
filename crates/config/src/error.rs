//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source could not be read or its values could not be deserialized.
    #[display("could not load configuration")]
    Load,
    /// A value was read but is not acceptable; names the offending field.
    #[display("invalid configuration value for {_0}")]
    Invalid(#[error(not(source))] String),
}
