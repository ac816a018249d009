//! Error types for the [`resize`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A resize error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for resize operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Step of the per-file pipeline that failed.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Stage {
    #[display("thumbnail download")]
    Thumbnail,
    #[display("upload")]
    Upload,
    #[display("move")]
    Move,
}

/// Classifies the origin of a resize failure.
///
/// ### Run-level Errors
/// - [`ErrorKind::Listing`]
/// - [`ErrorKind::Pagination`]
///
/// ### Per-file Errors
/// - [`ErrorKind::File`]
/// - [`ErrorKind::Path`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A listing call against the storage client failed.
    #[display("folder listing failed")]
    Listing,
    /// The provider reported more pages but gave no cursor to fetch them.
    #[display("listing reported more pages without a cursor")]
    Pagination,
    /// A remote call for one candidate failed. `recoverable` is `false` when
    /// no further call against the same client can be expected to succeed.
    #[display("{stage} failed for {path}")]
    File { stage: Stage, path: String, recoverable: bool },
    /// A destination path could not be derived for one candidate.
    #[display("cannot derive destinations for {_0}")]
    Path(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if the run may carry on with the next candidate.
    pub fn is_skippable(&self) -> bool {
        match self {
            Self::File { recoverable, .. } => *recoverable,
            Self::Path(_) => true,
            Self::Listing | Self::Pagination => false,
        }
    }
}
