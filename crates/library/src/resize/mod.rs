//! Oversized image replacement.
//!
//! Walks one remote folder page by page. Every image larger than the
//! configured threshold gets a provider-rendered thumbnail uploaded next to
//! it, and the original is moved into an archive subfolder.
//!
//! The primary entry point is [`resize`], which streams a [`ResizeEvent`] per
//! step. [`Orchestrator`] drives that stream to completion and logs as it
//! goes.

pub mod error;
mod file;
mod pagination;
mod run;
mod stream;

pub use self::file::Outcome;
pub use self::pagination::Pagination;
pub use self::run::Orchestrator;
pub use self::stream::{ResizeEvent, Summary, resize};
