//! Storage client trait and implementations.
//!
//! This module defines the [`StorageClient`] trait, the narrow capability
//! interface through which everything else talks to the remote storage
//! provider: paginated listing, thumbnail rendering, upload and move.

#[cfg(feature = "dropbox")]
mod dropbox;
#[cfg(feature = "mock")]
mod mock;
mod ro;

#[cfg(feature = "dropbox")]
pub use self::dropbox::DropboxClient;
#[cfg(feature = "mock")]
pub use self::mock::{MockClient, Operation};
pub use self::ro::ReadOnlyClient;
use crate::error::Result;
use crate::models::{Cursor, Entry, ListingPage, MoveOptions, Thumbnail, ThumbnailRequest, UploadOptions};
use async_trait::async_trait;

/// Unified interface for remote storage providers.
///
/// All operations are asynchronous. Paths are `/`-rooted remote paths and
/// should be validated with [`validate_path`](crate::validate_path) by
/// implementations before use.
///
/// # Examples
///
/// Walk a whole folder, one page at a time:
///
/// ```
/// use lowres_storage::{StorageClient, error::Result};
///
/// async fn count_files(client: &dyn StorageClient, folder: &str) -> Result<usize> {
///     let mut page = client.list(folder, 100).await?;
///     let mut total = page.entries.iter().filter(|e| e.is_file()).count();
///     while page.has_more {
///         let Some(cursor) = page.cursor.clone() else { break };
///         page = client.list_continue(&cursor).await?;
///         total += page.entries.iter().filter(|e| e.is_file()).count();
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Name of the configured client (used for logging only).
    fn name(&self) -> &str;

    /// Fetch the first page of a folder listing, at most `limit` entries.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the folder
    /// does not exist.
    async fn list(&self, folder: &str, limit: u32) -> Result<ListingPage>;

    /// Fetch the page following the one that returned `cursor`.
    async fn list_continue(&self, cursor: &Cursor) -> Result<ListingPage>;

    /// Ask the provider to render a thumbnail of the image at `path`.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn download_thumbnail(&self, path: &str, request: &ThumbnailRequest) -> Result<Thumbnail>;

    /// Create a new file at `path` with the given contents, returning the
    /// metadata of the file that was actually written (which may have been
    /// renamed if `options.autorename` was set).
    ///
    /// Returns [`Conflict`](crate::error::ErrorKind::Conflict) if the path is
    /// occupied and autorename was not requested.
    async fn upload(&self, path: &str, data: &[u8], options: UploadOptions) -> Result<Entry>;

    /// Move a file or folder, returning the metadata at its new location.
    ///
    /// # Notes
    /// - Implementations should create parent folders as needed.
    /// - Returns [`NotFound`](crate::error::ErrorKind::NotFound) if `from`
    ///   does not exist, and [`Conflict`](crate::error::ErrorKind::Conflict)
    ///   if `to` is occupied and autorename was not requested.
    async fn move_entry(&self, from: &str, to: &str, options: MoveOptions) -> Result<Entry>;
}
