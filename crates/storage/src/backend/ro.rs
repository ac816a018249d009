//! Read-only storage client.
//!
//! This module provides a storage client implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Cursor, Entry, EntryKind, ListingPage, MoveOptions, Thumbnail, ThumbnailRequest, UploadOptions};
use crate::{ClientHandle, StorageClient, validate_path};

/// Read-only storage client.
///
/// Wraps another client and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Writes report metadata for the path that
/// *would* have been written, without autorename applied.
#[derive(Clone)]
pub struct ReadOnlyClient {
    inner: ClientHandle,
}
impl ReadOnlyClient {
    pub fn new(inner: ClientHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageClient for ReadOnlyClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list(&self, folder: &str, limit: u32) -> Result<ListingPage> {
        self.inner.list(folder, limit).await
    }

    async fn list_continue(&self, cursor: &Cursor) -> Result<ListingPage> {
        self.inner.list_continue(cursor).await
    }

    async fn download_thumbnail(&self, path: &str, request: &ThumbnailRequest) -> Result<Thumbnail> {
        self.inner.download_thumbnail(path, request).await
    }

    async fn upload(&self, path: &str, data: &[u8], _options: UploadOptions) -> Result<Entry> {
        let path = validate_path(path)?;
        tracing::info!(path = %path, bytes = data.len(), "Skipping upload during read-only mode");
        Ok(Entry::file(path, data.len() as u64))
    }

    async fn move_entry(&self, from: &str, to: &str, _options: MoveOptions) -> Result<Entry> {
        let to = validate_path(to)?;
        tracing::info!(path = %from, to = %to, "Skipping move during read-only mode");
        Ok(Entry {
            path: to,
            display_path: None,
            kind: EntryKind::File,
            size: None,
            modified: None,
            content_hash: None,
        })
    }
}
