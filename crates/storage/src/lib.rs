pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageClient;
pub use crate::models::{
    Cursor, Entry, EntryKind, ListingPage, MoveOptions, Thumbnail, ThumbnailFormat, ThumbnailMode, ThumbnailRequest,
    ThumbnailSize, UploadOptions,
};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type ClientHandle = Arc<dyn StorageClient + Send + Sync>;
