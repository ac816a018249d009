pub mod error;
mod filter;
mod policy;
pub mod resize;

pub use crate::filter::{IMAGE_EXTENSIONS, is_image, oversized_images};
pub use crate::policy::{DEFAULT_ARCHIVE_FOLDER, DEFAULT_SUFFIX, PathPolicy};
use lowres_storage::ThumbnailRequest;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOLDER: &str = "/photos";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Bytes; only files strictly larger than this are replaced.
pub const DEFAULT_THRESHOLD: u64 = 6_000_000;

/// What to do when a single file cannot be processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failure.
    #[default]
    Abort,
    /// Log the failure and carry on with the next file.
    Skip,
}

/// Everything a resize run needs besides the storage client.
#[derive(Clone, Debug)]
pub struct Context {
    pub folder: String,
    pub page_size: u32,
    pub threshold: u64,
    pub thumbnail: ThumbnailRequest,
    pub policy: PathPolicy,
    pub on_error: ErrorPolicy,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            threshold: DEFAULT_THRESHOLD,
            thumbnail: ThumbnailRequest::default(),
            policy: PathPolicy::default(),
            on_error: ErrorPolicy::default(),
        }
    }
}
