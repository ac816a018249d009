//! Storage models.
//!
//! These types describe listing results and the parameters accepted by the
//! remote operations of a [`StorageClient`](crate::StorageClient).

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// What kind of item a listing entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Folder,
    /// Only returned by listings that include deleted items.
    Deleted,
}

/// One item returned by a folder listing.
///
/// An immutable snapshot; nothing here is kept once the page it came from has
/// been filtered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Lower-cased path, used for matching and as the argument to every
    /// subsequent remote call.
    pub path: String,
    /// Path with its original casing, if the provider supplied one.
    pub display_path: Option<String>,
    pub kind: EntryKind,
    /// Size in bytes. Always `None` for folders.
    pub size: Option<u64>,
    /// Last server-side modification.
    pub modified: Option<OffsetDateTime>,
    /// Provider-specific content hash.
    pub content_hash: Option<String>,
}
impl Entry {
    /// Create a file entry from a listing operation.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            display_path: None,
            kind: EntryKind::File,
            size: Some(size),
            modified: None,
            content_hash: None,
        }
    }

    /// Create a folder entry from a listing operation.
    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_path: None,
            kind: EntryKind::Folder,
            size: None,
            modified: None,
            content_hash: None,
        }
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Opaque continuation token for a paginated listing.
///
/// Owned by the provider; callers only ever hand it back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor(String);
impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of one listing call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<Entry>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
}

/// A rendered thumbnail and, when the provider returns it, the metadata of
/// the file it was rendered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub metadata: Option<Entry>,
}

/// Options for [`upload`](crate::StorageClient::upload).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Pick a free name instead of failing when the destination exists.
    pub autorename: bool,
    /// Suppress the provider's "file added" notifications.
    pub mute: bool,
}

/// Options for [`move_entry`](crate::StorageClient::move_entry).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// Pick a free name instead of failing when the destination exists.
    pub autorename: bool,
}

/// Encoding requested for a thumbnail rendition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThumbnailFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}
impl ThumbnailFormat {
    /// Name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Conventional file extension (without the dot) for files in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}
impl FromStr for ThumbnailFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            _ => exn::bail!(ErrorKind::Unsupported(s.to_string())),
        }
    }
}

/// Bounding box requested for a thumbnail rendition.
///
/// Only the boxes the provider can render are representable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThumbnailSize {
    W32H32,
    W64H64,
    W128H128,
    W256H256,
    W480H320,
    W640H480,
    W960H640,
    W1024H768,
    #[default]
    W2048H1536,
}
impl ThumbnailSize {
    const ALL: [Self; 9] = [
        Self::W32H32,
        Self::W64H64,
        Self::W128H128,
        Self::W256H256,
        Self::W480H320,
        Self::W640H480,
        Self::W960H640,
        Self::W1024H768,
        Self::W2048H1536,
    ];

    /// Width and height of the bounding box, in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::W32H32 => (32, 32),
            Self::W64H64 => (64, 64),
            Self::W128H128 => (128, 128),
            Self::W256H256 => (256, 256),
            Self::W480H320 => (480, 320),
            Self::W640H480 => (640, 480),
            Self::W960H640 => (960, 640),
            Self::W1024H768 => (1024, 768),
            Self::W2048H1536 => (2048, 1536),
        }
    }

    /// Name used on the wire, e.g. `w2048h1536`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::W32H32 => "w32h32",
            Self::W64H64 => "w64h64",
            Self::W128H128 => "w128h128",
            Self::W256H256 => "w256h256",
            Self::W480H320 => "w480h320",
            Self::W640H480 => "w640h480",
            Self::W960H640 => "w960h640",
            Self::W1024H768 => "w1024h768",
            Self::W2048H1536 => "w2048h1536",
        }
    }
}
impl FromStr for ThumbnailSize {
    type Err = Error;
    /// Accepts the wire name (`w2048h1536`) as well as `2048x1536` and
    /// `2048×1536`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let dimensions = match normalized.strip_prefix('w').and_then(|rest| rest.split_once('h')) {
            Some(pair) => Some(pair),
            None => normalized.split_once('x').or_else(|| normalized.split_once('×')),
        };
        let parsed = dimensions.and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)));
        match parsed.and_then(|dims| Self::ALL.into_iter().find(|size| size.dimensions() == dims)) {
            Some(size) => Ok(size),
            None => exn::bail!(ErrorKind::Unsupported(s.to_string())),
        }
    }
}

/// How the requested bounding box is fit against the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThumbnailMode {
    /// Scale down to fit inside the box.
    Strict,
    /// Scale down to fill the box, cropping the overflow.
    Bestfit,
    /// Like `Bestfit`, but only fills one side of the box so nothing is
    /// cropped and nothing is upscaled beyond the source.
    #[default]
    FitoneBestfit,
}
impl ThumbnailMode {
    /// Name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Bestfit => "bestfit",
            Self::FitoneBestfit => "fitone_bestfit",
        }
    }
}
impl FromStr for ThumbnailMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(',', "").replace(['-', ' '], "_").as_str() {
            "strict" => Ok(Self::Strict),
            "bestfit" | "best_fit" => Ok(Self::Bestfit),
            "fitone_bestfit" | "fit_one_best_fit" | "fitone_best_fit" => Ok(Self::FitoneBestfit),
            _ => exn::bail!(ErrorKind::Unsupported(s.to_string())),
        }
    }
}

macro_rules! wire_string {
    ($($ty:ty),+) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
        impl TryFrom<String> for $ty {
            type Error = ErrorKind;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse().map_err(|e: Error| (*e).clone())
            }
        }
        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    )+};
}
wire_string!(ThumbnailFormat, ThumbnailSize, ThumbnailMode);

/// Everything needed to request one thumbnail rendition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub format: ThumbnailFormat,
    pub size: ThumbnailSize,
    pub mode: ThumbnailMode,
}
