//! Destination paths for the downsized rendition and the archived original.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use lowres_storage::ThumbnailFormat;

pub const DEFAULT_SUFFIX: &str = "_lowres";
pub const DEFAULT_ARCHIVE_FOLDER: &str = "highres";

/// Derives where the downsized file is uploaded and where the original is
/// moved to.
///
/// # Examples
///
/// ```
/// use lowres_library::PathPolicy;
///
/// let policy = PathPolicy::default();
/// assert_eq!(policy.lowres_destination("/a/b/photo.png").unwrap(), "/a/b/photo_lowres.jpg");
/// assert_eq!(policy.archive_destination("/a/b/photo.png").unwrap(), "/a/b/highres/photo.png");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPolicy {
    suffix: String,
    archive_folder: String,
    extension: String,
}

impl PathPolicy {
    /// Policy for renditions encoded as `format`, with the default suffix and
    /// archive folder.
    pub fn new(format: ThumbnailFormat) -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            archive_folder: DEFAULT_ARCHIVE_FOLDER.to_string(),
            extension: format.extension().to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_archive_folder(mut self, folder: impl Into<String>) -> Self {
        self.archive_folder = folder.into();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn archive_folder(&self) -> &str {
        &self.archive_folder
    }

    /// Replace the extension of the final segment (from its last `.`) with
    /// the suffix and the rendition's extension.
    ///
    /// Fails with [`ErrorKind::Path`] if the final segment has no `.` at all.
    pub fn lowres_destination(&self, path: &str) -> Result<String> {
        let name_start = path.rfind('/').map_or(0, |i| i + 1);
        let dot = path[name_start..].rfind('.').ok_or_raise(|| ErrorKind::Path(path.to_string()))?;
        let stem = &path[..name_start + dot];
        Ok(format!("{stem}{}.{}", self.suffix, self.extension))
    }

    /// `<parent>/<archive folder>/<file name>`, where the parent is
    /// everything before the last `/`.
    ///
    /// Fails with [`ErrorKind::Path`] if there is no `/`, or nothing after it.
    pub fn archive_destination(&self, path: &str) -> Result<String> {
        match path.rsplit_once('/') {
            Some((parent, name)) if !name.is_empty() => Ok(format!("{parent}/{}/{name}", self.archive_folder)),
            _ => exn::bail!(ErrorKind::Path(path.to_string())),
        }
    }
}
impl Default for PathPolicy {
    fn default() -> Self {
        Self::new(ThumbnailFormat::Jpeg)
    }
}
