//! Remote path validation.
//!
//! Remote paths are plain `/`-separated strings rather than [`std::path::Path`]
//! values: they never touch the local filesystem and must not pick up
//! platform separators.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a remote storage path.
///
/// Paths must be rooted at `/`. Empty and `.` segments are dropped, `..`
/// segments are resolved but may never leave the root, and NUL bytes are
/// rejected outright. The root itself normalizes to `""`, which is how the
/// Dropbox API addresses the top-level folder.
///
/// # Examples
///
/// ```
/// use lowres_storage::validate_path;
/// assert_eq!(validate_path("/photos//2024/./a.jpg").unwrap(), "/photos/2024/a.jpg");
/// assert_eq!(validate_path("/photos/").unwrap(), "/photos");
/// assert_eq!(validate_path("/").unwrap(), "");
/// assert!(validate_path("photos/a.jpg").is_err());
/// assert!(validate_path("/../etc/passwd").is_err());
/// ```
pub fn validate(path: impl AsRef<str>) -> Result<String> {
    let raw = path.as_ref();
    if !raw.starts_with('/') || raw.contains('\0') {
        exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    Ok(segments.iter().fold(String::with_capacity(raw.len()), |mut acc, s| {
        acc.push('/');
        acc.push_str(s);
        acc
    }))
}
