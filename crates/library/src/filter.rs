//! Selection of oversized images from a listing page.

use lowres_storage::Entry;

/// Extensions (compared case-insensitively) that identify an image.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["gif", "jpg", "jpeg", "tiff", "png"];

/// Whether the final segment of `path` ends in one of [`IMAGE_EXTENSIONS`].
pub fn is_image(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Paths of the image files in `entries` whose size is strictly greater
/// than `threshold`, in listing order.
///
/// Folders, deleted entries and files without a known size never qualify.
pub fn oversized_images(entries: &[Entry], threshold: u64) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.is_file() && is_image(&entry.path))
        .filter(|entry| entry.size.is_some_and(|size| size > threshold))
        .map(|entry| entry.path.clone())
        .collect()
}
