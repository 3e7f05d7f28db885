use std::path::Path;

use walkdir::WalkDir;

use crate::media::MediaFile;

/// Recursively collect media files under `root` in natural traversal order.
/// The order is whatever the filesystem yields; it is not sorted and not
/// guaranteed stable across filesystems. Unreadable entries are skipped.
pub fn scan_media(root: &Path) -> Vec<MediaFile> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| MediaFile::from_path(entry.path()))
        .collect()
}
