use std::path::{Path, PathBuf};

/// Recognized media extensions (image and video containers), lower-case.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "avi", "bmp", "gif", "heic", "jpeg", "jpg", "mov", "mp4", "png", "webp",
];

/// A media file discovered by the scanner. Lives only for one run.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Full path as discovered
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Lower-cased extension
    pub extension: String,
}

impl MediaFile {
    /// Build a MediaFile if the path carries a recognized media extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        if !MEDIA_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }
        let filename = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            filename,
            extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(MediaFile::from_path(Path::new("/a/IMG_001.jpg")).is_some());
        assert!(MediaFile::from_path(Path::new("/a/clip.MOV")).is_some());
        assert!(MediaFile::from_path(Path::new("/a/photo.HeIc")).is_some());
        assert!(MediaFile::from_path(Path::new("/a/anim.webp")).is_some());
        assert!(MediaFile::from_path(Path::new("/a/notes.txt")).is_none());
        assert!(MediaFile::from_path(Path::new("/a/takeout.zip")).is_none());
        assert!(MediaFile::from_path(Path::new("/a/img.jpg.json")).is_none());
        assert!(MediaFile::from_path(Path::new("/a/no_extension")).is_none());
    }

    #[test]
    fn test_filename_kept_extension_lowered() {
        let m = MediaFile::from_path(Path::new("/a/b/IMG_0042.JPEG")).unwrap();
        assert_eq!(m.filename, "IMG_0042.JPEG");
        assert_eq!(m.extension, "jpeg");
        assert_eq!(m.path, Path::new("/a/b/IMG_0042.JPEG"));
    }
}
