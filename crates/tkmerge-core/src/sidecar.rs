use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::FileError;
use crate::media::MediaFile;

/// Suffix the exporting service appends to a media path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".supplemental-metadata.json";

/// How the sidecar file for a media file is located on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarStrategy {
    /// First directory-listing entry whose name starts with the full media
    /// filename and ends with `.json`. When several candidates share the
    /// prefix (`img.jpg.json` vs `img.jpg.xyz.json`) the listing order
    /// decides; the ambiguity is accepted, not resolved.
    PrefixMatch,
    /// Exact `<media path>.supplemental-metadata.json` next to the file.
    SuffixConvention,
}

impl SidecarStrategy {
    /// Locate the sidecar for `media`, or None if the convention finds nothing.
    pub fn locate(&self, media: &MediaFile) -> Option<PathBuf> {
        match self {
            SidecarStrategy::PrefixMatch => {
                let dir = media.path.parent()?;
                for entry in fs::read_dir(dir).ok()?.flatten() {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if name.starts_with(&media.filename) && name.ends_with(".json") {
                        return Some(entry.path());
                    }
                }
                None
            }
            SidecarStrategy::SuffixConvention => {
                let mut name = media.path.as_os_str().to_os_string();
                name.push(SIDECAR_SUFFIX);
                let path = PathBuf::from(name);
                path.is_file().then_some(path)
            }
        }
    }
}

#[derive(Deserialize)]
struct SidecarDoc {
    #[serde(rename = "photoTakenTime")]
    photo_taken_time: Option<TimeRecord>,
}

#[derive(Deserialize)]
struct TimeRecord {
    timestamp: Option<EpochValue>,
}

/// The export writes the epoch as a string; tolerate a bare number too.
#[derive(Deserialize)]
#[serde(untagged)]
enum EpochValue {
    Text(String),
    Number(i64),
}

/// Read the raw epoch-seconds capture timestamp from a sidecar file.
/// An unreadable or malformed file is an error (recorded, not fatal);
/// a well-formed document without the nested field is simply no timestamp.
pub fn read_capture_timestamp(path: &Path) -> Result<Option<String>, FileError> {
    let sidecar_err = |message: String| FileError::Sidecar {
        path: path.to_path_buf(),
        message,
    };
    let bytes = fs::read(path).map_err(|e| sidecar_err(e.to_string()))?;
    let doc: SidecarDoc =
        serde_json::from_slice(&bytes).map_err(|e| sidecar_err(e.to_string()))?;
    Ok(doc
        .photo_taken_time
        .and_then(|t| t.timestamp)
        .map(|v| match v {
            EpochValue::Text(s) => s,
            EpochValue::Number(n) => n.to_string(),
        }))
}
