use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use encoding_rs::SHIFT_JIS;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::FileError;
use crate::ProgressCallback;

/// Archive extensions the extractor recognizes, lower-case.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

/// Result of the extraction stage.
#[derive(Debug, Default)]
pub struct ExtractResult {
    pub archives_found: usize,
    pub archives_extracted: usize,
    /// One entry per archive that failed; those archives are skipped.
    pub errors: Vec<FileError>,
}

/// Decode a raw zip entry name, trying UTF-8 first, then Shift_JIS.
fn decode_zip_name(raw: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(raw) {
        return s.to_string();
    }

    let (decoded, _, had_errors) = SHIFT_JIS.decode(raw);
    if !had_errors {
        return decoded.into_owned();
    }

    String::from_utf8_lossy(raw).into_owned()
}

/// Reject absolute entry names and any that would escape the target directory.
fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return None;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => out.push(c),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Recursively find archives under `archive_dir` and unpack each into `dest`.
/// A failing archive is recorded and skipped; the rest still extract.
/// Re-running against a populated `dest` overwrites what is already there.
pub fn unpack_archives(
    archive_dir: &Path,
    dest: &Path,
    progress: &ProgressCallback,
) -> anyhow::Result<ExtractResult> {
    fs::create_dir_all(dest)?;

    let archives: Vec<PathBuf> = WalkDir::new(archive_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| ARCHIVE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    let total = archives.len() as u64;
    let mut result = ExtractResult {
        archives_found: archives.len(),
        ..Default::default()
    };

    for (i, archive) in archives.iter().enumerate() {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("archive");
        match extract_archive(archive, dest) {
            Ok(entries) => {
                result.archives_extracted += 1;
                progress(
                    "extract",
                    i as u64,
                    total,
                    &format!("✓ {} ({} entries)", name, entries),
                );
            }
            Err(e) => {
                let err = FileError::Archive {
                    path: archive.clone(),
                    message: e.to_string(),
                };
                progress("error", i as u64, total, &err.to_string());
                result.errors.push(err);
            }
        }
    }

    Ok(result)
}

/// Unpack one zip archive into `dest`. Returns the number of files written.
fn extract_archive(archive_path: &Path, dest: &Path) -> anyhow::Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut written = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = decode_zip_name(entry.name_raw());
        let Some(rel) = sanitize_entry_path(&name) else {
            continue;
        };
        let out_path = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}
