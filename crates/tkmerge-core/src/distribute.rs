use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FileError;
use crate::media::MediaFile;
use crate::sidecar::{self, SidecarStrategy};
use crate::ProgressCallback;

/// Files per bucket when no other size is configured.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Bucket label for media whose capture year cannot be derived.
pub const UNKNOWN_YEAR: &str = "unknown";

/// How destination subfolders are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPolicy {
    /// Group by capture year, derived in the local time zone; files without
    /// a usable timestamp land in `unknown`. Name collisions get a `_<n>`
    /// suffix before the extension.
    ByYear,
    /// Fixed-size 1-based `batch_<n>` buckets in scan order, independent of
    /// timestamps. Existing destination files are silently overwritten.
    ByBatchSize(usize),
}

impl BucketPolicy {
    /// Bucket label for the file at `position` in scan order.
    pub fn bucket_label(&self, position: usize, timestamp: Option<&str>) -> String {
        match self {
            BucketPolicy::ByYear => timestamp
                .and_then(year_from_epoch)
                .unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            BucketPolicy::ByBatchSize(size) => format!("batch_{}", position / size + 1),
        }
    }

    fn resolves_collisions(&self) -> bool {
        matches!(self, BucketPolicy::ByYear)
    }
}

/// Four-digit calendar year of an epoch-seconds string in the local zone.
fn year_from_epoch(raw: &str) -> Option<String> {
    let epoch = raw.trim().parse::<i64>().ok()?;
    let utc = chrono::DateTime::from_timestamp(epoch, 0)?;
    Some(utc.with_timezone(&chrono::Local).format("%Y").to_string())
}

/// Per-file outcome record. A failed step is recorded here and the run
/// moves on; aggregation is the caller's business.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// Sidecar the strategy located, if any
    pub sidecar: Option<PathBuf>,
    /// Raw epoch-seconds value from the sidecar
    pub timestamp: Option<String>,
    /// Whether atime/mtime were rewritten on the source
    pub timestamp_applied: bool,
    /// Final destination after collision resolution; None if the copy failed
    pub dest: Option<PathBuf>,
    pub errors: Vec<FileError>,
}

/// Set both access and modification time to the epoch second carried by `raw`.
fn apply_capture_time(path: &Path, raw: &str) -> Result<(), FileError> {
    let timestamp_err = |message: String| FileError::Timestamp {
        path: path.to_path_buf(),
        message,
    };
    let epoch = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| timestamp_err(format!("invalid epoch {:?}: {}", raw, e)))?;
    let ft = filetime::FileTime::from_unix_time(epoch, 0);
    filetime::set_file_times(path, ft, ft).map_err(|e| timestamp_err(e.to_string()))
}

/// Copy `src` to `dest` carrying over permissions and the source's current
/// atime/mtime. The source was stamped before this runs, so the copy keeps
/// the corrected capture time rather than the export's original one.
fn copy_with_times(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(src, dest)?;
    let meta = fs::metadata(src)?;
    let atime = filetime::FileTime::from_last_access_time(&meta);
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(dest, atime, mtime)?;
    Ok(())
}

/// Find a free destination for `filename` in `dir` by appending `_<n>`
/// before the extension, incrementing until the path is unused.
fn resolve_collision(dir: &Path, filename: &str) -> PathBuf {
    let base = dir.join(filename);
    if !base.exists() {
        return base;
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let mut counter = 1u32;
    loop {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = dir.join(&new_name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Stamp and copy every scanned file, one at a time in scan order.
pub fn distribute(
    media: &[MediaFile],
    output_root: &Path,
    policy: BucketPolicy,
    strategy: SidecarStrategy,
    progress: &ProgressCallback,
) -> Vec<FileOutcome> {
    let total = media.len() as u64;
    let mut outcomes = Vec::with_capacity(media.len());

    for (position, m) in media.iter().enumerate() {
        let mut outcome = FileOutcome {
            source: m.path.clone(),
            sidecar: None,
            timestamp: None,
            timestamp_applied: false,
            dest: None,
            errors: Vec::new(),
        };

        outcome.sidecar = strategy.locate(m);
        if let Some(sidecar_path) = &outcome.sidecar {
            match sidecar::read_capture_timestamp(sidecar_path) {
                Ok(ts) => outcome.timestamp = ts,
                Err(err) => {
                    progress("error", position as u64, total, &err.to_string());
                    outcome.errors.push(err);
                }
            }
        }

        if let Some(raw) = outcome.timestamp.clone() {
            match apply_capture_time(&m.path, &raw) {
                Ok(()) => outcome.timestamp_applied = true,
                Err(err) => {
                    progress("error", position as u64, total, &err.to_string());
                    outcome.errors.push(err);
                }
            }
        }

        let bucket = policy.bucket_label(position, outcome.timestamp.as_deref());
        let bucket_dir = output_root.join(&bucket);

        let copied = fs::create_dir_all(&bucket_dir).and_then(|()| {
            let dest = if policy.resolves_collisions() {
                resolve_collision(&bucket_dir, &m.filename)
            } else {
                bucket_dir.join(&m.filename)
            };
            copy_with_times(&m.path, &dest).map(|()| dest)
        });
        match copied {
            Ok(dest) => outcome.dest = Some(dest),
            Err(e) => {
                let err = FileError::Copy {
                    path: m.path.clone(),
                    message: e.to_string(),
                };
                progress("error", position as u64, total, &err.to_string());
                outcome.errors.push(err);
            }
        }

        let time_note = if outcome.timestamp_applied {
            "capture time set"
        } else if outcome.timestamp.is_some() {
            "capture time failed"
        } else if outcome.sidecar.is_some() {
            "sidecar without timestamp"
        } else {
            "no sidecar"
        };
        let line = match &outcome.dest {
            Some(dest) => {
                let shown = dest.strip_prefix(output_root).unwrap_or(dest);
                format!("✓ {} -> {} ({})", m.filename, shown.display(), time_note)
            }
            None => format!("✗ {} not copied ({})", m.filename, time_note),
        };
        progress("copy", position as u64, total, &line);

        outcomes.push(outcome);
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const EPOCH: i64 = 1_609_459_200; // 2021-01-01T00:00:00Z

    fn quiet(_: &str, _: u64, _: u64, _: &str) {}

    fn mtime_of(path: &Path) -> i64 {
        let meta = fs::metadata(path).unwrap();
        filetime::FileTime::from_last_modification_time(&meta).unix_seconds()
    }

    #[test]
    fn test_batch_labels() {
        let policy = BucketPolicy::ByBatchSize(5000);
        assert_eq!(policy.bucket_label(0, None), "batch_1");
        assert_eq!(policy.bucket_label(4999, None), "batch_1");
        assert_eq!(policy.bucket_label(5000, None), "batch_2");
        // Timestamp is ignored in batch mode
        assert_eq!(policy.bucket_label(0, Some("1609459200")), "batch_1");
    }

    #[test]
    fn test_year_labels() {
        // Local zone decides whether the 2021-01-01T00:00:00Z boundary lands
        // in 2020 or 2021; derive the expectation the same way.
        let expected = chrono::DateTime::from_timestamp(EPOCH, 0)
            .unwrap()
            .with_timezone(&chrono::Local)
            .format("%Y")
            .to_string();
        assert!(expected == "2020" || expected == "2021");
        assert_eq!(
            BucketPolicy::ByYear.bucket_label(0, Some("1609459200")),
            expected
        );
        assert_eq!(BucketPolicy::ByYear.bucket_label(0, None), UNKNOWN_YEAR);
        assert_eq!(
            BucketPolicy::ByYear.bucket_label(0, Some("not a number")),
            UNKNOWN_YEAR
        );
    }

    #[test]
    fn test_collision_suffixes() {
        let dir = tempdir().unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "photo.jpg"),
            dir.path().join("photo.jpg")
        );

        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "photo.jpg"),
            dir.path().join("photo_1.jpg")
        );

        fs::write(dir.path().join("photo_1.jpg"), b"x").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "photo.jpg"),
            dir.path().join("photo_2.jpg")
        );
    }

    #[test]
    fn test_collision_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("photo"), b"x").unwrap();
        assert_eq!(
            resolve_collision(dir.path(), "photo"),
            dir.path().join("photo_1")
        );
    }

    #[test]
    fn test_apply_capture_time() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();

        apply_capture_time(&file, "1609459200").unwrap();
        assert_eq!(mtime_of(&file), EPOCH);

        let meta = fs::metadata(&file).unwrap();
        let atime = filetime::FileTime::from_last_access_time(&meta).unix_seconds();
        assert_eq!(atime, EPOCH);

        assert!(matches!(
            apply_capture_time(&file, "not-a-number"),
            Err(FileError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_distribute_batch_end_to_end() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();

        fs::write(input.path().join("a.jpg"), b"aaa").unwrap();
        fs::write(
            input.path().join("a.jpg.supplemental-metadata.json"),
            br#"{"photoTakenTime": {"timestamp": "1609459200"}}"#,
        )
        .unwrap();
        fs::write(input.path().join("b.png"), b"bbb").unwrap();
        let b_mtime = mtime_of(&input.path().join("b.png"));

        let media: Vec<MediaFile> = ["a.jpg", "b.png"]
            .iter()
            .map(|n| MediaFile::from_path(&input.path().join(n)).unwrap())
            .collect();

        let outcomes = distribute(
            &media,
            output.path(),
            BucketPolicy::ByBatchSize(5000),
            SidecarStrategy::SuffixConvention,
            &quiet,
        );

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.timestamp_applied).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.dest.is_some()).count(), 2);
        assert!(outcomes.iter().all(|o| o.errors.is_empty()));

        let a_dest = output.path().join("batch_1/a.jpg");
        let b_dest = output.path().join("batch_1/b.png");
        assert_eq!(fs::read(&a_dest).unwrap(), b"aaa");
        assert_eq!(mtime_of(&a_dest), EPOCH);
        // No sidecar: the copy keeps the source's own modification time
        assert_eq!(mtime_of(&b_dest), b_mtime);
    }

    #[test]
    fn test_distribute_year_collisions() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::create_dir_all(input.path().join("one")).unwrap();
        fs::create_dir_all(input.path().join("two")).unwrap();
        fs::write(input.path().join("one/photo.jpg"), b"1").unwrap();
        fs::write(input.path().join("two/photo.jpg"), b"2").unwrap();

        let media: Vec<MediaFile> = ["one/photo.jpg", "two/photo.jpg"]
            .iter()
            .map(|n| MediaFile::from_path(&input.path().join(n)).unwrap())
            .collect();

        let outcomes = distribute(
            &media,
            output.path(),
            BucketPolicy::ByYear,
            SidecarStrategy::PrefixMatch,
            &quiet,
        );

        let dests: Vec<_> = outcomes.iter().map(|o| o.dest.clone().unwrap()).collect();
        assert_eq!(dests[0], output.path().join("unknown/photo.jpg"));
        assert_eq!(dests[1], output.path().join("unknown/photo_1.jpg"));
        assert_eq!(fs::read(&dests[1]).unwrap(), b"2");
    }

    #[test]
    fn test_distribute_batch_overwrites() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("a.jpg"), b"new").unwrap();
        fs::create_dir_all(output.path().join("batch_1")).unwrap();
        fs::write(output.path().join("batch_1/a.jpg"), b"old").unwrap();

        let media = vec![MediaFile::from_path(&input.path().join("a.jpg")).unwrap()];
        let outcomes = distribute(
            &media,
            output.path(),
            BucketPolicy::ByBatchSize(5000),
            SidecarStrategy::SuffixConvention,
            &quiet,
        );

        assert_eq!(
            outcomes[0].dest.as_deref(),
            Some(output.path().join("batch_1/a.jpg").as_path())
        );
        assert_eq!(fs::read(output.path().join("batch_1/a.jpg")).unwrap(), b"new");
    }

    #[test]
    fn test_malformed_sidecar_recorded_not_fatal() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("a.jpg"), b"x").unwrap();
        fs::write(
            input.path().join("a.jpg.supplemental-metadata.json"),
            b"{broken",
        )
        .unwrap();

        let media = vec![MediaFile::from_path(&input.path().join("a.jpg")).unwrap()];
        let outcomes = distribute(
            &media,
            output.path(),
            BucketPolicy::ByBatchSize(5000),
            SidecarStrategy::SuffixConvention,
            &quiet,
        );

        // The sidecar failure is recorded and the file is still copied
        assert!(matches!(
            outcomes[0].errors.as_slice(),
            [FileError::Sidecar { .. }]
        ));
        assert!(outcomes[0].timestamp.is_none());
        assert!(!outcomes[0].timestamp_applied);
        assert!(output.path().join("batch_1/a.jpg").is_file());
    }
}
