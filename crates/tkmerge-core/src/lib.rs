pub mod distribute;
pub mod error;
pub mod extract;
pub mod media;
pub mod scan;
pub mod sidecar;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;

pub use distribute::{BucketPolicy, FileOutcome, DEFAULT_BATCH_SIZE, UNKNOWN_YEAR};
pub use error::FileError;
pub use sidecar::SidecarStrategy;

/// Type alias for progress callback: (stage, current, total, message).
/// Stages: "extract", "scan", "copy", and "error" for recoverable failures.
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Configuration for one run, fixed at construction.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Directory tree scanned for media files
    pub input_root: PathBuf,
    /// Output root receiving the bucket directories
    pub output_root: PathBuf,
    /// Extract zip archives from this directory into `input_root` first
    pub archive_dir: Option<PathBuf>,
    pub bucket_policy: BucketPolicy,
    pub sidecar_strategy: SidecarStrategy,
}

/// Summary of one run. Counters are derived from the outcome records;
/// per-file detail stays available in `outcomes`.
#[derive(Debug, Default)]
pub struct ProcessResult {
    pub archives_found: u64,
    pub archives_extracted: u64,
    pub media_found: u64,
    pub timestamps_updated: u64,
    pub files_copied: u64,
    pub outcomes: Vec<FileOutcome>,
    /// Archive-level failures, already reported while they happened
    pub warnings: Vec<String>,
}

/// Run the full pipeline: optional archive extraction, scan, then per-file
/// stamp-and-distribute. Per-file failures are recorded in the outcomes and
/// never abort the run; only the startup conditions below are fatal.
pub fn process(
    options: &ProcessOptions,
    progress: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    if let BucketPolicy::ByBatchSize(size) = options.bucket_policy {
        anyhow::ensure!(size > 0, "batch size must be at least 1");
        // Batch runs fail fast on a missing input tree and pre-create the
        // output root; the year variant creates directories lazily.
        anyhow::ensure!(
            options.input_root.is_dir(),
            "input directory does not exist: {}",
            options.input_root.display()
        );
        fs::create_dir_all(&options.output_root).with_context(|| {
            format!(
                "failed to create output directory {}",
                options.output_root.display()
            )
        })?;
    }

    let mut result = ProcessResult::default();

    // Stage 1: Extract archives (optional)
    if let Some(archive_dir) = &options.archive_dir {
        let extracted = extract::unpack_archives(archive_dir, &options.input_root, progress)?;
        result.archives_found = extracted.archives_found as u64;
        result.archives_extracted = extracted.archives_extracted as u64;
        result
            .warnings
            .extend(extracted.errors.iter().map(|e| e.to_string()));
    }

    // Stage 2: Scan for media
    let media = scan::scan_media(&options.input_root);
    result.media_found = media.len() as u64;
    if media.is_empty() {
        return Ok(result);
    }
    progress(
        "scan",
        result.media_found,
        result.media_found,
        "media files found",
    );

    // Stage 3+4: Resolve, stamp and distribute, one file at a time
    let outcomes = distribute::distribute(
        &media,
        &options.output_root,
        options.bucket_policy,
        options.sidecar_strategy,
        progress,
    );
    result.timestamps_updated = outcomes.iter().filter(|o| o.timestamp_applied).count() as u64;
    result.files_copied = outcomes.iter().filter(|o| o.dest.is_some()).count() as u64;
    result.outcomes = outcomes;

    Ok(result)
}
