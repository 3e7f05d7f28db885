use std::path::PathBuf;

use thiserror::Error;

/// A recoverable failure scoped to one file or one archive. Every category
/// is reported and recorded in the per-file outcome; none aborts the run.
#[derive(Debug, Clone, Error)]
pub enum FileError {
    #[error("failed to read sidecar {}: {message}", path.display())]
    Sidecar { path: PathBuf, message: String },

    #[error("failed to set file times on {}: {message}", path.display())]
    Timestamp { path: PathBuf, message: String },

    #[error("failed to extract archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("failed to copy {}: {message}", path.display())]
    Copy { path: PathBuf, message: String },
}
