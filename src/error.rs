use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Archive-level failures. All fatal: the run aborts before any file is
/// touched.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive directory not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("post record file not found: {0}")]
    RecordFileNotFound(PathBuf),

    #[error("malformed post record file {path}: {source}")]
    MalformedArchive {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-item failures. The pipeline logs these and continues with the next
/// item; nothing is retried or rolled back.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("post has no media entries")]
    NoMediaInItem,

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("failed to set timestamps on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metadata write failed for {path}: {cause}")]
    MetadataWriteFailed { path: PathBuf, cause: String },
}
