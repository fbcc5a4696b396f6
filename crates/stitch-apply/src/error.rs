use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    // Per-file conditions the engine converts into outcomes
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("file already exists (cannot create): {0}")]
    AlreadyExists(PathBuf),

    #[error("path escapes session root: {0}")]
    OutsideRoot(String),

    #[error("overlapping edits for {path}; refusing to order them")]
    OverlappingEdits { path: PathBuf },

    #[error("invalid line range for {path}: {detail}")]
    BadRange { path: PathBuf, detail: String },

    // Filesystem failures
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    Mkdir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("session root unusable: {0}")]
    Root(std::io::Error),
}
