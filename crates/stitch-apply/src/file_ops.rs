//! Filesystem primitives for the application engine.
//!
//! Writes go through write-to-temp-then-rename in the target's own
//! directory (same-filesystem rename), so a failed write never leaves a
//! truncated file in the working tree.

use crate::error::ApplyError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write content atomically, creating parent directories as needed.
pub fn atomic_write(target: &Path, content: &[u8]) -> Result<(), ApplyError> {
    let parent = target.parent().ok_or_else(|| ApplyError::Write {
        path: target.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"),
    })?;

    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| ApplyError::Mkdir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| ApplyError::Write {
        path: target.to_path_buf(),
        source: e,
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| ApplyError::Write {
            path: target.to_path_buf(),
            source: e,
        })?;

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ApplyError::Write {
            path: target.to_path_buf(),
            source: e,
        })?;

    temp_file.persist(target).map_err(|e| ApplyError::Write {
        path: target.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Create a new file atomically, failing if it already exists.
pub fn atomic_create(target: &Path, content: &[u8]) -> Result<(), ApplyError> {
    if target.exists() {
        return Err(ApplyError::AlreadyExists(target.to_path_buf()));
    }
    atomic_write(target, content)
}

/// Remove a file, then clean up any directories the removal emptied,
/// stopping at `root`.
pub fn remove_file(target: &Path, root: &Path) -> Result<(), ApplyError> {
    if !target.exists() {
        return Err(ApplyError::NotFound(target.to_path_buf()));
    }
    fs::remove_file(target).map_err(|e| ApplyError::Delete {
        path: target.to_path_buf(),
        source: e,
    })?;
    if let Some(parent) = target.parent() {
        remove_empty_ancestors(parent, root);
    }
    Ok(())
}

/// Rename a file, creating the destination's parent directories first.
pub fn rename_file(from: &Path, to: &Path, root: &Path) -> Result<(), ApplyError> {
    if !from.exists() {
        return Err(ApplyError::NotFound(from.to_path_buf()));
    }
    if to.exists() {
        return Err(ApplyError::AlreadyExists(to.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ApplyError::Mkdir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    fs::rename(from, to).map_err(|e| ApplyError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })?;
    if let Some(parent) = from.parent() {
        remove_empty_ancestors(parent, root);
    }
    Ok(())
}

/// Remove empty ancestor directories up to (but not including) the root.
fn remove_empty_ancestors(dir: &Path, root: &Path) {
    let mut current = dir.to_path_buf();
    while current != root && current.starts_with(root) {
        if current.exists() && is_dir_empty(&current) {
            if fs::remove_dir(&current).is_err() {
                break;
            }
        } else {
            break;
        }
        if !current.pop() {
            break;
        }
    }
}

fn is_dir_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut d| d.next().is_none())
        .unwrap_or(false)
}
