//! The filesystem collaborator: read/write/create/delete/rename over a
//! confined session root, with `NotFound`/`AlreadyExists` as
//! distinguishable conditions the engine turns into per-file outcomes.

use crate::error::ApplyError;
use crate::file_ops;
use std::fs;
use std::path::{Path, PathBuf};
use stitch_common::fs_utils;
use stitch_parse::resolve::SourceReader;

pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`. The root must exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ApplyError> {
        let root = root.into().canonicalize().map_err(ApplyError::Root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a session-relative path, rejecting escapes.
    fn resolve(&self, path: &Path) -> Result<PathBuf, ApplyError> {
        fs_utils::resolve_in_root(&self.root, &path.to_string_lossy())
            .map_err(ApplyError::OutsideRoot)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn read(&self, path: &Path) -> Result<String, ApplyError> {
        let absolute = self.resolve(path)?;
        fs::read_to_string(&absolute).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ApplyError::NotFound(path.to_path_buf())
            } else {
                ApplyError::Read {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })
    }

    pub fn write(&self, path: &Path, content: &str) -> Result<(), ApplyError> {
        let absolute = self.resolve(path)?;
        file_ops::atomic_write(&absolute, content.as_bytes())
    }

    pub fn create(&self, path: &Path, content: &str) -> Result<(), ApplyError> {
        let absolute = self.resolve(path)?;
        if absolute.exists() {
            return Err(ApplyError::AlreadyExists(path.to_path_buf()));
        }
        file_ops::atomic_create(&absolute, content.as_bytes())
    }

    pub fn delete(&self, path: &Path) -> Result<(), ApplyError> {
        let absolute = self.resolve(path)?;
        if !absolute.exists() {
            return Err(ApplyError::NotFound(path.to_path_buf()));
        }
        file_ops::remove_file(&absolute, &self.root)
    }

    pub fn rename(&self, from: &Path, to: &Path) -> Result<(), ApplyError> {
        let from_abs = self.resolve(from)?;
        let to_abs = self.resolve(to)?;
        if !from_abs.exists() {
            return Err(ApplyError::NotFound(from.to_path_buf()));
        }
        if to_abs.exists() {
            return Err(ApplyError::AlreadyExists(to.to_path_buf()));
        }
        file_ops::rename_file(&from_abs, &to_abs, &self.root)
    }
}

/// Hunk resolution reads current file content through the same confined
/// surface the engine writes through.
impl SourceReader for Workspace {
    fn read_lines(&self, path: &Path) -> Option<Vec<String>> {
        self.read(path)
            .ok()
            .map(|content| stitch_common::LineBuffer::from_content(&content).lines().to_vec())
    }
}
