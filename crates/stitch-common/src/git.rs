//! Minimal git plumbing: just enough to notice when the working tree moved
//! under the session between turns. Anything fancier is out of scope.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Current HEAD commit hash, or `None` when the root is not a git
/// repository (or git is unavailable).
pub fn head_revision(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hash.is_empty() {
        None
    } else {
        Some(hash)
    }
}

/// Files changed since HEAD (staged + unstaged + untracked), relative to
/// the session root.
pub fn changed_files(root: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();

    let output = Command::new("git")
        .args(["diff", "--name-only", "HEAD"])
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run git diff: {e}"))?;
    if output.status.success() {
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let line = line.trim();
            if !line.is_empty() {
                files.push(PathBuf::from(line));
            }
        }
    }

    let output = Command::new("git")
        .args(["ls-files", "--others", "--exclude-standard"])
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run git ls-files: {e}"))?;
    if output.status.success() {
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let line = line.trim();
            if !line.is_empty() {
                let path = PathBuf::from(line);
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}
