//! Path handling for model-supplied file paths.
//!
//! Every path in a parsed edit comes from untrusted model output and must
//! land inside the session root before any filesystem operation runs.

use std::path::{Component, Path, PathBuf};

/// Resolve a model-supplied relative path against the session root,
/// rejecting anything that escapes it.
pub fn resolve_in_root(root: &Path, relative: &str) -> Result<PathBuf, String> {
    if relative.is_empty() {
        return Err("empty file path".to_string());
    }
    let supplied = Path::new(relative);
    if supplied.is_absolute() {
        return Err(format!("absolute path not allowed: {relative}"));
    }
    let normalized = normalize_path(&root.join(supplied));
    if !normalized.starts_with(root) {
        return Err(format!(
            "path '{}' escapes session root '{}'",
            relative,
            root.display()
        ));
    }
    Ok(normalized)
}

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem. Unlike `canonicalize()` the path does not need to exist,
/// which matters for files the current turn is about to create.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir => {}
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path() {
        let root = Path::new("/work");
        let resolved = resolve_in_root(root, "src/main.py").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/src/main.py"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/work");
        assert!(resolve_in_root(root, "../../etc/passwd").is_err());
    }

    #[test]
    fn test_resolve_rejects_absolute() {
        let root = Path::new("/work");
        assert!(resolve_in_root(root, "/etc/passwd").is_err());
    }

    #[test]
    fn test_resolve_allows_internal_dotdot() {
        let root = Path::new("/work");
        let resolved = resolve_in_root(root, "src/../lib/util.py").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/lib/util.py"));
    }

    #[test]
    fn test_resolve_rejects_empty() {
        assert!(resolve_in_root(Path::new("/work"), "").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }
}
