//! Inverse serializers for the line-number-explicit formats.
//!
//! Given an edit list, produce wire text that parses back to the same
//! list. Only the block and line-replacement formats round-trip without
//! file content (the unified-diff format needs real context lines, which
//! an edit list does not carry).

use crate::edit::Edit;
use serde_json::json;

/// Serialize edits to block-marker format text.
pub fn to_block_text(edits: &[Edit]) -> String {
    let mut out = String::new();
    for edit in edits {
        match edit {
            Edit::Replacement {
                path,
                interval,
                lines,
            } => {
                let header = if interval.is_empty() {
                    json!({
                        "file": path.to_string_lossy(),
                        "action": "insert",
                        "insert-after-line": interval.start() - 1,
                        "insert-before-line": interval.start(),
                    })
                } else if lines.is_empty() {
                    json!({
                        "file": path.to_string_lossy(),
                        "action": "delete",
                        "start-line": interval.start(),
                        "end-line": interval.end() - 1,
                    })
                } else {
                    json!({
                        "file": path.to_string_lossy(),
                        "action": "replace",
                        "start-line": interval.start(),
                        "end-line": interval.end() - 1,
                    })
                };
                out.push_str("@@start\n");
                out.push_str(&header.to_string());
                out.push('\n');
                if lines.is_empty() {
                    out.push_str("@@end\n");
                } else {
                    out.push_str("@@code\n");
                    for line in lines {
                        out.push_str(line);
                        out.push('\n');
                    }
                    out.push_str("@@end\n");
                }
            }
            Edit::Creation { path, content } => {
                let header = json!({
                    "file": path.to_string_lossy(),
                    "action": "create-file",
                });
                out.push_str("@@start\n");
                out.push_str(&header.to_string());
                out.push('\n');
                match content {
                    Some(content) if !content.is_empty() => {
                        out.push_str("@@code\n");
                        for line in content.lines() {
                            out.push_str(line);
                            out.push('\n');
                        }
                        out.push_str("@@end\n");
                    }
                    _ => out.push_str("@@end\n"),
                }
            }
            Edit::Deletion { path } => {
                let header = json!({
                    "file": path.to_string_lossy(),
                    "action": "delete-file",
                });
                out.push_str("@@start\n");
                out.push_str(&header.to_string());
                out.push('\n');
                out.push_str("@@end\n");
            }
            Edit::Rename { path, new_path } => {
                let header = json!({
                    "file": path.to_string_lossy(),
                    "action": "rename-file",
                    "name": new_path.to_string_lossy(),
                });
                out.push_str("@@start\n");
                out.push_str(&header.to_string());
                out.push('\n');
                out.push_str("@@end\n");
            }
        }
    }
    out
}

/// Serialize edits to line-replacement format text. Creation content is
/// not expressible in this format; seeded creations serialize as a bare
/// create directive.
pub fn to_linespec_text(edits: &[Edit]) -> String {
    let mut out = String::new();
    for edit in edits {
        match edit {
            Edit::Replacement {
                path,
                interval,
                lines,
            } => {
                if interval.is_empty() {
                    out.push_str(&format!(
                        "@ {} insert_line={}\n",
                        path.display(),
                        interval.start()
                    ));
                } else {
                    out.push_str(&format!(
                        "@ {} starting_line={} ending_line={}\n",
                        path.display(),
                        interval.start(),
                        interval.end()
                    ));
                }
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("@\n");
            }
            Edit::Creation { path, .. } => {
                out.push_str(&format!("@ {} +\n", path.display()));
            }
            Edit::Deletion { path } => {
                out.push_str(&format!("@ {} -\n", path.display()));
            }
            Edit::Rename { path, new_path } => {
                out.push_str(&format!("@ {} {}\n", path.display(), new_path.display()));
            }
        }
    }
    out
}
