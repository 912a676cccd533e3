//! Watch-root discovery.
//!
//! Expands the configured roots into the full list of directories to watch,
//! skipping hidden and dependency directories together with their subtrees.

use std::path::{Path, PathBuf};

/// Whether a directory base name is excluded from watching.
#[must_use]
pub fn is_excluded_dir(name: &str, ignored: &[String]) -> bool {
    name.starts_with('.') || ignored.iter().any(|i| i == name)
}

/// Whether any component of `path` below `root` is excluded.
#[must_use]
pub fn is_excluded_path(path: &Path, ignored: &[String]) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name != "." && name != ".." && is_excluded_dir(&name, ignored)
    })
}

/// Collect `root` and every non-excluded directory beneath it.
///
/// # Errors
///
/// Returns an I/O error if `root` itself cannot be read. Unreadable
/// subdirectories are logged and skipped.
pub fn collect_watch_dirs(root: &Path, ignored: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    // Read the root eagerly so a missing root surfaces as an error.
    let entries = std::fs::read_dir(root)?;
    dirs.push(root.to_path_buf());

    let mut pending: Vec<PathBuf> = subdirectories(entries, ignored);
    while let Some(dir) = pending.pop() {
        match std::fs::read_dir(&dir) {
            Ok(entries) => {
                pending.extend(subdirectories(entries, ignored));
                dirs.push(dir);
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
            }
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn subdirectories(entries: std::fs::ReadDir, ignored: &[String]) -> Vec<PathBuf> {
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| !is_excluded_dir(&entry.file_name().to_string_lossy(), ignored))
        .map(|entry| entry.path())
        .collect()
}
