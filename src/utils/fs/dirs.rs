//! Directory operations used by the copy configurators.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// Fails when the path exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Lists every regular file below `root` as paths relative to `root`, sorted.
///
/// Symbolic links are not followed.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", root.display()))?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .with_context(|| format!("Unexpected path: {}", entry.path().display()))?;
            files.push(relative.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Removes `dir` and its ancestors while they are empty, stopping at `stop_at`.
///
/// `stop_at` itself is never removed. Missing directories are skipped.
pub fn remove_empty_parents(dir: &Path, stop_at: &Path) -> Result<()> {
    let mut current = Some(dir);
    while let Some(path) = current {
        if path == stop_at || !path.starts_with(stop_at) {
            break;
        }
        if path.is_dir() {
            let is_empty = fs::read_dir(path)
                .with_context(|| format!("Failed to read directory: {}", path.display()))?
                .next()
                .is_none();
            if !is_empty {
                break;
            }
            fs::remove_dir(path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
        }
        current = path.parent();
    }
    Ok(())
}
