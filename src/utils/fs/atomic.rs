//! Atomic file write operations using temp-and-rename strategy.
//!
//! Patched project files (`.env`, compose files, the recipe lock) are always
//! rewritten through these helpers so an interrupted run never leaves a
//! half-written file behind.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Safely writes a string to a file using atomic operations.
///
/// Convenience wrapper around [`atomic_write`].
///
/// # Examples
///
/// ```rust,no_run
/// use recipe_kit::utils::fs::safe_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// safe_write(Path::new(".env"), "APP_ENV=dev\n")?;
/// # Ok(())
/// # }
/// ```
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a sibling temporary file
/// 2. Syncs it to disk
/// 3. Renames it over the target path
///
/// Parent directories are created when missing. Unix permissions of an
/// existing target are carried over to the new file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    #[cfg(unix)]
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(&temp_path, metadata.permissions()).with_context(|| {
            format!("Failed to copy permissions onto: {}", temp_path.display())
        })?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
