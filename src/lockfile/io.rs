//! Loading and saving the recipe lock.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::RecipeError;
use crate::utils::fs::atomic_write;

use super::{Lock, LockEntry};

impl Lock {
    /// Loads the lock at `path`.
    ///
    /// A missing or empty file is an empty lock.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::LockParseError`] when the file is not a JSON
    /// object of `{version, ref}` entries.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Cannot read lock file: {}\n\n\
                    Possible causes:\n\
                    - Permission denied (check file ownership)\n\
                    - The path is a directory",
                path.display()
            )
        })?;

        if content.trim().is_empty() {
            return Ok(Self::new(path));
        }

        let entries: BTreeMap<String, LockEntry> = serde_json::from_str(&content)
            .map_err(|e| RecipeError::LockParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Loaded {} lock entries from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Writes the lock atomically as pretty-printed JSON with sorted keys.
    pub fn save(&self) -> Result<()> {
        let mut content =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize lock")?;
        content.push('\n');

        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Cannot write lock file: {}", self.path.display()))?;
        tracing::debug!("Wrote {} lock entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}
