//! The recipe lock: which recipes have been applied to the project.
//!
//! A small JSON fact table next to the host manifest (`recipes.lock` by
//! default, `RECIPES_LOCKFILE` to override) mapping each package whose recipe
//! was applied to the version and recipe reference it was applied for:
//!
//! ```json
//! {
//!     "acme/mailer": {
//!         "version": "2.1",
//!         "ref": "6f2c9b1e0d"
//!     }
//! }
//! ```
//!
//! Presence of an entry is what `sync-recipes` uses to decide whether a
//! package still needs its recipe.

mod io;

use crate::constants::{HOST_MANIFEST_NAME, LOCK_FILE_NAME, LOCKFILE_ENV};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What was applied for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Package version the recipe was applied for
    pub version: String,
    /// Recipe reference, when the server reported one
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl LockEntry {
    /// Creates an entry.
    pub fn new(version: impl Into<String>, git_ref: Option<String>) -> Self {
        Self {
            version: version.into(),
            git_ref,
        }
    }
}

/// In-memory copy of the lock file; nothing is written until [`Lock::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    path: PathBuf,
    entries: BTreeMap<String, LockEntry>,
}

impl Lock {
    /// Empty lock bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Lock file location for a project.
    ///
    /// `RECIPES_LOCKFILE` wins; otherwise the lock sits next to the host
    /// manifest in `root_dir`.
    #[must_use]
    pub fn default_path(root_dir: &Path, env: &dyn Fn(&str) -> Option<String>) -> PathBuf {
        env(LOCKFILE_ENV).map(PathBuf::from).unwrap_or_else(|| {
            root_dir.join(HOST_MANIFEST_NAME).with_file_name(LOCK_FILE_NAME)
        })
    }

    /// File backing this lock.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a recipe was applied for `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.entries.get(name)
    }

    /// Records (or replaces) the entry for `name`.
    pub fn add(&mut self, name: impl Into<String>, entry: LockEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Forgets `name`; returns the removed entry.
    pub fn remove(&mut self, name: &str) -> Option<LockEntry> {
        self.entries.remove(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no recipe is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by package name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LockEntry)> {
        self.entries.iter()
    }
}
