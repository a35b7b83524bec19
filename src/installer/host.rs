//! What the host package manager knows about the project.
//!
//! `sync-recipes` needs two host files:
//!
//! - the host lock (`composer.lock`), listing every locked package under
//!   `packages` and `packages-dev`;
//! - the installed repository (`vendor/composer/installed.json`), describing
//!   each installed package: version, type, autoload rules, release date,
//!   branch aliases and install path.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::models::{Autoload, OperationKind, PackageRef};

/// Host lock file name, next to the host manifest.
pub const HOST_LOCK_NAME: &str = "composer.lock";

/// Installed repository, relative to the project root.
pub const INSTALLED_REPOSITORY: &str = "vendor/composer/installed.json";

/// Package names of the host lock, `packages` first, then `packages-dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLock {
    /// Locked package names, in file order
    pub packages: Vec<String>,
}

impl HostLock {
    /// Reads `composer.lock` in `root_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(root_dir: &Path) -> Result<Self> {
        let path = root_dir.join(HOST_LOCK_NAME);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::from_json(&value))
    }

    /// Extracts the package names of a parsed host lock.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let packages = ["packages", "packages-dev"]
            .iter()
            .filter_map(|key| value.get(*key).and_then(Value::as_array))
            .flatten()
            .filter_map(|package| package.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        Self {
            packages,
        }
    }
}

/// Packages installed in the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledRepository {
    packages: Vec<PackageRef>,
}

impl InstalledRepository {
    /// Repository holding `packages`.
    #[must_use]
    pub fn new(packages: Vec<PackageRef>) -> Self {
        Self {
            packages,
        }
    }

    /// Reads the installed repository of the project in `root_dir`.
    ///
    /// A project without the file has nothing installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid JSON.
    pub fn load(root_dir: &Path) -> Result<Self> {
        let path = root_dir.join(INSTALLED_REPOSITORY);
        if !path.exists() {
            tracing::debug!("No installed repository at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let vendor_dir = path.parent().and_then(Path::parent).unwrap_or(root_dir);
        Ok(Self::from_json(&value, vendor_dir))
    }

    /// Reads a parsed installed repository.
    ///
    /// Both layouts are accepted: a bare list of packages and an object with
    /// a `packages` list. Install paths are relative to `vendor_dir/composer`;
    /// packages without one live in `vendor_dir/<name>`.
    #[must_use]
    pub fn from_json(value: &Value, vendor_dir: &Path) -> Self {
        let entries = match value {
            Value::Array(entries) => entries.as_slice(),
            _ => value.get("packages").and_then(Value::as_array).map_or(&[][..], Vec::as_slice),
        };
        Self {
            packages: entries.iter().filter_map(|entry| package_from_json(entry, vendor_dir)).collect(),
        }
    }

    /// The installed package named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PackageRef> {
        self.packages.iter().find(|package| package.name == name)
    }

    /// Number of installed packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn package_from_json(entry: &Value, vendor_dir: &Path) -> Option<PackageRef> {
    let name = entry.get("name").and_then(Value::as_str)?;
    let version = entry
        .get("pretty_version")
        .or_else(|| entry.get("version"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut package = PackageRef::new(name, OperationKind::Install, version)
        .with_install_path(install_path(entry, name, vendor_dir))
        .with_autoload(entry.get("autoload").map(Autoload::from_json).unwrap_or_default());

    if let Some(package_type) = entry.get("type").and_then(Value::as_str) {
        package = package.with_package_type(package_type);
    }
    if let Some(date) = entry.get("time").and_then(Value::as_str).and_then(parse_release_date) {
        package = package.with_release_date(date);
    }
    let aliases = entry
        .get("extra")
        .and_then(|extra| extra.get("branch-alias"))
        .and_then(Value::as_object);
    for (branch, alias) in aliases.into_iter().flatten() {
        if let Some(alias) = alias.as_str() {
            package = package.with_branch_alias(branch.clone(), alias);
        }
    }
    Some(package)
}

fn install_path(entry: &Value, name: &str, vendor_dir: &Path) -> PathBuf {
    match entry.get("install-path").and_then(Value::as_str) {
        Some(relative) => vendor_dir.join("composer").join(relative),
        None => vendor_dir.join(name),
    }
}

/// Release dates appear as RFC 3339 or as `YYYY-MM-DD HH:MM:SS` (UTC).
fn parse_release_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|date| date.and_utc())
        })
}
