//! Shared helpers for the unit and integration suites.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Endpoint nothing listens on; every request fails fast.
pub const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9";

/// A throwaway project with its own home, cache and config locations.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
    home_dir: PathBuf,
    cache_dir: PathBuf,
}

impl TestProject {
    /// Creates an empty project.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let home_dir = temp_dir.path().join("home");
        let cache_dir = temp_dir.path().join("cache");

        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&home_dir)?;
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
            home_dir,
            cache_dir,
        })
    }

    /// Project root.
    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// Response cache root.
    pub fn cache_path(&self) -> &Path {
        &self.cache_dir
    }

    /// Writes a project file, creating parent directories.
    pub fn write(&self, path: &str, content: &str) -> Result<()> {
        let target = self.project_dir.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content).with_context(|| format!("Failed to write {path}"))
    }

    /// Reads a project file.
    pub fn read(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.project_dir.join(path))
            .with_context(|| format!("Failed to read {path}"))
    }

    /// Whether a project file exists.
    pub fn exists(&self, path: &str) -> bool {
        self.project_dir.join(path).exists()
    }

    /// `rkit` pointed at this project, isolated from the user's settings.
    pub fn rkit(&self) -> Command {
        let mut cmd = Command::cargo_bin("rkit").expect("rkit binary is built");
        cmd.current_dir(&self.project_dir)
            .env("HOME", &self.home_dir)
            .env("RECIPES_CONFIG_PATH", self.home_dir.join("config.toml"))
            .env("RECIPES_CACHE_DIR", &self.cache_dir)
            .env("RECIPES_ENDPOINT", UNREACHABLE_ENDPOINT)
            .env("NO_COLOR", "1")
            .env_remove("RECIPES_LOCKFILE")
            .env_remove("RECIPES_CAFILE")
            .env_remove("RUST_LOG");
        cmd
    }
}
