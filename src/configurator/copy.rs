//! Copying files into the project.
//!
//! Both configurators take a `source → target` map; a source ending with `/`
//! is a directory and everything below it is copied. Targets may use
//! directory placeholders:
//!
//! ```json
//! { "config/": "%CONFIG_DIR%/", "public/index.php": "%PUBLIC_DIR%/index.php" }
//! ```
//!
//! `copy-from-recipe` reads the files shipped inside the recipe,
//! `copy-from-package` reads them from the installed package. Existing files
//! are never overwritten. Uninstalling deletes the copies and the directories
//! left empty by that.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfiguratorKind, RecipeConfigurator, expect_object};
use crate::config::Options;
use crate::core::RecipeError;
use crate::models::Recipe;
use crate::utils::fs::{ensure_dir, list_files, remove_empty_parents, safe_write};

/// `(source, target)` pairs of a copy payload, targets expanded.
fn copy_pairs(
    kind: ConfiguratorKind,
    options: &Options,
    payload: &Value,
) -> Result<Vec<(String, PathBuf)>, RecipeError> {
    expect_object(kind, payload)?
        .iter()
        .map(|(source, target)| -> Result<(String, PathBuf), RecipeError> {
            let target = target.as_str().ok_or_else(|| RecipeError::ConfigError {
                message: format!("\"{kind}\" target of {source} must be a path"),
            })?;
            Ok((source.clone(), options.resolve_path(target)))
        })
        .collect()
}

fn is_dir_source(source: &str) -> bool {
    source.ends_with('/')
}

/// Whether `target` may be written; existing files are kept.
fn should_write(target: &Path) -> bool {
    if target.exists() {
        tracing::debug!("Keeping existing {}", target.display());
        return false;
    }
    true
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Deletes `targets` and prunes the directories they leave empty.
fn remove_copies(targets: &[PathBuf], root: &Path) -> Result<usize> {
    let mut removed = 0;
    for target in targets {
        if !target.is_file() {
            continue;
        }
        fs::remove_file(target)
            .with_context(|| format!("Failed to remove {}", target.display()))?;
        removed += 1;
        if let Some(parent) = target.parent() {
            remove_empty_parents(parent, root)?;
        }
    }
    Ok(removed)
}

/// Applies the `copy-from-recipe` manifest key.
pub struct CopyFromRecipeConfigurator {
    options: Options,
}

impl CopyFromRecipeConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// `(recipe file, target path)` for every file a pair selects.
    fn expand(recipe: &Recipe, source: &str, target: &Path) -> Vec<(String, PathBuf)> {
        if !is_dir_source(source) {
            return vec![(source.to_string(), target.to_path_buf())];
        }
        recipe
            .files
            .keys()
            .filter_map(|file| {
                let relative = file.strip_prefix(source)?;
                Some((file.clone(), target.join(relative)))
            })
            .collect()
    }
}

impl RecipeConfigurator for CopyFromRecipeConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let pairs = copy_pairs(ConfiguratorKind::CopyFromRecipe, &self.options, payload)?;
        for (source, target) in pairs {
            for (file, destination) in Self::expand(recipe, &source, &target) {
                let Some(contents) = recipe.files.get(&file) else {
                    return Err(RecipeError::ConfigError {
                        message: format!("recipe {} does not ship {file}", recipe.name),
                    }
                    .into());
                };
                if !should_write(&destination) {
                    continue;
                }
                safe_write(&destination, &contents.contents)
                    .with_context(|| format!("Failed to copy {file}"))?;
                if contents.executable {
                    make_executable(&destination)?;
                }
                tracing::debug!("Created {}", destination.display());
            }
        }
        tracing::info!("Copied files of {}", recipe.name);
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let pairs = copy_pairs(ConfiguratorKind::CopyFromRecipe, &self.options, payload)?;
        let targets: Vec<PathBuf> = pairs
            .iter()
            .flat_map(|(source, target)| Self::expand(recipe, source, target))
            .map(|(_, destination)| destination)
            .collect();
        let removed = remove_copies(&targets, self.options.root_dir())?;
        if removed > 0 {
            tracing::info!("Removed {} files of {}", removed, recipe.name);
        }
        Ok(())
    }
}

/// Applies the `copy-from-package` manifest key.
pub struct CopyFromPackageConfigurator {
    options: Options,
}

impl CopyFromPackageConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn package_dir(recipe: &Recipe) -> Result<&Path, RecipeError> {
        recipe.package_path.as_deref().ok_or_else(|| RecipeError::ConfigError {
            message: format!("install path of {} is unknown", recipe.name),
        })
    }

    /// `(package file, target path)` for every file a pair selects.
    fn expand(package_dir: &Path, source: &str, target: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        let source_path = package_dir.join(source);
        if !is_dir_source(source) {
            return Ok(vec![(source_path, target.to_path_buf())]);
        }
        if !source_path.is_dir() {
            return Ok(Vec::new());
        }
        Ok(list_files(&source_path)?
            .into_iter()
            .map(|relative| (source_path.join(&relative), target.join(relative)))
            .collect())
    }
}

impl RecipeConfigurator for CopyFromPackageConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let package_dir = Self::package_dir(recipe)?;
        let pairs = copy_pairs(ConfiguratorKind::CopyFromPackage, &self.options, payload)?;
        for (source, target) in pairs {
            for (from, to) in Self::expand(package_dir, &source, &target)? {
                if !from.is_file() {
                    return Err(RecipeError::ConfigError {
                        message: format!("{} does not exist in {}", source, recipe.name),
                    }
                    .into());
                }
                if !should_write(&to) {
                    continue;
                }
                if let Some(parent) = to.parent() {
                    ensure_dir(parent)?;
                }
                fs::copy(&from, &to).with_context(|| {
                    format!("Failed to copy {} to {}", from.display(), to.display())
                })?;
                tracing::debug!("Created {}", to.display());
            }
        }
        tracing::info!("Copied package files of {}", recipe.name);
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let Ok(package_dir) = Self::package_dir(recipe) else {
            tracing::warn!("Cannot remove files of {}: its install path is unknown", recipe.name);
            return Ok(());
        };
        let pairs = copy_pairs(ConfiguratorKind::CopyFromPackage, &self.options, payload)?;
        let mut targets = Vec::new();
        for (source, target) in pairs {
            targets.extend(Self::expand(package_dir, &source, &target)?.into_iter().map(|(_, to)| to));
        }
        let removed = remove_copies(&targets, self.options.root_dir())?;
        if removed > 0 {
            tracing::info!("Removed {} package files of {}", removed, recipe.name);
        }
        Ok(())
    }
}
