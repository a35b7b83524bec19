//! Docker Compose services and volumes.
//!
//! The payload maps compose file names to sections, or sections directly
//! when only `docker-compose.yml` is concerned:
//!
//! ```json
//! {
//!     "docker-compose.yml": {
//!         "services": ["database:", "  image: postgres:16"],
//!         "volumes": ["database_data:"]
//!     },
//!     "docker-compose.override.yml": {
//!         "services": ["database:", "  ports:", "    - \"5432\""]
//!     }
//! }
//! ```
//!
//! Files are looked up in `COMPOSE_FILE` first, then in the project root and
//! each of its parents, trying the `.yaml` spelling after `.yml`. Nothing is
//! written unless the project enabled Docker support.

use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{
    ConfiguratorKind, RecipeConfigurator, expect_object, read_target, write_target, yaml,
};
use crate::config::Options;
use crate::constants::{COMPOSE_FILE_ENV, COMPOSE_PATH_SEPARATOR_ENV};
use crate::core::RecipeError;
use crate::models::Recipe;

/// File patched by the short payload form.
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Contents of a compose file created for a recipe.
const NEW_COMPOSE_FILE: &str = "version: '3'\n";

type Sections = Vec<(String, Vec<String>)>;

/// Applies the `docker-compose` manifest key.
pub struct DockerComposeConfigurator {
    options: Options,
}

impl DockerComposeConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Compose file named `file`, if the project has one.
    #[must_use]
    pub fn find_compose_file(&self, file: &str) -> Option<PathBuf> {
        let root = self.options.root_dir();

        if let Some(listed) = self.options.env(COMPOSE_FILE_ENV) {
            let separator = self
                .options
                .env(COMPOSE_PATH_SEPARATOR_ENV)
                .unwrap_or(if cfg!(windows) { ";" } else { ":" });
            let found = listed
                .split(separator)
                .filter(|entry| Path::new(entry).file_name().is_some_and(|name| name == file))
                .map(|entry| root.join(entry))
                .find(|path| path.is_file());
            if found.is_some() {
                return found;
            }
        }

        root.ancestors().find_map(|dir| {
            let candidate = dir.join(file);
            if candidate.is_file() {
                return Some(candidate);
            }
            let alternate = dir.join(alternate_spelling(file)?);
            alternate.is_file().then_some(alternate)
        })
    }

    fn configure_file(&self, recipe: &Recipe, file: &str, sections: &Sections) -> Result<()> {
        let path = match self.find_compose_file(file) {
            Some(path) => path,
            None => {
                tracing::debug!("Creating {} for {}", file, recipe.name);
                self.options.root_dir().join(file)
            }
        };

        let original = read_target(&path)?;
        let contents = original.as_deref().unwrap_or(NEW_COMPOSE_FILE);
        let patched = yaml::add_sections(contents, &recipe.name, sections).map_err(|inline| {
            RecipeError::PatchConflict {
                file: path.display().to_string(),
                reason: inline.to_string(),
            }
        })?;
        if write_target(&path, original.as_deref(), &patched)? {
            tracing::info!("Added Docker Compose definitions of {} to {}", recipe.name, path.display());
        }
        Ok(())
    }

    fn unconfigure_file(&self, recipe: &Recipe, file: &str) -> Result<()> {
        let Some(path) = self.find_compose_file(file) else {
            return Ok(());
        };
        let Some(original) = read_target(&path)? else {
            return Ok(());
        };

        let patched = yaml::remove_sections(&original, &recipe.name);
        if write_target(&path, Some(&original), &patched)? {
            tracing::info!(
                "Removed Docker Compose definitions of {} from {}",
                recipe.name,
                path.display()
            );
        }
        Ok(())
    }
}

impl RecipeConfigurator for DockerComposeConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        if !self.options.docker() {
            tracing::debug!("Docker support is disabled, skipping compose files of {}", recipe.name);
            return Ok(());
        }
        for (file, sections) in files(payload)? {
            self.configure_file(recipe, &file, &sections)?;
        }
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        for (file, _) in files(payload)? {
            self.unconfigure_file(recipe, &file)?;
        }
        Ok(())
    }
}

/// `docker-compose.yaml` for `docker-compose.yml`.
fn alternate_spelling(file: &str) -> Option<String> {
    file.strip_suffix(".yml").map(|stem| format!("{stem}.yaml"))
}

/// Per-file sections of a payload in either form.
fn files(payload: &Value) -> Result<Vec<(String, Sections)>, RecipeError> {
    let map = expect_object(ConfiguratorKind::DockerCompose, payload)?;
    let short_form = map.values().next().is_some_and(Value::is_array);
    if short_form {
        return Ok(vec![(DEFAULT_COMPOSE_FILE.to_string(), sections(payload)?)]);
    }

    map.iter()
        .map(|(file, per_file)| sections(per_file).map(|sections| (file.clone(), sections)))
        .collect()
}

fn sections(payload: &Value) -> Result<Sections, RecipeError> {
    let map = expect_object(ConfiguratorKind::DockerCompose, payload)?;
    let mut sections = Vec::with_capacity(map.len());
    for (key, lines) in map {
        let Some(lines) = lines.as_array() else {
            return Err(RecipeError::ConfigError {
                message: format!("\"docker-compose\" section \"{key}\" must be a list of lines"),
            });
        };
        let lines = lines
            .iter()
            .map(|line| match line {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        sections.push((key.clone(), lines));
    }
    Ok(sections)
}
