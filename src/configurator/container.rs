//! Container parameters in `config/services.yaml`.
//!
//! ```json
//! { "locale": "en", "mailer.retries": 3 }
//! ```
//!
//! becomes, under the `parameters:` key,
//!
//! ```yaml
//! ###> acme/mailer ###
//!     locale: en
//!     mailer.retries: 3
//! ###< acme/mailer ###
//! ```
//!
//! Parameters the file already defines are left to the user.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use super::{
    ConfiguratorKind, RecipeConfigurator, expect_object, read_target, write_target, yaml,
};
use crate::config::Options;
use crate::core::RecipeError;
use crate::models::Recipe;

const SERVICES_FILE: &str = "%CONFIG_DIR%/services.yaml";
const PARAMETERS_KEY: &str = "parameters";

/// Applies the `container` manifest key.
pub struct ContainerConfigurator {
    options: Options,
}

impl ContainerConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn path(&self) -> PathBuf {
        self.options.resolve_path(SERVICES_FILE)
    }
}

impl RecipeConfigurator for ContainerConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let parameters = expect_object(ConfiguratorKind::Container, payload)?;
        let path = self.path();
        let original = read_target(&path)?;
        let contents = original.as_deref().unwrap_or_default();

        let defined = defined_parameters(contents);
        let mut lines = Vec::with_capacity(parameters.len());
        for (name, value) in parameters {
            if defined.iter().any(|existing| existing == name) {
                tracing::debug!("Parameter {} is already defined in {}", name, path.display());
                continue;
            }
            lines.push(format!("{name}: {}", render_value(value)?));
        }
        if lines.is_empty() {
            return Ok(());
        }

        let patched =
            yaml::add_sections(contents, &recipe.name, &[(PARAMETERS_KEY.to_string(), lines)])
                .map_err(|inline| RecipeError::PatchConflict {
                    file: path.display().to_string(),
                    reason: inline.to_string(),
                })?;
        if write_target(&path, original.as_deref(), &patched)? {
            tracing::info!("Added container parameters of {}", recipe.name);
        }
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, _payload: &Value) -> Result<()> {
        let path = self.path();
        let Some(original) = read_target(&path)? else {
            return Ok(());
        };
        let patched = yaml::remove_sections(&original, &recipe.name);
        if write_target(&path, Some(&original), &patched)? {
            tracing::info!("Removed container parameters of {}", recipe.name);
        }
        Ok(())
    }
}

/// Parameter names declared directly under `parameters:`.
fn defined_parameters(contents: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_parameters = false;
    for line in contents.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if !line.starts_with([' ', '\t']) {
            in_parameters = yaml::top_level_key(line) == Some(PARAMETERS_KEY);
            continue;
        }
        if in_parameters {
            if let Some((name, _)) = line.trim_start().split_once(':') {
                names.push(name.trim_matches(['\'', '"']).to_string());
            }
        }
    }
    names
}

/// Inline YAML for a parameter value.
fn render_value(value: &Value) -> Result<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Ok(value.to_string()),
        scalar => {
            let rendered = serde_yaml::to_string(scalar).context("Failed to render parameter")?;
            Ok(rendered.trim_end().to_string())
        }
    }
}
