//! Entries of `scripts.auto-scripts` in `composer.json`.
//!
//! ```json
//! { "cache:clear": "symfony-cmd", "assets:install %PUBLIC_DIR%": "symfony-cmd" }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::{ConfiguratorKind, RecipeConfigurator, expect_object, read_target, write_target};
use crate::config::Options;
use crate::constants::HOST_MANIFEST_NAME;
use crate::core::RecipeError;
use crate::models::Recipe;

const SCRIPTS_KEY: &str = "scripts";
const AUTO_SCRIPTS_KEY: &str = "auto-scripts";

/// Applies the `composer-scripts` manifest key.
pub struct ComposerScriptsConfigurator {
    options: Options,
}

impl ComposerScriptsConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn path(&self) -> PathBuf {
        self.options.root_dir().join(HOST_MANIFEST_NAME)
    }

    fn load(&self) -> Result<(Option<String>, Map<String, Value>)> {
        let path = self.path();
        let original = read_target(&path)?;
        let manifest = match original.as_deref() {
            Some(contents) if !contents.trim().is_empty() => {
                let value: Value = serde_json::from_str(contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                match value {
                    Value::Object(map) => map,
                    _ => {
                        return Err(RecipeError::PatchConflict {
                            file: path.display().to_string(),
                            reason: "the manifest is not a JSON object".to_string(),
                        }
                        .into());
                    }
                }
            }
            _ => Map::new(),
        };
        Ok((original, manifest))
    }

    fn save(&self, original: Option<&str>, manifest: &Map<String, Value>) -> Result<bool> {
        write_target(&self.path(), original, &to_pretty_json(manifest)?)
    }
}

impl RecipeConfigurator for ComposerScriptsConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let scripts = expect_object(ConfiguratorKind::ComposerScripts, payload)?;
        let (original, mut manifest) = self.load()?;

        let auto_scripts = auto_scripts_mut(&mut manifest, &self.path())?;
        for (command, kind) in scripts {
            auto_scripts.insert(self.options.expand_target_dir(command), kind.clone());
        }

        if self.save(original.as_deref(), &manifest)? {
            tracing::info!("Added auto-scripts of {}", recipe.name);
        }
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let scripts = expect_object(ConfiguratorKind::ComposerScripts, payload)?;
        let (original, mut manifest) = self.load()?;
        if original.is_none() {
            return Ok(());
        }

        let auto_scripts = auto_scripts_mut(&mut manifest, &self.path())?;
        for command in scripts.keys() {
            auto_scripts.shift_remove(&self.options.expand_target_dir(command));
        }

        if self.save(original.as_deref(), &manifest)? {
            tracing::info!("Removed auto-scripts of {}", recipe.name);
        }
        Ok(())
    }
}

fn auto_scripts_mut<'a>(
    manifest: &'a mut Map<String, Value>,
    path: &std::path::Path,
) -> Result<&'a mut Map<String, Value>, RecipeError> {
    let conflict = |reason: &str| RecipeError::PatchConflict {
        file: path.display().to_string(),
        reason: reason.to_string(),
    };

    manifest
        .entry(SCRIPTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| conflict("\"scripts\" is not an object"))?
        .entry(AUTO_SCRIPTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| conflict("\"scripts.auto-scripts\" is not an object"))
}

/// JSON with four-space indentation and a trailing newline.
fn to_pretty_json(manifest: &Map<String, Value>) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    manifest
        .serialize(&mut serializer)
        .context("Failed to serialize composer.json")?;
    let mut contents = String::from_utf8(buffer).context("composer.json is not valid UTF-8")?;
    contents.push('\n');
    Ok(contents)
}
