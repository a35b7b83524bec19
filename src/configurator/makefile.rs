//! Makefile rules.
//!
//! The payload is the list of lines to append, tabs included:
//!
//! ```json
//! ["cache-clear:", "\t@bin/console cache:clear"]
//! ```

use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;

use super::markers::{self, MarkerStyle};
use super::{RecipeConfigurator, read_target, scalar_to_string, write_target};
use crate::config::Options;
use crate::core::RecipeError;
use crate::models::Recipe;

const MAKEFILE: &str = "Makefile";

/// Applies the `makefile` manifest key.
pub struct MakefileConfigurator {
    options: Options,
}

impl MakefileConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn path(&self) -> PathBuf {
        self.options.root_dir().join(MAKEFILE)
    }

    fn render(&self, payload: &Value) -> Result<String, RecipeError> {
        let lines: Vec<String> = match payload {
            Value::Array(lines) => lines.iter().map(scalar_to_string).collect(),
            Value::String(text) => text.lines().map(str::to_string).collect(),
            other => {
                return Err(RecipeError::ConfigError {
                    message: format!("\"makefile\" expects a list of lines, got {other}"),
                });
            }
        };

        let mut body = String::new();
        for line in lines {
            body.push_str(&self.options.expand_target_dir(&line));
            body.push('\n');
        }
        Ok(body)
    }
}

impl RecipeConfigurator for MakefileConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let body = self.render(payload)?;
        let path = self.path();
        let original = read_target(&path)?;
        let contents = original.as_deref().unwrap_or_default();
        if markers::is_marked(contents, MarkerStyle::Env, &recipe.name) {
            return Ok(());
        }

        let patched = markers::append_block(contents, MarkerStyle::Env, &recipe.name, &body);
        write_target(&path, original.as_deref(), &patched)?;
        tracing::info!("Added Makefile rules of {}", recipe.name);
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, _payload: &Value) -> Result<()> {
        let path = self.path();
        let Some(original) = read_target(&path)? else {
            return Ok(());
        };
        let (patched, removed) = markers::remove_blocks(&original, MarkerStyle::Env, &recipe.name);
        if removed > 0 {
            write_target(&path, Some(&original), &patched)?;
            tracing::info!("Removed Makefile rules of {}", recipe.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OperationKind, PackageRef};
    use serde_json::{Map, json};
    use std::fs;
    use tempfile::TempDir;

    fn recipe() -> Recipe {
        let package = PackageRef::new("acme/console", OperationKind::Install, "1.0.0");
        Recipe::with_manifest(&package, Map::new())
    }

    #[test]
    fn test_append_and_remove() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Makefile");
        fs::write(&path, "all:\n\t@echo all\n").unwrap();

        let configurator = MakefileConfigurator::new(Options::new(temp.path()));
        let payload = json!(["cache-clear:", "\t@%BIN_DIR%/console cache:clear"]);
        configurator.configure(&recipe(), &payload).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "all:\n\t@echo all\n\n###> acme/console ###\ncache-clear:\n\t@bin/console cache:clear\n###< acme/console ###\n"
        );

        configurator.unconfigure(&recipe(), &payload).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "all:\n\t@echo all\n");
    }

    #[test]
    fn test_creates_makefile() {
        let temp = TempDir::new().unwrap();
        let configurator = MakefileConfigurator::new(Options::new(temp.path()));
        configurator.configure(&recipe(), &json!("serve:\n\tphp -S localhost:8000")).unwrap();

        let contents = fs::read_to_string(temp.path().join("Makefile")).unwrap();
        assert!(contents.contains("serve:\n\tphp -S localhost:8000\n"));
    }

    #[test]
    fn test_rejects_objects() {
        let temp = TempDir::new().unwrap();
        let configurator = MakefileConfigurator::new(Options::new(temp.path()));
        assert!(configurator.configure(&recipe(), &json!({"a": 1})).is_err());
    }
}
