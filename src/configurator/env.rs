//! Environment variable defaults.
//!
//! The payload is an ordered map of variables:
//!
//! ```json
//! {
//!     "#1": "Generated by acme/mailer",
//!     "MAILER_DSN": "smtp://localhost",
//!     "APP_SECRET": "%generate(secret)%"
//! }
//! ```
//!
//! The variables are appended to `.env.dist` and `.env` in a marked block,
//! creating either file when missing, and declared as `<env>` elements in
//! `phpunit.xml.dist` / `phpunit.xml` inside every `<php>` element. Keys
//! starting with `#` become comments.

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::LazyLock;
use uuid::Uuid;

use super::markers::{self, MarkerStyle};
use super::{
    ConfiguratorKind, RecipeConfigurator, expect_object, read_target, scalar_to_string,
    write_target,
};
use crate::config::Options;
use crate::constants::GENERATE_SECRET_PLACEHOLDER;
use crate::core::RecipeError;
use crate::models::Recipe;

/// Env files, template first.
const ENV_FILES: [&str; 2] = [".env.dist", ".env"];

/// Test runner configurations, distributed file first.
const PHPUNIT_FILES: [&str; 2] = ["phpunit.xml.dist", "phpunit.xml"];

static PHP_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+</php>").expect("php close pattern is valid"));

/// Applies the `env` manifest key.
pub struct EnvConfigurator {
    options: Options,
}

impl EnvConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.options.root_dir().join(file)
    }

    /// Resolves a payload value; a secret placeholder yields a new secret.
    fn value(&self, value: &Value) -> String {
        let value = scalar_to_string(value);
        if value == GENERATE_SECRET_PLACEHOLDER {
            generate_secret()
        } else {
            self.options.expand_target_dir(&value)
        }
    }

    fn render_env(&self, vars: &Map<String, Value>) -> String {
        let mut body = String::new();
        for (key, value) in vars {
            let value = self.value(value);
            if key.starts_with('#') {
                body.push_str(&format!("# {value}\n"));
            } else {
                body.push_str(&format!("{key}={value}\n"));
            }
        }
        body
    }

    fn render_phpunit(&self, vars: &Map<String, Value>) -> String {
        let indent = MarkerStyle::Xml.indent();
        let mut body = String::new();
        for (key, value) in vars {
            let value = self.value(value);
            if key.starts_with('#') {
                body.push_str(&format!("{indent}<!-- {value} -->\n"));
            } else {
                body.push_str(&format!(
                    "{indent}<env name=\"{}\" value=\"{}\" />\n",
                    escape_attribute(key),
                    escape_attribute(&value)
                ));
            }
        }
        body
    }

    fn configure_env_files(&self, recipe: &Recipe, vars: &Map<String, Value>) -> Result<()> {
        let dist_path = self.path(ENV_FILES[0]);
        let env_path = self.path(ENV_FILES[1]);
        let dist = read_target(&dist_path)?;

        // A missing .env starts as a copy of the template, taken before the
        // template is patched. Both files are created when missing.
        let env = match read_target(&env_path)? {
            Some(contents) => contents,
            None => dist.clone().unwrap_or_default(),
        };
        let dist = dist.unwrap_or_default();

        let body = self.render_env(vars);
        for (path, original) in [(dist_path, dist), (env_path, env)] {
            if markers::is_marked(&original, MarkerStyle::Env, &recipe.name) {
                tracing::debug!("{} already holds variables of {}", path.display(), recipe.name);
                continue;
            }

            let patched = markers::append_block(&original, MarkerStyle::Env, &recipe.name, &body);
            let existed = path.exists();
            write_target(&path, existed.then_some(original.as_str()), &patched)?;
            tracing::info!("Added environment variables of {} to {}", recipe.name, path.display());
        }
        Ok(())
    }

    fn configure_phpunit(&self, recipe: &Recipe, vars: &Map<String, Value>) -> Result<()> {
        for file in PHPUNIT_FILES {
            let path = self.path(file);
            let Some(original) = read_target(&path)? else {
                continue;
            };
            if markers::is_marked(&original, MarkerStyle::Xml, &recipe.name) {
                continue;
            }

            let closes: Vec<usize> =
                PHP_CLOSE.find_iter(&original).map(|close| close.start()).collect();
            if closes.is_empty() {
                return Err(RecipeError::PatchConflict {
                    file: path.display().to_string(),
                    reason: "no indented </php> element to add <env> declarations to".to_string(),
                }
                .into());
            }

            // Every <php> element gets the declarations.
            let body = self.render_phpunit(vars);
            let block = markers::render_block(MarkerStyle::Xml, &recipe.name, &body);
            let mut patched = original.clone();
            for at in closes.into_iter().rev() {
                patched.insert_str(at, &block);
            }
            write_target(&path, Some(&original), &patched)?;
            tracing::info!("Added environment variables of {} to {}", recipe.name, file);
        }
        Ok(())
    }

    fn unconfigure_files(&self, recipe: &Recipe, files: &[&str], style: MarkerStyle) -> Result<()> {
        for file in files {
            let path = self.path(file);
            let Some(original) = read_target(&path)? else {
                continue;
            };
            let (patched, removed) = markers::remove_blocks(&original, style, &recipe.name);
            if removed > 0 {
                write_target(&path, Some(&original), &patched)?;
                tracing::info!("Removed environment variables of {} from {}", recipe.name, file);
            }
        }
        Ok(())
    }
}

impl RecipeConfigurator for EnvConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let vars = expect_object(ConfiguratorKind::Env, payload)?;
        self.configure_env_files(recipe, vars)?;
        self.configure_phpunit(recipe, vars)
    }

    fn unconfigure(&self, recipe: &Recipe, _payload: &Value) -> Result<()> {
        self.unconfigure_files(recipe, &ENV_FILES, MarkerStyle::Env)?;
        self.unconfigure_files(recipe, &PHPUNIT_FILES, MarkerStyle::Xml)
    }
}

/// 32 random hex characters.
fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
