//! Bundle registration in `config/bundles.php`.
//!
//! The payload maps bundle classes to the environments they are enabled in:
//!
//! ```json
//! { "Acme\\MailerBundle\\AcmeMailerBundle": ["all"] }
//! ```
//!
//! The file is regenerated from the registered classes, one per line:
//!
//! ```php
//! <?php
//!
//! return [
//!     Symfony\Bundle\FrameworkBundle\FrameworkBundle::class => ['all' => true],
//!     Acme\MailerBundle\AcmeMailerBundle::class => ['dev' => true, 'test' => true],
//! ];
//! ```

use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;

use super::{ConfiguratorKind, RecipeConfigurator, expect_object, read_target, write_target};
use crate::config::Options;
use crate::core::RecipeError;
use crate::models::Recipe;

const BUNDLES_FILE: &str = "%CONFIG_DIR%/bundles.php";

/// Always registered with every environment a recipe asks for.
const FRAMEWORK_BUNDLE: &str = "Symfony\\Bundle\\FrameworkBundle\\FrameworkBundle";

static BUNDLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\\?([A-Za-z0-9_\\]+)::class\s*=>\s*\[(.*)\],?\s*$")
        .expect("bundle line pattern is valid")
});

static ENV_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([^'"]+)['"]\s*=>\s*(true|false)"#).expect("env flag pattern is valid")
});

/// Registered bundles in file order.
type Registry = Vec<(String, Vec<(String, bool)>)>;

/// Applies the `bundles` manifest key.
pub struct BundlesConfigurator {
    options: Options,
}

impl BundlesConfigurator {
    /// Creates the configurator for a project.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn path(&self) -> PathBuf {
        self.options.resolve_path(BUNDLES_FILE)
    }
}

impl RecipeConfigurator for BundlesConfigurator {
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let requested = requested_bundles(payload)?;
        let path = self.path();
        let original = read_target(&path)?;
        let mut registry = parse(original.as_deref().unwrap_or_default());

        for (class, envs) in requested {
            let existing = registry.iter_mut().find(|(registered, _)| *registered == class);
            match existing {
                Some((_, flags)) if class == FRAMEWORK_BUNDLE => {
                    for env in envs {
                        set_flag(flags, &env);
                    }
                }
                Some(_) => {}
                None => {
                    tracing::debug!("Enabling {} for {}", class, envs.join(", "));
                    registry.push((class, envs.into_iter().map(|env| (env, true)).collect()));
                }
            }
        }

        if write_target(&path, original.as_deref(), &dump(&registry))? {
            tracing::info!("Registered bundles of {}", recipe.name);
        }
        Ok(())
    }

    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()> {
        let path = self.path();
        let Some(original) = read_target(&path)? else {
            return Ok(());
        };
        let classes: Vec<String> =
            requested_bundles(payload)?.into_iter().map(|(class, _)| class).collect();

        let mut registry = parse(&original);
        registry.retain(|(class, _)| !classes.contains(class));
        if write_target(&path, Some(&original), &dump(&registry))? {
            tracing::info!("Unregistered bundles of {}", recipe.name);
        }
        Ok(())
    }
}

fn set_flag(flags: &mut Vec<(String, bool)>, env: &str) {
    match flags.iter_mut().find(|(name, _)| name == env) {
        Some((_, enabled)) => *enabled = true,
        None => flags.push((env.to_string(), true)),
    }
}

fn requested_bundles(payload: &Value) -> Result<Vec<(String, Vec<String>)>, RecipeError> {
    let map = expect_object(ConfiguratorKind::Bundles, payload)?;
    map.iter()
        .map(|(class, envs)| -> Result<(String, Vec<String>), RecipeError> {
            let envs = envs
                .as_array()
                .ok_or_else(|| RecipeError::ConfigError {
                    message: format!("environments of bundle {class} must be a list"),
                })?
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            Ok((class.trim_start_matches('\\').to_string(), envs))
        })
        .collect()
}

/// Registered bundles found in a `bundles.php` file.
#[must_use]
pub fn parse(contents: &str) -> Registry {
    contents
        .lines()
        .filter_map(|line| BUNDLE_LINE.captures(line))
        .map(|captures| {
            let flags = ENV_FLAG
                .captures_iter(&captures[2])
                .map(|flag| (flag[1].to_string(), &flag[2] == "true"))
                .collect();
            (captures[1].to_string(), flags)
        })
        .collect()
}

/// `bundles.php` contents for `registry`.
#[must_use]
pub fn dump(registry: &Registry) -> String {
    let mut contents = String::from("<?php\n\nreturn [\n");
    for (class, flags) in registry {
        let flags: Vec<String> = flags
            .iter()
            .map(|(env, enabled)| format!("'{env}' => {enabled}"))
            .collect();
        contents.push_str(&format!("    {class}::class => [{}],\n", flags.join(", ")));
    }
    contents.push_str("];\n");
    contents
}
