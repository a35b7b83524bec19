//! Applying and reverting recipe manifests.
//!
//! A recipe manifest is an ordered map from configurator key to payload:
//!
//! ```json
//! {
//!     "bundles": { "Acme\\MailerBundle\\AcmeMailerBundle": ["all"] },
//!     "copy-from-recipe": { "config/": "%CONFIG_DIR%/" },
//!     "env": { "MAILER_DSN": "smtp://localhost" },
//!     "docker-compose": { "services": ["mailer:", "  image: axllent/mailpit"] }
//! }
//! ```
//!
//! Each key names one [`ConfiguratorKind`]. The [`Configurator`] dispatcher
//! builds each kind's [`RecipeConfigurator`] the first time a manifest needs
//! it and reuses it for the rest of the run.
//!
//! Configurators editing shared text files ([`env`], [`compose`],
//! [`container`], [`makefile`]) keep the recipe's lines between markers (see
//! [`markers`]) so a later uninstall removes exactly those lines.
//!
//! Nothing is rolled back across files: when a later key of a manifest fails,
//! the files patched by earlier keys keep their changes and the error is
//! returned.

pub mod bundles;
pub mod compose;
pub mod composer_scripts;
pub mod container;
pub mod copy;
pub mod env;
pub mod makefile;
pub mod markers;
pub mod yaml;

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::Options;
use crate::core::RecipeError;
use crate::models::Recipe;
use crate::utils::fs::safe_write;

/// Manifest keys that describe the recipe rather than edit the project.
const METADATA_KEYS: [&str; 1] = ["aliases"];

/// The configurators a manifest may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfiguratorKind {
    /// Registers bundle classes in `config/bundles.php`
    Bundles,
    /// Adds `scripts.auto-scripts` entries to `composer.json`
    ComposerScripts,
    /// Copies files shipped with the recipe
    CopyFromRecipe,
    /// Copies files out of the installed package
    CopyFromPackage,
    /// Adds variables to `.env` files and `phpunit.xml`
    Env,
    /// Adds parameters to `config/services.yaml`
    Container,
    /// Adds rules to the `Makefile`
    Makefile,
    /// Adds services and volumes to Docker Compose files
    DockerCompose,
}

impl ConfiguratorKind {
    /// Every kind, in the order configurators are documented.
    pub const ALL: [Self; 8] = [
        Self::Bundles,
        Self::ComposerScripts,
        Self::CopyFromRecipe,
        Self::CopyFromPackage,
        Self::Env,
        Self::Container,
        Self::Makefile,
        Self::DockerCompose,
    ];

    /// Manifest key of this kind.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Bundles => "bundles",
            Self::ComposerScripts => "composer-scripts",
            Self::CopyFromRecipe => "copy-from-recipe",
            Self::CopyFromPackage => "copy-from-package",
            Self::Env => "env",
            Self::Container => "container",
            Self::Makefile => "makefile",
            Self::DockerCompose => "docker-compose",
        }
    }

    fn build(self, options: &Options) -> Box<dyn RecipeConfigurator> {
        let options = options.clone();
        match self {
            Self::Bundles => Box::new(bundles::BundlesConfigurator::new(options)),
            Self::ComposerScripts => {
                Box::new(composer_scripts::ComposerScriptsConfigurator::new(options))
            }
            Self::CopyFromRecipe => Box::new(copy::CopyFromRecipeConfigurator::new(options)),
            Self::CopyFromPackage => Box::new(copy::CopyFromPackageConfigurator::new(options)),
            Self::Env => Box::new(env::EnvConfigurator::new(options)),
            Self::Container => Box::new(container::ContainerConfigurator::new(options)),
            Self::Makefile => Box::new(makefile::MakefileConfigurator::new(options)),
            Self::DockerCompose => Box::new(compose::DockerComposeConfigurator::new(options)),
        }
    }
}

impl fmt::Display for ConfiguratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ConfiguratorKind {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.key() == s).ok_or_else(|| {
            RecipeError::UnknownConfigurator {
                key: s.to_string(),
            }
        })
    }
}

/// One way of applying a manifest payload to the project.
///
/// `unconfigure` must undo `configure` for the same recipe and payload, and
/// must be a no-op when the recipe left no trace.
pub trait RecipeConfigurator {
    /// Applies `payload` for `recipe`.
    fn configure(&self, recipe: &Recipe, payload: &Value) -> Result<()>;

    /// Reverts what [`RecipeConfigurator::configure`] did.
    fn unconfigure(&self, recipe: &Recipe, payload: &Value) -> Result<()>;
}

/// Dispatches manifest keys to configurators.
pub struct Configurator {
    options: Options,
    instances: HashMap<ConfiguratorKind, Box<dyn RecipeConfigurator>>,
}

impl Configurator {
    /// Creates a dispatcher; no configurator is built yet.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            instances: HashMap::new(),
        }
    }

    /// Project options shared by every configurator.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of configurators built so far.
    #[must_use]
    pub fn instantiated(&self) -> usize {
        self.instances.len()
    }

    /// Configurator for `kind`, built on first use.
    pub fn get(&mut self, kind: ConfiguratorKind) -> &dyn RecipeConfigurator {
        let options = &self.options;
        &**self.instances.entry(kind).or_insert_with(|| kind.build(options))
    }

    /// Applies every key of the recipe's manifest, in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::UnknownConfigurator`] for a key no configurator
    /// handles, before anything is applied, or the first configurator error.
    pub fn install(&mut self, recipe: &Recipe) -> Result<()> {
        for (kind, payload) in Self::steps(recipe)? {
            tracing::debug!("Configuring {} for {}", kind, recipe.name);
            self.get(kind)
                .configure(recipe, payload)
                .with_context(|| format!("Failed to apply \"{kind}\" for {}", recipe.name))?;
        }
        Ok(())
    }

    /// Reverts every key of the recipe's manifest.
    ///
    /// # Errors
    ///
    /// Same as [`Configurator::install`].
    pub fn unconfigure(&mut self, recipe: &Recipe) -> Result<()> {
        for (kind, payload) in Self::steps(recipe)? {
            tracing::debug!("Unconfiguring {} for {}", kind, recipe.name);
            self.get(kind)
                .unconfigure(recipe, payload)
                .with_context(|| format!("Failed to revert \"{kind}\" for {}", recipe.name))?;
        }
        Ok(())
    }

    fn steps(recipe: &Recipe) -> Result<Vec<(ConfiguratorKind, &Value)>, RecipeError> {
        recipe
            .manifest
            .iter()
            .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
            .map(|(key, payload)| key.parse::<ConfiguratorKind>().map(|kind| (kind, payload)))
            .collect()
    }
}

/// Reads a target file, `None` when it does not exist.
pub(crate) fn read_target(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Writes `contents` to `path` when it differs from `original`.
pub(crate) fn write_target(path: &Path, original: Option<&str>, contents: &str) -> Result<bool> {
    if original == Some(contents) {
        return Ok(false);
    }
    safe_write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// String form of a scalar payload value.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Payload as an object, or a configuration error naming `kind`.
pub(crate) fn expect_object<'a>(
    kind: ConfiguratorKind,
    payload: &'a Value,
) -> Result<&'a serde_json::Map<String, Value>, RecipeError> {
    payload.as_object().ok_or_else(|| RecipeError::ConfigError {
        message: format!("\"{kind}\" expects an object, got {payload}"),
    })
}
