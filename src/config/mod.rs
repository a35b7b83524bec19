//! Configuration for recipe runs.
//!
//! Three sources feed a run, in decreasing precedence:
//!
//! 1. **Environment**: `RECIPES_ENDPOINT`, `RECIPES_CAFILE`,
//!    `RECIPES_CACHE_DIR`, `COMPOSE_FILE`, ...
//! 2. **Project metadata**: the `extra` section of the host manifest
//!    (`composer.json`), see [`ProjectConfig`]
//! 3. **Global configuration**: `~/.recipe-kit/config.toml`, see
//!    [`GlobalConfig`]
//!
//! Environment access always goes through a lookup function passed in by the
//! caller, so tests never touch the process environment.
//!
//! # Project metadata
//!
//! ```json
//! {
//!     "extra": {
//!         "config-dir": "etc",
//!         "recipes": {
//!             "endpoint": "https://recipes.example.org",
//!             "id": "01HQ...",
//!             "allow-contrib": true,
//!             "docker": true,
//!             "repositories": ["https://recipes.acme.example"]
//!         }
//!     }
//! }
//! ```

pub mod global;

pub use global::GlobalConfig;

use crate::constants::{
    CACHE_DIR_ENV, CAFILE_ENV, COMPOSE_FILE_ENV, COMPOSE_PATH_SEPARATOR_ENV, DEFAULT_ENDPOINT,
    ENDPOINT_ENV, HOST_MANIFEST_NAME,
};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Reads a variable from the process environment; empty values count as unset.
#[must_use]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Named directories recipes may refer to, with their defaults.
const DEFAULT_DIRS: [(&str, &str); 6] = [
    ("bin-dir", "bin"),
    ("config-dir", "config"),
    ("public-dir", "public"),
    ("root-dir", "."),
    ("src-dir", "src"),
    ("var-dir", "var"),
];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(.+?)%").expect("placeholder pattern is valid"));

/// What configurators know about the project they patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    root_dir: PathBuf,
    values: BTreeMap<String, String>,
    docker: bool,
    env: BTreeMap<String, String>,
}

impl Options {
    /// Options for a project rooted at `root_dir`, with default directories.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            values: DEFAULT_DIRS.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            docker: false,
            env: BTreeMap::new(),
        }
    }

    /// Overrides a named option (`config-dir`, ...).
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Enables or disables Docker Compose patching.
    #[must_use]
    pub fn with_docker(mut self, docker: bool) -> Self {
        self.docker = docker;
        self
    }

    /// Records an environment variable configurators may consult.
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Project root; every target path is relative to it.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Named option value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether Docker Compose files are patched.
    #[must_use]
    pub fn docker(&self) -> bool {
        self.docker
    }

    /// Recorded environment variable.
    #[must_use]
    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Replaces `%CONFIG_DIR%`-style placeholders with option values.
    ///
    /// `%FOO_BAR%` maps to option `foo-bar`; a trailing `/` of the value is
    /// dropped. Unknown placeholders are kept as written.
    #[must_use]
    pub fn expand_target_dir(&self, target: &str) -> String {
        PLACEHOLDER
            .replace_all(target, |captures: &regex::Captures<'_>| {
                let option = captures[1].to_ascii_lowercase().replace('_', "-");
                match self.values.get(&option) {
                    Some(value) => value.trim_end_matches('/').to_string(),
                    None => captures[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Absolute path of `target` after placeholder expansion.
    #[must_use]
    pub fn resolve_path(&self, target: &str) -> PathBuf {
        self.root_dir.join(self.expand_target_dir(target))
    }
}

/// Project metadata read from the host manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Directory holding the host manifest
    pub root_dir: PathBuf,
    /// Endpoint override
    pub endpoint: Option<String>,
    /// Project identity token
    pub id: Option<String>,
    /// Whether contributed recipes are allowed
    pub allow_contrib: bool,
    /// Whether Docker Compose files are patched
    pub docker: bool,
    /// Extra recipe repositories
    pub repositories: Vec<String>,
    /// Named directory overrides (`config-dir`, ...)
    pub dirs: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Reads `composer.json` in `root_dir`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but is not valid JSON.
    pub fn load(root_dir: &Path) -> Result<Self> {
        let path = root_dir.join(HOST_MANIFEST_NAME);
        if !path.exists() {
            tracing::debug!("No {} in {}", HOST_MANIFEST_NAME, root_dir.display());
            return Ok(Self {
                root_dir: root_dir.to_path_buf(),
                ..Self::default()
            });
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::from_manifest(root_dir, &manifest))
    }

    /// Extracts the project metadata from a parsed host manifest.
    #[must_use]
    pub fn from_manifest(root_dir: &Path, manifest: &Value) -> Self {
        let extra = manifest.get("extra");
        let recipes = extra.and_then(|extra| extra.get("recipes"));
        let string = |key: &str| {
            recipes
                .and_then(|r| r.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let flag = |key: &str| recipes.and_then(|r| r.get(key)).is_some_and(is_truthy);

        let repositories = match recipes.and_then(|r| r.get("repositories")) {
            Some(Value::Array(items)) => {
                items.iter().filter_map(Value::as_str).map(str::to_string).collect()
            }
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        };

        let dirs = DEFAULT_DIRS
            .iter()
            .filter_map(|(name, _)| {
                extra
                    .and_then(|extra| extra.get(*name))
                    .and_then(Value::as_str)
                    .map(|value| ((*name).to_string(), value.to_string()))
            })
            .collect();

        Self {
            root_dir: root_dir.to_path_buf(),
            endpoint: string("endpoint"),
            id: string("id"),
            allow_contrib: flag("allow-contrib"),
            docker: flag("docker"),
            repositories,
            dirs,
        }
    }

    /// Options handed to configurators.
    #[must_use]
    pub fn options(&self, env: &dyn Fn(&str) -> Option<String>) -> Options {
        let mut options = Options::new(&self.root_dir).with_docker(self.docker);
        for (name, value) in &self.dirs {
            options = options.with_value(name.clone(), value.clone());
        }
        for name in [COMPOSE_FILE_ENV, COMPOSE_PATH_SEPARATOR_ENV] {
            if let Some(value) = env(name) {
                options = options.with_env(name, value);
            }
        }
        options
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

/// Everything the downloader needs to talk to a recipe server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Recipe endpoint
    pub endpoint: String,
    /// Extra CA bundle
    pub cafile: Option<PathBuf>,
    /// Project identity token
    pub project_id: Option<String>,
    /// Whether contributed recipes are allowed
    pub allow_contrib: bool,
    /// Extra recipe repositories
    pub repositories: Vec<String>,
    /// Root of the response cache
    pub cache_dir: PathBuf,
}

impl DownloaderConfig {
    /// Merges environment, project and global settings.
    ///
    /// Endpoint precedence: `RECIPES_ENDPOINT`, project, global, default.
    #[must_use]
    pub fn resolve(
        project: &ProjectConfig,
        global: &GlobalConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let endpoint = env(ENDPOINT_ENV)
            .or_else(|| project.endpoint.clone())
            .or_else(|| global.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let cafile = env(CAFILE_ENV).map(PathBuf::from).or_else(|| global.cafile.clone());
        let cache_dir = env(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| global.cache_dir.clone())
            .unwrap_or_else(GlobalConfig::default_cache_dir);

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            cafile,
            project_id: project.id.clone(),
            allow_contrib: project.allow_contrib,
            repositories: project.repositories.clone(),
            cache_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_expand_target_dir() {
        let options = Options::new("/project").with_value("config-dir", "etc/");
        assert_eq!(options.expand_target_dir("%CONFIG_DIR%/packages/"), "etc/packages/");
        assert_eq!(options.expand_target_dir("%VAR_DIR%/cache"), "var/cache");
        assert_eq!(options.expand_target_dir("%UNKNOWN%/x"), "%UNKNOWN%/x");
        assert_eq!(options.expand_target_dir("sqlite:///%kernel.project_dir%/data.db"), "sqlite:///%kernel.project_dir%/data.db");
        assert_eq!(options.resolve_path("%PUBLIC_DIR%/index.php"), PathBuf::from("/project/public/index.php"));
    }

    #[test]
    fn test_project_config_from_manifest() {
        let manifest = json!({
            "name": "acme/app",
            "extra": {
                "config-dir": "etc",
                "recipes": {
                    "endpoint": "https://recipes.acme.example",
                    "id": "project-42",
                    "allow-contrib": true,
                    "docker": "1",
                    "repositories": ["https://a.example", "https://b.example"]
                }
            }
        });
        let project = ProjectConfig::from_manifest(Path::new("/app"), &manifest);

        assert_eq!(project.endpoint.as_deref(), Some("https://recipes.acme.example"));
        assert_eq!(project.id.as_deref(), Some("project-42"));
        assert!(project.allow_contrib);
        assert!(project.docker);
        assert_eq!(project.repositories.len(), 2);

        let options = project.options(&|name: &str| {
            (name == COMPOSE_FILE_ENV).then(|| "docker-compose.yml".to_string())
        });
        assert_eq!(options.get("config-dir"), Some("etc"));
        assert_eq!(options.get("src-dir"), Some("src"));
        assert!(options.docker());
        assert_eq!(options.env(COMPOSE_FILE_ENV), Some("docker-compose.yml"));
        assert_eq!(options.env(COMPOSE_PATH_SEPARATOR_ENV), None);
    }

    #[test]
    fn test_project_config_load_without_manifest() {
        let temp = TempDir::new().unwrap();
        let project = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(project.root_dir, temp.path());
        assert!(!project.docker);
    }

    #[test]
    fn test_project_config_load_invalid_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("composer.json"), "{").unwrap();
        let err = ProjectConfig::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_endpoint_precedence() {
        let mut project = ProjectConfig::default();
        let mut global = GlobalConfig::default();

        let config = DownloaderConfig::resolve(&project, &global, &no_env);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);

        global.endpoint = Some("https://global.example/".to_string());
        let config = DownloaderConfig::resolve(&project, &global, &no_env);
        assert_eq!(config.endpoint, "https://global.example");

        project.endpoint = Some("https://project.example".to_string());
        let config = DownloaderConfig::resolve(&project, &global, &no_env);
        assert_eq!(config.endpoint, "https://project.example");

        let env = |name: &str| match name {
            ENDPOINT_ENV => Some("https://env.example".to_string()),
            CAFILE_ENV => Some("/tmp/ca.pem".to_string()),
            CACHE_DIR_ENV => Some("/tmp/cache".to_string()),
            _ => None,
        };
        let config = DownloaderConfig::resolve(&project, &global, &env);
        assert_eq!(config.endpoint, "https://env.example");
        assert_eq!(config.cafile, Some(PathBuf::from("/tmp/ca.pem")));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
    }
}
