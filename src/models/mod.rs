//! Shared data models for recipe operations
//!
//! These types describe what the host package manager hands over (package
//! operations) and what the recipe server hands back (recipes and their
//! manifests). They are plain values; all I/O lives in the modules that
//! consume them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What the host did (or is about to do) with a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Package newly installed
    Install,
    /// Package moved to another version
    Update,
    /// Package removed
    Uninstall,
}

impl OperationKind {
    /// Single-letter code used in batch query tokens.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Install => 'i',
            Self::Update => 'u',
            Self::Uninstall => 'r',
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Autoload rules of a package, in declaration order.
///
/// Each rule maps a namespace prefix to a path relative to the package root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Autoload {
    /// PSR-4 rules
    pub psr4: Vec<(String, String)>,
    /// PSR-0 rules
    pub psr0: Vec<(String, String)>,
}

impl Autoload {
    /// Reads the `autoload` object of a host package entry.
    ///
    /// Paths may be given as a string or a list of strings; every path of a
    /// list produces its own rule. Unknown keys are ignored.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let rules = |key: &str| -> Vec<(String, String)> {
            let Some(map) = value.get(key).and_then(Value::as_object) else {
                return Vec::new();
            };
            let mut rules = Vec::new();
            for (namespace, paths) in map {
                match paths {
                    Value::String(path) => rules.push((namespace.clone(), path.clone())),
                    Value::Array(paths) => {
                        for path in paths.iter().filter_map(Value::as_str) {
                            rules.push((namespace.clone(), path.to_string()));
                        }
                    }
                    _ => {}
                }
            }
            rules
        };

        Self {
            psr4: rules("psr-4"),
            psr0: rules("psr-0"),
        }
    }
}

/// A package as seen by one recipe operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Canonical `vendor/name`
    pub name: String,
    /// Operation the host performed
    pub operation: OperationKind,
    /// Human-facing version (`1.2.0`, `dev-main`, ...)
    pub pretty_version: String,
    /// Release date, when the host knows it
    pub release_date: Option<DateTime<Utc>>,
    /// Branch alias map (`dev-main` → `1.3.x-dev`)
    pub branch_aliases: BTreeMap<String, String>,
    /// Host package type (`library`, `symfony-bundle`, ...)
    pub package_type: Option<String>,
    /// Directory the host installed the package into
    pub install_path: Option<PathBuf>,
    /// Autoload rules, used to guess entry-point classes
    pub autoload: Autoload,
}

impl PackageRef {
    /// Creates a package reference with no optional metadata.
    pub fn new(
        name: impl Into<String>,
        operation: OperationKind,
        pretty_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            operation,
            pretty_version: pretty_version.into(),
            release_date: None,
            branch_aliases: BTreeMap::new(),
            package_type: None,
            install_path: None,
            autoload: Autoload::default(),
        }
    }

    /// Sets the release date.
    #[must_use]
    pub fn with_release_date(mut self, date: DateTime<Utc>) -> Self {
        self.release_date = Some(date);
        self
    }

    /// Adds a branch alias.
    #[must_use]
    pub fn with_branch_alias(mut self, branch: impl Into<String>, alias: impl Into<String>) -> Self {
        self.branch_aliases.insert(branch.into(), alias.into());
        self
    }

    /// Sets the host package type.
    #[must_use]
    pub fn with_package_type(mut self, package_type: impl Into<String>) -> Self {
        self.package_type = Some(package_type.into());
        self
    }

    /// Sets the install path.
    #[must_use]
    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(path.into());
        self
    }

    /// Sets the autoload rules.
    #[must_use]
    pub fn with_autoload(mut self, autoload: Autoload) -> Self {
        self.autoload = autoload;
        self
    }

    /// Version sent to the recipe server.
    ///
    /// Development branches (`dev-*`) are replaced by their branch alias, or by
    /// the alias of `dev-master` when the branch itself has none.
    #[must_use]
    pub fn query_version(&self) -> &str {
        if self.pretty_version.starts_with("dev-") {
            if let Some(alias) = self
                .branch_aliases
                .get(&self.pretty_version)
                .or_else(|| self.branch_aliases.get("dev-master"))
                .filter(|alias| !alias.is_empty())
            {
                return alias;
            }
        }
        &self.pretty_version
    }

    /// Batch query token: `vendor,name,<op><version>[,<unix timestamp>]`.
    #[must_use]
    pub fn query_token(&self) -> String {
        let mut token = format!(
            "{},{}{}",
            self.name.replace('/', ","),
            self.operation.letter(),
            self.query_version()
        );
        if let Some(date) = self.release_date {
            token.push_str(&format!(",{}", date.timestamp()));
        }
        token
    }
}

/// A file shipped inside a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeFile {
    /// File contents
    pub contents: String,
    /// Whether the copy should be executable
    #[serde(default)]
    pub executable: bool,
}

/// A recipe: the manifest of file edits for one package.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    /// Package name, also the marker name inside patched files
    pub name: String,
    /// Package version the recipe was applied for
    pub version: String,
    /// `configurator key → payload`, in server order
    pub manifest: Map<String, Value>,
    /// Files available to `copy-from-recipe`
    pub files: BTreeMap<String, RecipeFile>,
    /// Reference of the recipe in its repository
    pub git_ref: Option<String>,
    /// Human-readable origin (`acme/foo:1.0@github.com/...`)
    pub origin: Option<String>,
    /// Whether the recipe comes from a contributed source
    pub is_contrib: bool,
    /// Where the host installed the package
    pub package_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RecipeData {
    #[serde(default)]
    manifest: Map<String, Value>,
    #[serde(default)]
    files: BTreeMap<String, RecipeFile>,
    #[serde(default, rename = "ref")]
    git_ref: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    is_contrib: bool,
}

impl Recipe {
    /// Builds a recipe for `package` from a server manifest entry.
    ///
    /// The entry is either a full recipe object (`manifest`, `files`, `ref`,
    /// ...) or a bare manifest map.
    pub fn from_server(package: &PackageRef, entry: &Value) -> serde_json::Result<Self> {
        let data = if entry.get("manifest").is_some_and(Value::is_object) {
            serde_json::from_value::<RecipeData>(entry.clone())?
        } else {
            RecipeData {
                manifest: entry.as_object().cloned().unwrap_or_default(),
                ..RecipeData::default()
            }
        };

        Ok(Self {
            name: package.name.clone(),
            version: package.pretty_version.clone(),
            manifest: data.manifest,
            files: data.files,
            git_ref: data.git_ref,
            origin: data.origin,
            is_contrib: data.is_contrib,
            package_path: package.install_path.clone(),
        })
    }

    /// Builds a recipe from an explicit manifest, with no files.
    #[must_use]
    pub fn with_manifest(package: &PackageRef, manifest: Map<String, Value>) -> Self {
        Self {
            name: package.name.clone(),
            version: package.pretty_version.clone(),
            manifest,
            files: BTreeMap::new(),
            git_ref: None,
            origin: None,
            is_contrib: false,
            package_path: package.install_path.clone(),
        }
    }
}
