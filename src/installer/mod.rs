//! Applying recipes for a set of package operations.
//!
//! The [`RecipeInstaller`] ties the pieces together for one run:
//!
//! 1. **Fetch**: every operation is sent to the recipe server in one batch
//!    query ([`Downloader::fetch_manifests`]).
//! 2. **Configure**: installed packages get their recipe applied, removed
//!    packages get it reverted ([`Configurator`]).
//! 3. **Record**: the recipe lock is updated and written once at the end.
//!
//! Bundle packages (`symfony-bundle`) the server has no recipe for still get
//! registered: a `bundles` manifest is synthesized from the class guessed out
//! of their autoload rules (see [`bundle_classes`]).
//!
//! `sync-recipes` reuses the same path for packages that are installed but
//! missing from the lock ([`RecipeInstaller::sync_recipes`]).
//!
//! # Partial application
//!
//! Operations are applied in order and nothing is rolled back. When one
//! fails, the lock still records the operations that completed before it and
//! the error is returned.

pub mod bundle_classes;
pub mod host;

pub use host::{HostLock, InstalledRepository};

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::Path;

use crate::configurator::{Configurator, ConfiguratorKind};
use crate::constants::BUNDLE_PACKAGE_TYPE;
use crate::core::RecipeError;
use crate::downloader::{Downloader, RecipeBatch, Transport};
use crate::lockfile::{Lock, LockEntry};
use crate::models::{OperationKind, PackageRef, Recipe};

/// What one [`RecipeInstaller::apply`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Packages whose recipe was applied
    pub configured: Vec<String>,
    /// Packages whose recipe was reverted
    pub unconfigured: Vec<String>,
    /// Packages whose lock entry was refreshed
    pub updated: Vec<String>,
    /// Packages recorded without any recipe
    pub without_recipe: Vec<String>,
}

impl ApplyReport {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configured.is_empty()
            && self.unconfigured.is_empty()
            && self.updated.is_empty()
            && self.without_recipe.is_empty()
    }
}

/// Applies recipes for package operations and keeps the lock in sync.
pub struct RecipeInstaller<T> {
    downloader: Downloader<T>,
    configurator: Configurator,
    lock: Lock,
}

impl<T: Transport> RecipeInstaller<T> {
    /// Creates an installer; `lock` is written back to its own path.
    pub fn new(downloader: Downloader<T>, configurator: Configurator, lock: Lock) -> Self {
        Self {
            downloader,
            configurator,
            lock,
        }
    }

    /// The recipe lock as of the last operation.
    #[must_use]
    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// The downloader used for recipe queries.
    #[must_use]
    pub fn downloader(&self) -> &Downloader<T> {
        &self.downloader
    }

    /// Fetches recipes for `operations`, applies them and writes the lock.
    ///
    /// # Errors
    ///
    /// Returns the fetch error before anything is touched, or the first
    /// configurator error (earlier operations stay applied and recorded).
    pub async fn apply(&mut self, operations: &[PackageRef]) -> Result<ApplyReport> {
        if operations.is_empty() {
            return Ok(ApplyReport::default());
        }

        let batch = self.downloader.fetch_manifests(operations).await?;
        report_vulnerabilities(&batch);

        let mut report = ApplyReport::default();
        let outcome = operations
            .iter()
            .try_for_each(|package| self.apply_one(package, &batch, &mut report));
        let saved = self.lock.save();
        outcome?;
        saved?;
        Ok(report)
    }

    /// Installs the recipes of locked packages missing from the recipe lock.
    ///
    /// `host` lists the packages the host locked; with `force` every one of
    /// them is reinstalled, otherwise only those without a lock entry. Each
    /// must be present in `installed`.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::MissingInstalledPackage`] before any request
    /// or file change when a pending package is not installed, otherwise the
    /// errors of [`RecipeInstaller::apply`].
    pub async fn sync_recipes(
        &mut self,
        host: &HostLock,
        installed: &InstalledRepository,
        force: bool,
    ) -> Result<ApplyReport> {
        let pending: Vec<&String> =
            host.packages.iter().filter(|name| force || !self.lock.has(name)).collect();
        if pending.is_empty() {
            tracing::info!("Every locked package already has its recipe");
            return Ok(ApplyReport::default());
        }

        let operations = pending
            .into_iter()
            .map(|name| {
                installed
                    .find(name)
                    .map(|package| PackageRef {
                        operation: OperationKind::Install,
                        ..package.clone()
                    })
                    .ok_or_else(|| RecipeError::MissingInstalledPackage {
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Syncing recipes of {} package(s)", operations.len());
        self.apply(&operations).await
    }

    fn apply_one(
        &mut self,
        package: &PackageRef,
        batch: &RecipeBatch,
        report: &mut ApplyReport,
    ) -> Result<()> {
        let recipe = match batch.manifests.get(&package.name) {
            Some(entry) => Some(
                Recipe::from_server(package, entry)
                    .with_context(|| format!("Invalid recipe for {}", package.name))?,
            ),
            None => synthesize_bundle_recipe(package),
        };

        match package.operation {
            OperationKind::Install => {
                let git_ref = match &recipe {
                    Some(recipe) => {
                        if let Some(origin) = &recipe.origin {
                            tracing::info!("Configuring {}", origin);
                        }
                        self.configurator.install(recipe)?;
                        report.configured.push(package.name.clone());
                        recipe.git_ref.clone()
                    }
                    None => {
                        report.without_recipe.push(package.name.clone());
                        None
                    }
                };
                self.lock.add(&package.name, LockEntry::new(&package.pretty_version, git_ref));
            }
            OperationKind::Update => {
                let git_ref = recipe
                    .and_then(|recipe| recipe.git_ref)
                    .or_else(|| self.lock.get(&package.name).and_then(|entry| entry.git_ref.clone()));
                self.lock.add(&package.name, LockEntry::new(&package.pretty_version, git_ref));
                report.updated.push(package.name.clone());
            }
            OperationKind::Uninstall => {
                if let Some(recipe) = &recipe {
                    tracing::info!("Unconfiguring {}", recipe.name);
                    self.configurator.unconfigure(recipe)?;
                    report.unconfigured.push(package.name.clone());
                }
                self.lock.remove(&package.name);
            }
        }
        Ok(())
    }
}

/// `bundles` recipe for a bundle package the server has no recipe for.
///
/// Installs register the first guessed class whose file exists; uninstalls
/// unregister every candidate.
fn synthesize_bundle_recipe(package: &PackageRef) -> Option<Recipe> {
    if package.package_type.as_deref() != Some(BUNDLE_PACKAGE_TYPE) {
        return None;
    }

    let install_path = package.install_path.as_deref();
    let exists = |relative: &Path| install_path.is_some_and(|root| root.join(relative).is_file());
    let all = package.operation == OperationKind::Uninstall;
    let classes = bundle_classes::guess_entry_point_classes(&package.autoload, all, &exists);
    if classes.is_empty() {
        return None;
    }

    tracing::debug!("Synthesizing bundle registration for {}", package.name);
    let bundles: Map<String, Value> =
        classes.into_iter().map(|class| (class, json!(["all"]))).collect();
    let mut manifest = Map::new();
    manifest.insert(ConfiguratorKind::Bundles.key().to_string(), Value::Object(bundles));
    Some(Recipe::with_manifest(package, manifest))
}

fn report_vulnerabilities(batch: &RecipeBatch) {
    for (name, advisories) in &batch.vulnerabilities {
        for advisory in advisories {
            let title = advisory.get("title").and_then(Value::as_str);
            let link = advisory.get("link").and_then(Value::as_str);
            match (title, link) {
                (Some(title), Some(link)) => tracing::warn!("{}: {} ({})", name, title, link),
                (Some(title), None) => tracing::warn!("{}: {}", name, title),
                _ => tracing::warn!("{} has a known vulnerability: {}", name, advisory),
            }
        }
    }
}
