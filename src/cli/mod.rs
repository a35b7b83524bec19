//! Command-line interface for recipe-kit.
//!
//! The `rkit` binary exposes the two operations a user runs by hand:
//!
//! - `resolve`: expands package aliases and version keywords into the
//!   requirement strings the host package manager understands;
//! - `sync-recipes`: applies the recipes of installed packages missing from
//!   the recipe lock.
//!
//! # Global options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: global config file (`RECIPES_CONFIG_PATH`)
//! - `--project-dir` / `-d`: project root, current directory by default
//!
//! Logs go to stderr; command results go to stdout.

mod resolve;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{DownloaderConfig, GlobalConfig, ProjectConfig, process_env};
use crate::constants::CONFIG_PATH_ENV;
use crate::downloader::{Downloader, ReqwestTransport};

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter; `None` leaves `RUST_LOG` in charge
    pub log_level: Option<String>,

    /// Global config file overriding `RECIPES_CONFIG_PATH`
    pub config_path: Option<String>,

    /// Project root
    pub project_dir: PathBuf,
}

impl CliConfig {
    /// Environment lookup with the command-line overrides applied.
    #[must_use]
    pub fn env(&self, name: &str) -> Option<String> {
        if name == CONFIG_PATH_ENV {
            if let Some(path) = &self.config_path {
                return Some(path.clone());
            }
        }
        process_env(name)
    }

    /// Installs the tracing subscriber; later calls are ignored.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Project metadata and a downloader configured for it.
    pub async fn downloader(&self) -> Result<(ProjectConfig, Downloader<ReqwestTransport>)> {
        let env = |name: &str| self.env(name);
        let project = ProjectConfig::load(&self.project_dir)?;
        let global = GlobalConfig::load(&env).await?;
        let config = DownloaderConfig::resolve(&project, &global, &env);
        tracing::debug!("Using recipe endpoint {}", config.endpoint);
        Ok((project, Downloader::from_config(&config)?))
    }

    /// The project root.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

#[derive(Parser)]
#[command(
    name = "rkit",
    about = "Apply and revert vendor recipes for installed packages",
    version,
    long_about = "rkit fetches recipes (marker-delimited file edits) for packages and applies them to a project, keeping a lock of what was applied."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom global configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Project root holding `composer.json`.
    #[arg(short = 'd', long, global = true, default_value = ".")]
    project_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve package aliases and version keywords
    Resolve(resolve::ResolveCommand),

    /// Install recipes of packages missing from the recipe lock
    #[command(name = "sync-recipes", alias = "fix-recipes")]
    SyncRecipes(sync::SyncRecipesCommand),
}

impl Cli {
    /// Runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Settings for the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            project_dir: self.project_dir.clone(),
        }
    }

    /// Runs the selected command with explicit settings.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&config).await,
            Commands::SyncRecipes(cmd) => cmd.execute(&config).await,
        }
    }
}
