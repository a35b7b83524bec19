//! `rkit sync-recipes`: install recipes for packages that missed them.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::configurator::Configurator;
use crate::installer::{ApplyReport, HostLock, InstalledRepository, RecipeInstaller};
use crate::lockfile::Lock;

/// Install recipes of packages missing from the recipe lock.
#[derive(Args)]
pub struct SyncRecipesCommand {
    /// Reinstall the recipes of every locked package
    #[arg(long)]
    force: bool,
}

impl SyncRecipesCommand {
    /// Syncs recipes for the project in `config`.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let root = config.project_dir();
        let env = |name: &str| config.env(name);

        let host = HostLock::load(root)?;
        let installed = InstalledRepository::load(root)?;
        let (project, downloader) = config.downloader().await?;
        let lock = Lock::load(&Lock::default_path(root, &env))?;
        let configurator = Configurator::new(project.options(&env));

        let mut installer = RecipeInstaller::new(downloader, configurator, lock);
        let report = installer.sync_recipes(&host, &installed, self.force).await?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &ApplyReport) {
    if report.is_empty() {
        println!("{}", "Nothing to sync".green());
        return;
    }
    for name in &report.configured {
        println!("  {} {}", "configured".green(), name);
    }
    for name in &report.without_recipe {
        println!("  {} {}", "no recipe".dimmed(), name);
    }
    println!(
        "{} {} recipe(s) applied",
        "✓".green().bold(),
        report.configured.len()
    );
}
