//! `rkit resolve`: print canonical requirement strings.

use anyhow::Result;
use clap::Args;

use super::CliConfig;
use crate::resolver::PackageResolver;

/// Resolve package aliases and version keywords.
///
/// ```bash
/// rkit resolve orm mailer:lts symfony/console:next
/// ```
#[derive(Args)]
pub struct ResolveCommand {
    /// Packages as `name`, `alias`, `name:version` or `name=version`
    #[arg(required = true)]
    packages: Vec<String>,
}

impl ResolveCommand {
    /// Resolves the arguments and prints one requirement per line.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let (_, downloader) = config.downloader().await?;
        let resolver = PackageResolver::new(downloader);
        for requirement in resolver.resolve(&self.packages).await? {
            println!("{requirement}");
        }
        Ok(())
    }
}
