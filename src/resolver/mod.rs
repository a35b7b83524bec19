//! Resolution of user-supplied package arguments.
//!
//! Turns what a user types (`orm`, `mailer:^2.0`, `symfony/symfony=lts`) into
//! canonical requirement strings (`doctrine/orm`, `acme/mailer:^2.0`,
//! `symfony/symfony:^5.4`). Two tables published by the recipe server drive
//! the expansion:
//!
//! - the **alias table** (`/aliases.json`): short alias → `vendor/name`
//! - the **version table** (`/versions.json`): `splits` plus the versions the
//!   symbolic keywords `next`, `lts`, `previous` and `stable` stand for
//!
//! Both are fetched through a [`RecipeIndex`] at most once per resolver and
//! only when an argument needs them.
//!
//! # Resolution steps
//!
//! 1. Each argument is split on its first `:` (or, failing that, its first
//!    `=`) into a name token and a version token.
//! 2. Tokens without `/` are expanded through the alias table. A token that is
//!    not an alias must be a version constraint or a keyword, otherwise
//!    resolution fails with "did you mean" suggestions.
//! 3. Tokens are re-paired into names and versions
//!    ([`parse_name_version_pairs`]).
//! 4. Keyword versions are mapped through the version table.
//! 5. Results are deduplicated, keeping the first occurrence.

use crate::core::RecipeError;
use crate::version::{is_valid_constraint, is_version_keyword, parse_name_version_pairs};
use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::future::Future;
use tokio::sync::OnceCell;

/// Source of the alias and version tables.
///
/// Implemented by the downloader for real runs and by fixtures in tests.
pub trait RecipeIndex {
    /// Fetches the alias table: alias → canonical package name.
    fn aliases(&self) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send;

    /// Fetches the version table.
    fn versions(&self) -> impl Future<Output = Result<VersionTable>> + Send;
}

/// Versions the symbolic keywords stand for, plus the packages they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
    /// Packages with split release history; `None` when the table has no
    /// `splits` section, in which case keywords apply to every package.
    pub splits: Option<BTreeSet<String>>,
    /// Keyword → version (`lts` → `5.4`)
    pub keywords: BTreeMap<String, String>,
}

impl VersionTable {
    /// Reads a `/versions.json` body. Non-string keyword values are ignored.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let splits = value.get("splits").map(|splits| match splits {
            Value::Object(map) => map
                .iter()
                .filter(|(_, enabled)| !matches!(enabled, Value::Bool(false) | Value::Null))
                .map(|(name, _)| name.clone())
                .collect(),
            Value::Array(names) => {
                names.iter().filter_map(Value::as_str).map(str::to_string).collect()
            }
            _ => BTreeSet::new(),
        });

        let keywords = value
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| is_version_keyword(key))
                    .filter_map(|(key, version)| {
                        version.as_str().map(|version| (key.clone(), version.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            splits,
            keywords,
        }
    }

    /// Whether keywords are resolved for `package`.
    fn applies_to(&self, package: &str) -> bool {
        self.splits.as_ref().is_none_or(|splits| splits.contains(package))
    }

    /// Version suffix (`""`, `":raw"`, `":^5.4"`, `":^6.0@dev"`) for `package`.
    #[must_use]
    pub fn suffix(&self, package: &str, version: Option<&str>) -> String {
        let Some(version) = version.filter(|v| !v.is_empty()) else {
            return String::new();
        };
        if !self.applies_to(package) {
            return format!(":{version}");
        }

        let mapped = match version {
            "next" => self.keywords.get("next").map(|v| format!("^{v}@dev")),
            "lts" | "previous" | "stable" => self.keywords.get(version).map(|v| format!("^{v}")),
            _ => None,
        };
        format!(":{}", mapped.as_deref().unwrap_or(version))
    }
}

/// Resolves package arguments against a [`RecipeIndex`].
pub struct PackageResolver<I> {
    index: I,
    aliases: OnceCell<BTreeMap<String, String>>,
    versions: OnceCell<VersionTable>,
}

impl<I: RecipeIndex> PackageResolver<I> {
    /// Creates a resolver; no table is fetched until needed.
    pub fn new(index: I) -> Self {
        Self {
            index,
            aliases: OnceCell::new(),
            versions: OnceCell::new(),
        }
    }

    /// Resolves `arguments` into canonical, deduplicated requirement strings.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::AliasResolution`] for a bare token that is
    /// neither an alias nor a version, and propagates table fetch failures.
    pub async fn resolve(&self, arguments: &[String]) -> Result<Vec<String>> {
        let mut tokens = Vec::new();
        for argument in arguments {
            match argument.find(':').or_else(|| argument.find('=')) {
                Some(position) => {
                    tokens.push(argument[..position].to_string());
                    tokens.push(argument[position + 1..].to_string());
                }
                None => tokens.push(argument.clone()),
            }
        }

        let mut packages = Vec::with_capacity(tokens.len());
        for token in tokens {
            packages.push(self.expand_token(token).await?);
        }

        let mut seen = HashSet::new();
        let mut requires = Vec::new();
        for pair in parse_name_version_pairs(&packages) {
            let suffix = match pair.version.as_deref() {
                Some(version) if !version.is_empty() => {
                    self.version_table().await?.suffix(&pair.name, Some(version))
                }
                _ => String::new(),
            };
            let require = format!("{}{}", pair.name, suffix);
            if seen.insert(require.clone()) {
                requires.push(require);
            }
        }

        tracing::debug!("Resolved {:?} to {:?}", arguments, requires);
        Ok(requires)
    }

    async fn expand_token(&self, token: String) -> Result<String> {
        if token.contains('/') || token.is_empty() || is_platform_package(&token) {
            return Ok(token);
        }

        let aliases = self.alias_table().await?;
        if let Some(package) = aliases.get(&token) {
            return Ok(package.clone());
        }
        if is_version_keyword(&token) || is_valid_constraint(&token) {
            return Ok(token);
        }

        Err(RecipeError::AliasResolution {
            message: alternatives_message(&token, aliases),
            argument: token,
        }
        .into())
    }

    async fn alias_table(&self) -> Result<&BTreeMap<String, String>> {
        self.aliases
            .get_or_try_init(|| async {
                tracing::debug!("Fetching alias table");
                self.index.aliases().await
            })
            .await
    }

    async fn version_table(&self) -> Result<&VersionTable> {
        self.versions
            .get_or_try_init(|| async {
                tracing::debug!("Fetching version table");
                self.index.versions().await
            })
            .await
    }
}

/// `php`, `ext-*` and `lib-*` name the runtime, never a recipe.
fn is_platform_package(token: &str) -> bool {
    token == "php" || token.starts_with("ext-") || token.starts_with("lib-")
}

/// Renders the "did you mean" text for an unknown alias.
///
/// An alias is suggested when its edit distance to `argument` is at most a
/// third of the argument's length, or when it contains the argument.
#[must_use]
pub fn alternatives_message(argument: &str, aliases: &BTreeMap<String, String>) -> String {
    let mut alternatives: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (alias, package) in aliases {
        let distance = strsim::levenshtein(argument, alias);
        if distance <= argument.len() / 3 || alias.contains(argument) {
            alternatives.entry(package.as_str()).or_default().push(alias.as_str());
        }
    }

    if alternatives.is_empty() {
        return format!("Could not parse version constraint \"{argument}\".");
    }

    let mut message = format!("\"{argument}\" is not a valid alias. ");
    if alternatives.len() == 1 {
        message.push_str("Did you mean this:\n");
    } else {
        message.push_str("Did you mean one of these:\n");
    }
    for (package, aliases) in alternatives {
        message.push_str(&format!(
            "  \"{}\", supported aliases: \"{}\"\n",
            package,
            aliases.join("\", \"")
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StaticIndex;
    use serde_json::json;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn index() -> StaticIndex {
        StaticIndex::new(
            &[("orm", "doctrine/orm"), ("doctrine", "doctrine/orm"), ("mailer", "acme/mailer")],
            json!({
                "splits": {"symfony/symfony": true, "symfony/console": true},
                "next": "6.1",
                "lts": "5.4",
                "previous": "5.3",
                "stable": "6.0"
            }),
        )
    }

    #[tokio::test]
    async fn test_aliases_and_explicit_versions() {
        let resolver = PackageResolver::new(index());
        let resolved = resolver
            .resolve(&args(&["orm", "mailer:^2.0", "acme/log=1.0", "acme/cache"]))
            .await
            .unwrap();
        assert_eq!(resolved, vec!["doctrine/orm", "acme/mailer:^2.0", "acme/log:1.0", "acme/cache"]);
    }

    #[tokio::test]
    async fn test_keywords_for_split_packages() {
        let resolver = PackageResolver::new(index());
        let resolved = resolver
            .resolve(&args(&[
                "symfony/symfony:lts",
                "symfony/console:next",
                "symfony/symfony:stable",
                "acme/mailer:lts",
            ]))
            .await
            .unwrap();
        assert_eq!(
            resolved,
            vec![
                "symfony/symfony:^5.4",
                "symfony/console:^6.1@dev",
                "symfony/symfony:^6.0",
                "acme/mailer:lts",
            ]
        );
    }

    #[tokio::test]
    async fn test_keyword_without_splits_section() {
        let resolver = PackageResolver::new(StaticIndex::new(&[], json!({"lts": "5.4"})));
        let resolved = resolver.resolve(&args(&["symfony/symfony:lts"])).await.unwrap();
        assert_eq!(resolved, vec!["symfony/symfony:^5.4"]);
    }

    #[tokio::test]
    async fn test_deduplicates_in_first_occurrence_order() {
        let resolver = PackageResolver::new(index());
        let resolved =
            resolver.resolve(&args(&["orm", "mailer", "doctrine", "doctrine/orm"])).await.unwrap();
        assert_eq!(resolved, vec!["doctrine/orm", "acme/mailer"]);
    }

    #[tokio::test]
    async fn test_version_as_separate_argument() {
        let resolver = PackageResolver::new(index());
        let resolved = resolver.resolve(&args(&["mailer", "^3.0", "orm"])).await.unwrap();
        assert_eq!(resolved, vec!["acme/mailer:^3.0", "doctrine/orm"]);
    }

    #[tokio::test]
    async fn test_unknown_alias_suggests_package() {
        let resolver = PackageResolver::new(index());
        let err = resolver.resolve(&args(&["dokctrine"])).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("\"dokctrine\" is not a valid alias. Did you mean this:\n"));
        assert!(message.contains("\"doctrine/orm\", supported aliases: \"doctrine\""));
        assert!(matches!(
            err.downcast_ref::<RecipeError>(),
            Some(RecipeError::AliasResolution { argument, .. }) if argument == "dokctrine"
        ));
    }

    #[tokio::test]
    async fn test_unknown_alias_without_candidates() {
        let resolver = PackageResolver::new(index());
        let err = resolver.resolve(&args(&["zzzzzz"])).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not parse version constraint \"zzzzzz\".");
    }

    #[tokio::test]
    async fn test_tables_fetched_once_and_lazily() {
        let index = index();
        let resolver = PackageResolver::new(index.clone());

        resolver.resolve(&args(&["acme/log"])).await.unwrap();
        assert_eq!(index.alias_fetches(), 0);
        assert_eq!(index.version_fetches(), 0);

        resolver.resolve(&args(&["orm:^2.0"])).await.unwrap();
        resolver.resolve(&args(&["mailer:lts"])).await.unwrap();
        assert_eq!(index.alias_fetches(), 1);
        assert_eq!(index.version_fetches(), 1);
    }

    #[tokio::test]
    async fn test_platform_packages_skip_alias_lookup() {
        let index = index();
        let resolver = PackageResolver::new(index.clone());
        assert_eq!(resolver.resolve(&args(&["ext-intl"])).await.unwrap(), vec!["ext-intl"]);
        assert_eq!(resolver.resolve(&args(&["php"])).await.unwrap(), vec!["php"]);
        assert_eq!(index.alias_fetches(), 0);
    }

    #[test]
    fn test_alternatives_message_groups_by_package() {
        let aliases: BTreeMap<String, String> = [
            ("mail", "acme/mailer"),
            ("mailer", "acme/mailer"),
            ("mailgun", "acme/mailgun"),
        ]
        .into_iter()
        .map(|(a, p)| (a.to_string(), p.to_string()))
        .collect();

        let message = alternatives_message("mail", &aliases);
        assert_eq!(
            message,
            "\"mail\" is not a valid alias. Did you mean one of these:\n  \
             \"acme/mailer\", supported aliases: \"mail\", \"mailer\"\n  \
             \"acme/mailgun\", supported aliases: \"mailgun\"\n"
        );
    }

    #[test]
    fn test_version_table_from_json() {
        let table = VersionTable::from_json(&json!({
            "splits": {"symfony/console": true},
            "lts": "5.4",
            "dev-name": "ignored"
        }));
        assert!(table.applies_to("symfony/console"));
        assert!(!table.applies_to("acme/mailer"));
        assert_eq!(table.keywords.len(), 1);
        assert_eq!(table.suffix("symfony/console", Some("previous")), ":previous");
    }
}
