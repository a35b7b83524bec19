//! Guessing the bundle class of a package from its autoload rules.
//!
//! A bundle package without a recipe still has to be registered. Its class
//! is derived from each autoload namespace: `Acme\MailerBundle` gives
//! `Acme\MailerBundle\AcmeMailerBundle`, while `Symfony\Bundle\MonologBundle`
//! gives `Symfony\Bundle\MonologBundle\MonologBundle` (the vendor prefix is
//! skipped for `Symfony` and when the last segment already starts with it).

use std::path::Path;

use crate::models::Autoload;

/// Candidate entry-point classes for a package.
///
/// PSR-4 rules are tried before PSR-0 rules. Unless `all` is set, the first
/// class whose file exists according to `exists` is returned alone; when no
/// file exists, or with `all`, every candidate is returned. `exists` receives
/// paths relative to the package root.
#[must_use]
pub fn guess_entry_point_classes(
    autoload: &Autoload,
    all: bool,
    exists: &dyn Fn(&Path) -> bool,
) -> Vec<String> {
    let rules = autoload
        .psr4
        .iter()
        .map(|rule| (rule, true))
        .chain(autoload.psr0.iter().map(|rule| (rule, false)));

    let mut classes = Vec::new();
    for ((namespace, path), psr4) in rules {
        let Some(class) = class_for_namespace(namespace) else {
            continue;
        };
        if !all && exists(Path::new(&class_file(&class, path, psr4))) {
            return vec![class];
        }
        classes.push(class);
    }
    classes
}

/// Bundle class conventionally declared in `namespace`.
fn class_for_namespace(namespace: &str) -> Option<String> {
    let namespace = namespace.trim_matches('\\');
    let parts: Vec<&str> = namespace.split('\\').collect();
    let vendor = *parts.first()?;
    let last = *parts.last()?;
    if last.is_empty() {
        return None;
    }

    let mut class = format!("{namespace}\\");
    if vendor != "Symfony" && !last.starts_with(vendor) {
        class.push_str(vendor);
    }
    class.push_str(last);
    Some(class)
}

/// File declaring `class` under autoload `path`, relative to the package root.
fn class_file(class: &str, path: &str, psr4: bool) -> String {
    let parts: Vec<&str> = class.split('\\').collect();
    let short_name = parts.last().copied().unwrap_or(class);

    let mut file = path.trim_end_matches('/').to_string();
    if !file.is_empty() {
        file.push('/');
    }
    if !psr4 {
        file.push_str(&parts[..parts.len().saturating_sub(1)].join("/"));
        file.push('/');
    }
    file.push_str(short_name);
    file.push_str(".php");
    file
}
