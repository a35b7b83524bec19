//! Version-constraint grammar used when resolving user-supplied arguments.
//!
//! Recipe arguments are written the way the host package manager accepts
//! them: `vendor/name`, `vendor/name:^1.2`, `alias=~3.0`, `name lts`, ...
//! This module answers two questions about such tokens without knowing
//! anything about the recipe server:
//!
//! - does a token parse as a version constraint ([`validate_constraint`])?
//! - how do a flat list of tokens pair up into names and versions
//!   ([`parse_name_version_pairs`])?
//!
//! # Supported constraints
//!
//! - **Exact versions**: `1.0.0`, `v2.1`, `1.0.0-beta2`, `1.0.x-dev`
//! - **Wildcards**: `*`, `1.*`, `2.1.x`
//! - **Operators**: `^1.2`, `~3.0`, `>=1.0`, `<2.0`, `!=1.5`, `==1.0`
//! - **Combinations**: `>=1.0 <2.0`, `>=1.0,<2.0`, `^1.0 || ^2.0`, `^1.0|^2.0`
//! - **Hyphen ranges**: `1.0 - 2.0`
//! - **Branches**: `dev-main`, `dev-feature/login`
//! - **Stability flags**: `^1.0@dev`, `@beta`
//!
//! # Symbolic keywords
//!
//! `next`, `lts`, `previous` and `stable` are not constraints by themselves;
//! the resolver maps them through the recipe server's version table. See
//! [`is_version_keyword`].

use crate::core::RecipeError;
use regex::Regex;
use std::sync::LazyLock;

/// Keywords resolved through the version table instead of parsed.
pub const VERSION_KEYWORDS: [&str; 4] = ["next", "lts", "previous", "stable"];

static STABILITY_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([^,\s]*?)@(stable|rc|beta|alpha|dev)$").expect("stability pattern is valid")
});

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        v?\d+(\.(\d+|\*|x)){0,3}                                   # numeric part
        ([._-]?(stable|beta|b|rc|alpha|a|patch|pl|p)([.-]?\d+)*)?   # pre-release
        ([.-]?dev)?                                                 # dev suffix
        $",
    )
    .expect("version pattern is valid")
});

static WILDCARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?[x*](\.[x*])*$").expect("wildcard pattern is valid")
});

static OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\^|~|>=|<=|<>|!=|==|>|<|=)?\s*(.+)$").expect("operator pattern is valid")
});

static HYPHEN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+-\s+(\S+)$").expect("hyphen range pattern is valid")
});

static PAIR_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^=: ]+)[=: ](.*)$").expect("pair separator pattern is valid")
});

/// One element of a parsed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVersionPair {
    /// Package name or alias
    pub name: String,
    /// Version token following the name, if any
    pub version: Option<String>,
}

/// Returns `true` for the symbolic version keywords (`next`, `lts`, ...).
#[must_use]
pub fn is_version_keyword(token: &str) -> bool {
    VERSION_KEYWORDS.contains(&token)
}

/// Returns `true` when `constraint` parses as a version constraint.
#[must_use]
pub fn is_valid_constraint(constraint: &str) -> bool {
    validate_constraint(constraint).is_ok()
}

/// Validates a full constraint string.
///
/// # Errors
///
/// Returns [`RecipeError::InvalidVersionConstraint`] when any alternative or
/// any conjunctive part does not parse.
pub fn validate_constraint(constraint: &str) -> Result<(), RecipeError> {
    let invalid = || RecipeError::InvalidVersionConstraint {
        constraint: constraint.to_string(),
    };

    let trimmed = constraint.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let alternatives: Vec<&str> = trimmed.split("||").flat_map(|part| part.split('|')).collect();
    for alternative in alternatives {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return Err(invalid());
        }

        if let Some(captures) = HYPHEN_RANGE.captures(alternative) {
            if is_valid_version(&captures[1]) && is_valid_version(&captures[2]) {
                continue;
            }
        }

        for part in conjunctive_parts(alternative) {
            if !is_valid_single(&part) {
                return Err(invalid());
            }
        }
    }

    Ok(())
}

/// Splits an AND-constraint on commas and whitespace, gluing a bare operator
/// to the version that follows it (`>= 1.0` is one part).
fn conjunctive_parts(alternative: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut pending_operator: Option<String> = None;

    for piece in alternative.split(|c: char| c == ',' || c.is_whitespace()) {
        if piece.is_empty() {
            continue;
        }
        if matches!(piece, "^" | "~" | ">=" | "<=" | "<>" | "!=" | "==" | ">" | "<" | "=") {
            pending_operator = Some(piece.to_string());
            continue;
        }
        match pending_operator.take() {
            Some(operator) => parts.push(format!("{operator}{piece}")),
            None => parts.push(piece.to_string()),
        }
    }

    if let Some(operator) = pending_operator {
        parts.push(operator);
    }
    parts
}

fn is_valid_single(part: &str) -> bool {
    let part = match STABILITY_FLAG.captures(part) {
        Some(captures) => {
            let rest = captures.get(1).map_or("", |m| m.as_str());
            if rest.is_empty() {
                return true;
            }
            rest.to_string()
        }
        None => part.to_string(),
    };

    if WILDCARD.is_match(&part) {
        return true;
    }
    if let Some(branch) = part.strip_prefix("dev-") {
        return !branch.is_empty();
    }

    let Some(captures) = OPERATOR.captures(&part) else {
        return false;
    };
    let version = captures.get(2).map_or("", |m| m.as_str()).trim();
    if version.starts_with("dev-") {
        return version.len() > 4;
    }
    is_valid_version(version)
}

fn is_valid_version(version: &str) -> bool {
    VERSION.is_match(version)
}

/// Pairs a flat token list into names and optional versions.
///
/// A token of the form `name=version`, `name:version` or `name version` is
/// split in place. Otherwise a token followed by a token without `/` takes
/// that token as its version: `["acme/mailer", "^1.0", "acme/log"]` gives
/// `acme/mailer` at `^1.0` and `acme/log` with no version.
#[must_use]
pub fn parse_name_version_pairs(tokens: &[String]) -> Vec<NameVersionPair> {
    let mut pairs = Vec::new();
    let mut index = 0;

    while index < tokens.len() {
        let mut pair = PAIR_SEPARATOR
            .replace(tokens[index].trim(), "$1 $2")
            .into_owned();

        if !pair.contains(' ') {
            if let Some(next) = tokens.get(index + 1) {
                if !next.contains('/') {
                    pair.push(' ');
                    pair.push_str(next);
                    index += 1;
                }
            }
        }

        match pair.split_once(' ') {
            Some((name, version)) if !name.is_empty() => pairs.push(NameVersionPair {
                name: name.to_string(),
                version: Some(version.to_string()),
            }),
            _ => pairs.push(NameVersionPair {
                name: pair,
                version: None,
            }),
        }
        index += 1;
    }

    pairs
}
