//! On-disk cache of recipe server responses.
//!
//! One JSON file per request path, stored under a directory derived from the
//! endpoint so that two endpoints never share entries:
//!
//! ```text
//! <cache_dir>/repo/https---recipes.example.org/
//!   p-acme-mailer-i1.0.0.json
//!   aliases.json.json
//!   p-acme-console-i1.4.0-acme-debug-bundle-i3.2.0-ac-<sha256>.json
//! ```
//!
//! Batch paths run up to 1000 bytes, past the file name limit. Stems longer
//! than [`MAX_STEM_BYTES`] are cut to a readable prefix followed by the
//! SHA-256 of the full key.
//!
//! Entries are never expired here; freshness is checked with conditional
//! requests by the downloader.

use super::response::Response;
use crate::utils::fs::{ensure_dir, safe_write};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Longest file stem written as is.
pub const MAX_STEM_BYTES: usize = 120;

/// Readable part kept in front of the digest of a long key.
const HASHED_PREFIX_BYTES: usize = 48;

/// Response cache for one endpoint.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Cache for `endpoint` rooted at `cache_root`.
    pub fn new(cache_root: &Path, endpoint: &str) -> Self {
        Self {
            dir: cache_root.join("repo").join(sanitize_endpoint(endpoint)),
        }
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the entry for `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    /// Reads the entry for `key`.
    ///
    /// A missing or unreadable entry is a miss, never an error: the cache only
    /// ever saves a request.
    pub fn read(&self, key: &str) -> Option<Response> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stores `response` under `key`.
    pub fn write(&self, key: &str, response: &Response) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(key);
        let content = serde_json::to_string(response).context("Failed to encode cache entry")?;
        safe_write(&path, &content)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;
        tracing::debug!("Cached {} at {}", key, path.display());
        Ok(())
    }
}

/// Endpoint URL → directory name: lowercased, `[^a-z0-9.]` → `-`.
fn sanitize_endpoint(endpoint: &str) -> String {
    endpoint
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' { c } else { '-' })
        .collect()
}

/// Request path → file stem: lowercased, `[^a-z0-9._-]` → `-`, hashed past
/// [`MAX_STEM_BYTES`].
fn file_stem(key: &str) -> String {
    let stem = sanitize_key(key);
    if stem.len() <= MAX_STEM_BYTES {
        return stem;
    }
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}-{digest}", &stem[..HASHED_PREFIX_BYTES])
}

fn sanitize_key(key: &str) -> String {
    key.to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
