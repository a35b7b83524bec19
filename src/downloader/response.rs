//! Decoded recipe server responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An immutable HTTP response: status, lowercased headers and JSON body.
///
/// The serialized form (`{"body", "headers", "statusCode"}`) is what the
/// response cache stores on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    body: Value,
    headers: BTreeMap<String, String>,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

impl Response {
    /// Creates a response; header names are lowercased.
    pub fn new<K, V>(body: Value, headers: impl IntoIterator<Item = (K, V)>, status_code: u16) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            body,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
                .collect(),
            status_code,
        }
    }

    /// The "no recipe available" response: status 404, null body.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            body: Value::Null,
            headers: BTreeMap::new(),
            status_code: 404,
        }
    }

    /// Same body and headers with another status (304 for revalidated hits).
    #[must_use]
    pub fn with_status(&self, status_code: u16) -> Self {
        Self {
            status_code,
            ..self.clone()
        }
    }

    /// Decoded JSON body; `Null` when the server sent nothing usable.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Header value, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// All headers, keyed by lowercased name.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Whether the server allows this response to be cached.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.header("last-modified").is_some()
    }
}
