//! Test utilities for recipe-kit
//!
//! Helpers shared by unit and integration tests: one-time logging setup, a
//! scripted HTTP transport for driving the downloader without a server, and
//! an in-memory recipe index for the resolver.
//!
//! Enabled for the crate's own tests and, through the `test-utils` feature,
//! for integration tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use recipe_kit::test_utils::ScriptedTransport;
//! use serde_json::json;
//!
//! let transport = ScriptedTransport::new();
//! transport.push_error("connection reset");
//! transport.push_json(200, json!({"orm": "doctrine/orm"}));
//! ```

use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::downloader::{HttpReply, HttpRequest, Transport, TransportError};
use crate::resolver::{RecipeIndex, VersionTable};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level`, that level is used;
/// otherwise `RUST_LOG` is honored, and without it logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<HttpReply, TransportError>>,
    requests: Vec<HttpRequest>,
}

/// [`Transport`] answering from a queue of scripted replies.
///
/// Clones share the same queue and request log, so a test can keep one
/// handle while the downloader owns another. A request arriving after the
/// queue is exhausted fails with a [`TransportError`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Result<HttpReply, TransportError>) {
        self.script.lock().unwrap().replies.push_back(reply);
    }

    /// Queues a JSON reply.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_json_with_headers(status, &[], body);
    }

    /// Queues a JSON reply with extra headers.
    pub fn push_json_with_headers(&self, status: u16, headers: &[(&str, &str)], body: Value) {
        self.push_raw(status, headers, &body.to_string());
    }

    /// Queues an empty reply with `status`.
    pub fn push_status(&self, status: u16) {
        self.push_raw(status, &[], "");
    }

    /// Queues a reply with a raw body.
    pub fn push_raw(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        self.push(Ok(HttpReply {
            status,
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), (*value).to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, message: &str) {
        self.push(Err(TransportError(message.to_string())));
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    /// Replies not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().replies.len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request.clone());
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(TransportError(format!("no scripted reply for {}", request.url))))
    }
}

/// In-memory [`RecipeIndex`] counting how often each table is fetched.
#[derive(Debug, Clone)]
pub struct StaticIndex {
    aliases: BTreeMap<String, String>,
    versions: Value,
    alias_fetches: Arc<AtomicUsize>,
    version_fetches: Arc<AtomicUsize>,
}

impl StaticIndex {
    /// Index serving `aliases` and the `/versions.json` body `versions`.
    #[must_use]
    pub fn new(aliases: &[(&str, &str)], versions: Value) -> Self {
        Self {
            aliases: aliases
                .iter()
                .map(|(alias, package)| ((*alias).to_string(), (*package).to_string()))
                .collect(),
            versions,
            alias_fetches: Arc::new(AtomicUsize::new(0)),
            version_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of alias table fetches, across clones.
    #[must_use]
    pub fn alias_fetches(&self) -> usize {
        self.alias_fetches.load(Ordering::SeqCst)
    }

    /// Number of version table fetches, across clones.
    #[must_use]
    pub fn version_fetches(&self) -> usize {
        self.version_fetches.load(Ordering::SeqCst)
    }
}

impl RecipeIndex for StaticIndex {
    async fn aliases(&self) -> Result<BTreeMap<String, String>> {
        self.alias_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.aliases.clone())
    }

    async fn versions(&self) -> Result<VersionTable> {
        self.version_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(VersionTable::from_json(&self.versions))
    }
}
