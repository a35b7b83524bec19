//! Resilient client for the recipe server.
//!
//! The downloader turns package operations into recipe manifests and serves
//! the alias and version tables used by the resolver. Every request goes
//! through [`Downloader::get`], which layers three behaviours over a plain
//! [`Transport`]:
//!
//! 1. **Conditional revalidation**: a cached response carrying
//!    `last-modified` is revalidated with `If-Modified-Since`; a `304` reuses
//!    the cached body.
//! 2. **Bounded retries**: transport errors, unexpected statuses and
//!    undecodable bodies are retried under a [`RetryPolicy`]. A `404` is
//!    definitive and becomes an empty response.
//! 3. **Degraded mode**: when every attempt fails and a cached copy exists,
//!    the cached copy is served and a warning is logged once per downloader.
//!
//! Requests are strictly sequential; batch segments are fetched one after
//! another.
//!
//! # Batch queries
//!
//! Operations are encoded as `vendor,name,<op><version>[,<timestamp>]` tokens
//! (see [`PackageRef::query_token`]) and packed into `;`-joined segments of at
//! most [`MAX_BATCH_SEGMENT_BYTES`] bytes, each fetched as `/p/<segment>`.

pub mod cache;
pub mod response;
pub mod transport;

pub use cache::ResponseCache;
pub use response::Response;
pub use transport::{HttpReply, HttpRequest, ReqwestTransport, Transport, TransportError};

use crate::config::DownloaderConfig;
use crate::constants::{
    ALLOW_CONTRIB_HEADER, MAX_BATCH_SEGMENT_BYTES, PROJECT_HEADER, REPOSITORIES_HEADER,
    SESSION_HEADER,
};
use crate::core::RecipeError;
use crate::models::PackageRef;
use crate::resolver::{RecipeIndex, VersionTable};
use crate::utils::RetryPolicy;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Manifests and vulnerabilities merged from every batch segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeBatch {
    /// Package name → raw recipe entry
    pub manifests: BTreeMap<String, Value>,
    /// Package name → advisories reported by the server
    pub vulnerabilities: BTreeMap<String, Vec<Value>>,
}

/// Outcome of one successful attempt.
enum Fetched {
    Fresh(Response),
    NotModified,
    NotFound,
}

/// Client for one recipe endpoint.
pub struct Downloader<T> {
    transport: T,
    endpoint: String,
    session: String,
    project_id: Option<String>,
    allow_contrib: bool,
    repositories: Vec<String>,
    cache: ResponseCache,
    retry: RetryPolicy,
    degraded: AtomicBool,
    degraded_warnings: AtomicUsize,
}

impl Downloader<ReqwestTransport> {
    /// Downloader over HTTP, trusting the configured CA bundle.
    pub fn from_config(config: &DownloaderConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.cafile.as_deref())?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Downloader<T> {
    /// Downloader over an explicit transport.
    pub fn new(transport: T, config: &DownloaderConfig) -> Self {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        Self {
            transport,
            cache: ResponseCache::new(&config.cache_dir, &endpoint),
            endpoint,
            session: uuid::Uuid::new_v4().simple().to_string(),
            project_id: config.project_id.clone(),
            allow_contrib: config.allow_contrib,
            repositories: config.repositories.clone(),
            retry: RetryPolicy::default(),
            degraded: AtomicBool::new(false),
            degraded_warnings: AtomicUsize::new(0),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint without trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Session token sent with every request of this downloader.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session
    }

    /// The response cache.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Whether stale cached data has been served.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Number of degraded-mode warnings emitted; at most one.
    #[must_use]
    pub fn degraded_warnings(&self) -> usize {
        self.degraded_warnings.load(Ordering::SeqCst)
    }

    /// Fetches the recipes for `packages`.
    ///
    /// Segments answered with an empty body (such as a `404`) contribute
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::TransportFailure`] when a segment cannot be
    /// fetched and has no cached copy.
    pub async fn fetch_manifests(&self, packages: &[PackageRef]) -> Result<RecipeBatch> {
        let tokens: Vec<String> = packages.iter().map(PackageRef::query_token).collect();
        let mut batch = RecipeBatch::default();

        for segment in pack_segments(&tokens, MAX_BATCH_SEGMENT_BYTES) {
            let response = self.get(&format!("/p/{segment}"), &[], true).await?;
            let body = response.body();

            if let Some(manifests) = body.get("manifests").and_then(Value::as_object) {
                for (name, manifest) in manifests {
                    batch.manifests.insert(name.clone(), manifest.clone());
                }
            }
            if let Some(vulnerabilities) = body.get("vulnerabilities").and_then(Value::as_object) {
                for (name, advisories) in vulnerabilities {
                    let advisories = match advisories {
                        Value::Array(items) => items.clone(),
                        Value::Null => Vec::new(),
                        other => vec![other.clone()],
                    };
                    batch.vulnerabilities.insert(name.clone(), advisories);
                }
            }
        }

        tracing::debug!(
            "Fetched {} manifest(s) for {} package(s)",
            batch.manifests.len(),
            packages.len()
        );
        Ok(batch)
    }

    /// Fetches `path` relative to the endpoint.
    ///
    /// With `use_cache`, a cached response is revalidated or served when the
    /// server is unreachable, and fresh responses carrying `last-modified`
    /// are stored.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::TransportFailure`] once retries are exhausted
    /// and no cached copy exists.
    pub async fn get(
        &self,
        path: &str,
        headers: &[(String, String)],
        use_cache: bool,
    ) -> Result<Response> {
        let key = path.trim_start_matches('/');
        let url = format!("{}/{}", self.endpoint, key);

        let cached = if use_cache {
            self.cache.read(key)
        } else {
            None
        };
        let last_modified =
            cached.as_ref().and_then(|c| c.header("last-modified")).map(str::to_string);

        let mut request_headers = self.request_headers();
        request_headers.extend(headers.iter().cloned());
        if let Some(last_modified) = &last_modified {
            request_headers.push(("If-Modified-Since".to_string(), last_modified.clone()));
        }
        let request = HttpRequest {
            url: url.clone(),
            headers: request_headers,
        };

        tracing::debug!(
            "GET {}{}",
            url,
            if last_modified.is_some() { " (conditional)" } else { "" }
        );

        match self.retry.run(|| self.attempt(&request)).await {
            Ok(Fetched::NotFound) => {
                tracing::debug!("No content at {}", url);
                Ok(Response::not_found())
            }
            Ok(Fetched::NotModified) => match &cached {
                Some(cached) => Ok(cached.with_status(304)),
                None => Err(RecipeError::TransportFailure {
                    url,
                    reason: "server answered 304 to an unconditional request".to_string(),
                }
                .into()),
            },
            Ok(Fetched::Fresh(response)) => {
                self.report_server_messages(&url, &response);
                if use_cache && response.is_cacheable() {
                    if let Err(e) = self.cache.write(key, &response) {
                        tracing::warn!("Could not cache {}: {:#}", url, e);
                    }
                }
                Ok(response)
            }
            Err(e) => match cached {
                Some(cached) => {
                    self.switch_to_degraded_mode(&url, &e);
                    Ok(if last_modified.is_some() {
                        cached.with_status(304)
                    } else {
                        cached
                    })
                }
                None => Err(RecipeError::TransportFailure {
                    url,
                    reason: e.to_string(),
                }
                .into()),
            },
        }
    }

    /// Body of a cached GET; `Null` for a `404`.
    pub async fn get_contents(&self, path: &str) -> Result<Value> {
        Ok(self.get(path, &[], true).await?.body().clone())
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(SESSION_HEADER.to_string(), self.session.clone())];
        if let Some(project_id) = &self.project_id {
            headers.push((PROJECT_HEADER.to_string(), project_id.clone()));
        }
        if self.allow_contrib {
            headers.push((ALLOW_CONTRIB_HEADER.to_string(), "1".to_string()));
        }
        if !self.repositories.is_empty() {
            headers.push((REPOSITORIES_HEADER.to_string(), self.repositories.join(";")));
        }
        headers
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Fetched, TransportError> {
        let reply = self.transport.send(request).await?;
        match reply.status {
            404 => Ok(Fetched::NotFound),
            304 => Ok(Fetched::NotModified),
            200..=299 => {
                let body = if reply.body.iter().all(u8::is_ascii_whitespace) {
                    Value::Null
                } else {
                    serde_json::from_slice(&reply.body).map_err(|e| {
                        TransportError(format!("invalid JSON from {}: {}", request.url, e))
                    })?
                };
                Ok(Fetched::Fresh(Response::new(body, reply.headers, reply.status)))
            }
            status => Err(TransportError(format!("HTTP {status} from {}", request.url))),
        }
    }

    fn report_server_messages(&self, url: &str, response: &Response) {
        let body = response.body();
        if let Some(warning) = body.get("warning").and_then(Value::as_str).filter(|w| !w.is_empty())
        {
            tracing::warn!("Warning from {}: {}", url, warning);
        }
        if let Some(info) = body.get("info").and_then(Value::as_str).filter(|i| !i.is_empty()) {
            tracing::info!("Info from {}: {}", url, info);
        }
    }

    fn switch_to_degraded_mode(&self, url: &str, error: &TransportError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            self.degraded_warnings.fetch_add(1, Ordering::SeqCst);
            tracing::warn!("{}", error);
            tracing::warn!(
                "{} could not be fully loaded, package information was loaded from the local cache and may be out of date",
                url
            );
        }
    }
}

impl<T: Transport> RecipeIndex for Downloader<T> {
    async fn aliases(&self) -> Result<BTreeMap<String, String>> {
        let body = self.get_contents("/aliases.json").await?;
        Ok(body
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(alias, package)| {
                        package.as_str().map(|package| (alias.clone(), package.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn versions(&self) -> Result<VersionTable> {
        let body = self.get_contents("/versions.json").await?;
        Ok(VersionTable::from_json(&body))
    }
}

/// Packs tokens into `;`-joined segments of at most `budget` bytes.
///
/// A token longer than the budget becomes a segment of its own; no token is
/// ever dropped.
#[must_use]
pub fn pack_segments(tokens: &[String], budget: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut chunk = String::new();

    for token in tokens {
        if chunk.is_empty() {
            chunk.push_str(token);
        } else if chunk.len() + 1 + token.len() > budget {
            segments.push(std::mem::take(&mut chunk));
            chunk.push_str(token);
        } else {
            chunk.push(';');
            chunk.push_str(token);
        }
    }
    if !chunk.is_empty() {
        segments.push(chunk);
    }

    segments
}
