//! HTTP transport seam of the downloader.
//!
//! The downloader only needs "send a GET with these headers, give me status,
//! headers and body". Keeping that behind [`Transport`] lets tests script
//! failures and replies without a server.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs, sent in order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Value of the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw reply: any status, including errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status
    pub status: u16,
    /// Headers keyed by lowercased name
    pub headers: BTreeMap<String, String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

/// The request never produced a reply (DNS, TLS, connection, timeout).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends GET requests.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns whatever the server answered.
    fn send(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client, trusting the PEM bundle at `cafile` in addition to the
    /// system roots when given.
    pub fn new(cafile: Option<&Path>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("recipe-kit/", env!("CARGO_PKG_VERSION")));

        if let Some(cafile) = cafile {
            let pem = std::fs::read(cafile)
                .with_context(|| format!("Failed to read CA file: {}", cafile.display()))?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("Failed to parse CA file: {}", cafile.display()))?;
            builder = builder.add_root_certificate(certificate);
            tracing::debug!("Using CA file {}", cafile.display());
        }

        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self {
            client,
        })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| TransportError(e.to_string()))?.to_vec();

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}
