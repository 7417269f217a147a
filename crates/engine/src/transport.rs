//! Network transport behind the fetch strategies.
//!
//! A single retrieval call with no built-in retry; the engine does not
//! retry automatically and imposes no timeout beyond the transport's own.
//! The trait seam exists so tests can script network behavior.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::Duration;
use url::Url;

use sevacache_core::Error;

/// How the network call should interact with intermediary HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Let intermediaries answer (Network-with-Fallback, revalidation).
    #[default]
    Default,
    /// Force revalidation end to end (Network-First).
    NoCache,
}

/// One outgoing retrieval.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: String,
    pub url: Url,
    pub mode: CacheMode,
}

impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self { method: "GET".to_string(), url, mode: CacheMode::Default }
    }

    pub fn no_cache(url: Url) -> Self {
        Self { method: "GET".to_string(), url, mode: CacheMode::NoCache }
    }

    /// Replay with the original verb; excluded requests are forwarded as-is.
    pub fn with_method(method: &str, url: Url) -> Self {
        Self { method: method.to_string(), url, mode: CacheMode::Default }
    }
}

/// Response from a network fetch.
///
/// Carried whole regardless of status; strategies decide what a non-success
/// status means for their fallback chain.
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl NetworkResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network transport: `fetch(request) -> response | NetworkError`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<NetworkResponse, Error>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: "sevacache/0.1".to_string(),
            timeout: Duration::from_millis(20_000),
            max_body_bytes: 5 * 1024 * 1024,
            max_redirects: 5,
        }
    }
}

impl TransportConfig {
    pub fn from_app(config: &sevacache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Build the HTTP client with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, req: &FetchRequest) -> Result<NetworkResponse, Error> {
        let method: reqwest::Method = req
            .method
            .parse()
            .map_err(|_| Error::Transport(format!("invalid method: {}", req.method)))?;
        let mut request = self.http.request(method, req.url.as_str());
        if req.mode == CacheMode::NoCache {
            request = request.header(header::CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("network error: {e}")))?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_body_bytes
        {
            return Err(Error::BodyTooLarge(format!("{} bytes exceeds {}", len, self.config.max_body_bytes)));
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect::<Vec<_>>();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if body.len() > self.config.max_body_bytes {
            return Err(Error::BodyTooLarge(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_body_bytes
            )));
        }

        tracing::debug!(url = %req.url, status, bytes = body.len(), "fetched");

        Ok(NetworkResponse { status, headers, body })
    }
}
