//! Intercepted request model, URL canonicalization, and exclusion rules.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string

use url::Url;

use sevacache_core::Error;
use sevacache_core::store::key::request_key;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Destination category of an intercepted request, as declared by the
/// requesting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A top-level navigation for a document.
    Document,
    Image,
    Script,
    Style,
    Font,
    Other,
}

/// One outgoing request as seen at the interception boundary.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl Intercepted {
    /// Build a retrieval request from a raw URL string.
    pub fn get(url: &str, destination: Destination) -> Result<Self, Error> {
        let url = canonicalize(url)?;
        Ok(Self { method: "GET".to_string(), url, destination })
    }

    /// Navigation requests fall back to the application shell when both the
    /// network and the exact-match store fail.
    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Store key for this request's identity.
    pub fn key(&self) -> String {
        request_key(&self.method, self.url.as_str())
    }

    /// Lowercase file extension of the URL path, if any.
    pub fn extension(&self) -> Option<String> {
        let path = self.url.path();
        let name = path.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() { None } else { Some(ext.to_ascii_lowercase()) }
    }
}

/// Canonicalize a URL string for consistent keying.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Non-http(s) schemes are accepted here; the exclusion rules decide what
/// to do with them.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Host matching granularity (Open Question in the routing rules: exact
/// match preferred, prefix as the configurable alternative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMatch {
    #[default]
    Exact,
    Prefix,
}

impl HostMatch {
    pub fn from_config(value: &str) -> Self {
        match value {
            "prefix" => HostMatch::Prefix,
            _ => HostMatch::Exact,
        }
    }

    pub fn matches(&self, host: &str, pattern: &str) -> bool {
        match self {
            HostMatch::Exact => host == pattern,
            HostMatch::Prefix => host == pattern || host.starts_with(pattern),
        }
    }
}

/// Static predicates that bypass the cache engine entirely.
#[derive(Debug, Clone)]
pub struct Exclusions {
    bypass_hosts: Vec<String>,
    host_match: HostMatch,
}

impl Exclusions {
    pub fn new(bypass_hosts: Vec<String>, host_match: HostMatch) -> Self {
        Self { bypass_hosts, host_match }
    }

    pub fn from_config(config: &sevacache_core::AppConfig) -> Self {
        Self::new(config.bypass_hosts.clone(), HostMatch::from_config(&config.host_match))
    }

    /// A request is out of scope if it is not a retrieval, not http(s), or
    /// targets an always-fresh API host.
    pub fn is_excluded(&self, req: &Intercepted) -> bool {
        if !req.method.eq_ignore_ascii_case("GET") {
            return true;
        }

        match req.url.scheme() {
            "http" | "https" => {}
            _ => return true,
        }

        if let Some(host) = req.url.host_str() {
            return self.bypass_hosts.iter().any(|p| self.host_match.matches(host, p));
        }

        false
    }
}
