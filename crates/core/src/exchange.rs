//! Request and response types exchanged between the agent, the network and
//! the cache store.
//!
//! Bodies are held as [`Bytes`]: a stored entry is an immutable buffer and
//! every served [`Response`] owns its own view of it.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use url::Url;

use crate::Error;

/// Transport cache behaviour for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Let intermediaries answer from their caches.
    #[default]
    Default,
    /// Force revalidation with the origin.
    NoCache,
}

/// Whether credentials (the session cookie) travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    /// Only for requests to the configured origin.
    #[default]
    SameOrigin,
    Include,
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub cache_mode: CacheMode,
    pub credentials: Credentials,
}

impl Request {
    /// Create a request with default headers and modes.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            cache_mode: CacheMode::Default,
            credentials: Credentials::SameOrigin,
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the request targets the same origin (scheme, host, port) as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Whether this is a navigation to the root path.
    pub fn is_root(&self) -> bool {
        self.url.path() == "/"
    }

    /// URL used as the cache identity of this request (fragment removed).
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

/// A response handed to the caller of a fetch.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Option<Url>,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub source: ResponseSource,
    body: Bytes,
}

/// Body of the response served when fetch handling fails.
pub const FALLBACK_BODY: &str = "Service Worker: Network error or resource unavailable";

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>, source: ResponseSource) -> Self {
        Self {
            url: None,
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            source,
            body: body.into(),
        }
    }

    /// The synthetic 500 response returned when interception fails.
    pub fn fallback() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        let mut response =
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, headers, FALLBACK_BODY, ResponseSource::Fallback);
        response.status_text = "Service Unavailable".to_string();
        response
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Snapshot this response for storage under `request_url`.
    pub fn to_cached(&self, request_url: &str) -> CachedResponse {
        CachedResponse {
            url: request_url.to_string(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            cached_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An immutable stored response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub url: String,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub cached_at: String,
}

impl CachedResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Build a new response from this snapshot with a fresh body view.
    pub fn to_response(&self) -> Response {
        Response::new(self.status, self.headers.clone(), self.body.clone(), ResponseSource::Cache)
            .with_status_text(self.status_text.clone())
    }
}

/// Flatten headers into ordered name/value pairs, keeping repeated names.
pub fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect()
}

/// Rebuild a header map from name/value pairs.
pub fn headers_from_pairs(pairs: &[(String, String)]) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeaders(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeaders(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}
