//! HTTP transport for the agent.
//!
//! ### Request Modes
//! - `CacheMode::NoCache` sends `Cache-Control: no-cache` and `Pragma: no-cache`
//!   so intermediaries revalidate with the origin.
//! - Credentials decide whether the configured session cookie is attached:
//!   `SameOrigin` only for the configured origin, `Include` always, `Omit` never.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: configurable (checked against Content-Length and the body)

pub mod url;

use bytes::Bytes;
use http::HeaderValue;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

use precache_core::{AppConfig, CacheMode, Credentials, Error, Network, Request, Response, ResponseSource};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin that `Credentials::SameOrigin` is checked against.
    pub origin: ::url::Url,

    /// User agent string (default: "precache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Cookie header value for credentialed requests.
    pub session_cookie: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            origin: ::url::Url::parse("http://localhost:8080").expect("static origin parses"),
            user_agent: "precache/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            session_cookie: None,
        }
    }
}

impl FetchConfig {
    /// Derive the fetch configuration from the application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            session_cookie: config.session_cookie.clone(),
        })
    }
}

/// reqwest-backed [`Network`] implementation.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn sends_credentials(&self, request: &Request) -> bool {
        match request.credentials {
            Credentials::Omit => false,
            Credentials::SameOrigin => request.is_same_origin(&self.config.origin),
            Credentials::Include => true,
        }
    }

    fn build_headers(&self, request: &Request) -> header::HeaderMap {
        let mut headers = request.headers.clone();

        if request.cache_mode == CacheMode::NoCache {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        }

        if !self.sends_credentials(request) {
            headers.remove(header::COOKIE);
        } else if let Some(cookie) = &self.config.session_cookie {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(header::COOKIE, value);
                }
                Err(e) => tracing::warn!("session cookie is not a valid header value: {e}"),
            }
        }

        headers
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(self.build_headers(request));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response::new(status, headers, bytes, ResponseSource::Network).with_url(final_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, cookie: Option<&str>) -> FetchClient {
        let config = FetchConfig {
            origin: ::url::Url::parse(&server.uri()).unwrap(),
            session_cookie: cookie.map(String::from),
            ..Default::default()
        };
        FetchClient::new(config).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> ::url::Url {
        ::url::Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "precache/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert!(config.session_cookie.is_none());
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig {
            origin: "https://app.example.com".into(),
            session_cookie: Some("sid=1".into()),
            ..Default::default()
        };
        let config = FetchConfig::from_app(&app).unwrap();
        assert_eq!(config.origin.host_str(), Some("app.example.com"));
        assert_eq!(config.session_cookie.as_deref(), Some("sid=1"));
    }

    #[tokio::test]
    async fn test_fetch_returns_non_success_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let response = client.fetch(&Request::get(url(&server, "/missing"))).await.unwrap();
        assert_eq!(response.status.as_u16(), 404);
        assert_eq!(response.text(), "nope");
        assert_eq!(response.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_no_cache_mode_sets_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/MILESTONE"))
            .and(header_eq("cache-control", "no-cache"))
            .and(header_eq("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("build-1"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = Request::get(url(&server, "/MILESTONE")).with_cache_mode(CacheMode::NoCache);
        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.text(), "build-1");
    }

    #[tokio::test]
    async fn test_same_origin_credentials_attach_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/MILESTONE"))
            .and(header_eq("cookie", "sid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("with-cookie"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/MILESTONE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("anonymous"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sid=abc"));

        let same_origin = Request::get(url(&server, "/MILESTONE")).with_credentials(Credentials::SameOrigin);
        assert_eq!(client.fetch(&same_origin).await.unwrap().text(), "with-cookie");

        let omitted = Request::get(url(&server, "/MILESTONE")).with_credentials(Credentials::Omit);
        assert_eq!(client.fetch(&omitted).await.unwrap().text(), "anonymous");
    }

    #[tokio::test]
    async fn test_cookie_only_crosses_origins_when_included() {
        let app = MockServer::start().await;
        let cdn = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .and(header_eq("cookie", "sid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("with-cookie"))
            .mount(&cdn)
            .await;
        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("anonymous"))
            .mount(&cdn)
            .await;

        let client = client_for(&app, Some("sid=abc"));

        let mut same_origin = Request::get(url(&cdn, "/lib.js"));
        same_origin.headers.insert(header::COOKIE, HeaderValue::from_static("sid=abc"));
        assert_eq!(client.fetch(&same_origin).await.unwrap().text(), "anonymous");

        let included = Request::get(url(&cdn, "/lib.js")).with_credentials(Credentials::Include);
        assert_eq!(client.fetch(&included).await.unwrap().text(), "with-cookie");
    }

    #[tokio::test]
    async fn test_post_body_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/save"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = Request::new(http::Method::POST, url(&server, "/api/save")).with_body("{}");
        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status.as_u16(), 201);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let config = FetchConfig { origin: ::url::Url::parse(&server.uri()).unwrap(), max_bytes: 16, ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let result = client.fetch(&Request::get(url(&server, "/big"))).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = FetchConfig { timeout: Duration::from_millis(500), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());
        assert!(matches!(client.fetch(&request).await, Err(Error::Network(_))));
    }
}
