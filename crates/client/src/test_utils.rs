//! Shared fixtures for agent tests: a recording cache store, a network that
//! always fails and a mock origin serving a small application.

use std::sync::{Arc, Mutex};

use precache_core::{
    AppConfig, CacheDb, CacheStore, CachedResponse, Error, Network, Request, Response,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::agent::AgentConfig;
use crate::fetch::{FetchClient, FetchConfig};

pub(crate) const MANIFEST: &str =
    r#"{"mainAssemblyName":"App","resources":{"hash":"sha256-x","fingerprinting":{"dotnet.wasm":"sha256-a","App.dll":"sha256-b"}}}"#;

/// Manifest resources of [`MANIFEST`].
pub(crate) const MANIFEST_RESOURCES: [&str; 2] = ["/_framework/dotnet.wasm", "/_framework/App.dll"];

/// [`CacheDb`] wrapper that records every call in order.
pub(crate) struct RecordingStore {
    inner: CacheDb,
    log: Mutex<Vec<String>>,
    fail_delete: Option<String>,
}

impl RecordingStore {
    pub async fn new() -> Self {
        Self { inner: CacheDb::open_in_memory().await.unwrap(), log: Mutex::new(Vec::new()), fail_delete: None }
    }

    /// Make deleting `name` fail after the other deletions were started.
    pub fn with_failing_delete(mut self, name: &str) -> Self {
        self.fail_delete = Some(name.to_string());
        self
    }

    pub fn db(&self) -> &CacheDb {
        &self.inner
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl CacheStore for RecordingStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.record(format!("open:{name}"));
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.record("keys".to_string());
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.record(format!("delete:start:{name}"));
        tokio::task::yield_now().await;
        let result = if self.fail_delete.as_deref() == Some(name) {
            Err(Error::InvalidInput(format!("partition {name} is locked")))
        } else {
            self.inner.delete(name).await
        };
        self.record(format!("delete:done:{name}"));
        result
    }

    async fn match_request(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        self.record(format!("match:{} {}", request.method, request.url.path()));
        self.inner.match_request(request).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        self.record(format!("put_all:{name}:{}", entries.len()));
        self.inner.put_all(name, entries).await
    }
}

/// Network whose every fetch fails at the transport level.
pub(crate) struct FailingNetwork;

#[async_trait::async_trait]
impl Network for FailingNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        Err(Error::Network(format!("{} {}: connection refused", request.method, request.url)))
    }
}

/// A mock origin serving the default static resources, a manifest and a
/// version marker.
pub(crate) struct Site {
    pub server: MockServer,
}

impl Site {
    pub async fn start(marker: &str) -> Self {
        let site = Self { server: MockServer::start().await };
        site.mount(marker).await;
        site
    }

    /// Replace every mock, serving `marker` as the new version.
    pub async fn set_marker(&self, marker: &str) {
        self.server.reset().await;
        self.mount(marker).await;
    }

    async fn mount(&self, marker: &str) {
        let app = AppConfig::default();
        Mock::given(method("GET"))
            .and(path(app.manifest_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(app.marker_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(marker))
            .mount(&self.server)
            .await;

        let others = app
            .static_resources
            .iter()
            .map(String::as_str)
            .filter(|p| *p != app.manifest_path && *p != app.marker_path)
            .chain(MANIFEST_RESOURCES);
        for p in others {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("content of {p}")))
                .mount(&self.server)
                .await;
        }
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig { origin: self.server.uri(), ..Default::default() }
    }

    pub fn config(&self) -> AgentConfig {
        AgentConfig::from_app(&self.app_config()).unwrap()
    }

    pub fn network(&self) -> Arc<dyn Network> {
        Arc::new(FetchClient::new(FetchConfig::from_app(&self.app_config()).unwrap()).unwrap())
    }

    pub fn url(&self, p: &str) -> url::Url {
        url::Url::parse(&format!("{}{}", self.server.uri(), p)).unwrap()
    }

    /// Number of requests the origin received for `p`.
    pub async fn hits(&self, p: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == p)
            .count()
    }
}

/// Store `body` under `url` in `partition`, as the install would.
pub(crate) async fn seed(store: &dyn CacheStore, partition: &str, url: url::Url, body: &str) {
    let request = Request::get(url);
    let response = Response::new(
        http::StatusCode::OK,
        http::HeaderMap::new(),
        body.to_string(),
        precache_core::ResponseSource::Network,
    );
    let cached = response.to_cached(&request.cache_url());
    store.put_all(partition, vec![(request, cached)]).await.unwrap();
}
