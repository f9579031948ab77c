//! Install: populate the versioned partition with the application shell.
//!
//! The manifest is fetched first, then every resource of the [`ResourceList`]
//! is fetched concurrently. Nothing is written unless all of them succeed;
//! the fetched set is then stored in one batch.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;

use super::AgentConfig;
use super::manifest::{Manifest, ResourceList};
use precache_core::{CacheStore, CachedResponse, Error, Network, Request};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub partition: String,
    pub resources: usize,
    pub bytes: u64,
}

#[derive(Clone)]
pub struct Installer {
    network: Arc<dyn Network>,
    store: Arc<dyn CacheStore>,
    config: Arc<AgentConfig>,
}

impl Installer {
    pub fn new(network: Arc<dyn Network>, store: Arc<dyn CacheStore>, config: Arc<AgentConfig>) -> Self {
        Self { network, store, config }
    }

    /// Fetch the manifest and cache every resource it implies.
    ///
    /// # Errors
    ///
    /// - `ManifestFetch` if the manifest answers with a non-success status
    /// - `ManifestParse` if it lacks `resources.fingerprinting`
    /// - `BulkCacheWrite` if any resource fails to fetch or the batch fails to store
    pub async fn install(&self) -> Result<InstallReport, Error> {
        match self.try_install().await {
            Ok(report) => {
                tracing::info!(
                    partition = %report.partition,
                    resources = report.resources,
                    bytes = report.bytes,
                    "cache installed"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("failed to install cache: {e}");
                Err(e)
            }
        }
    }

    async fn try_install(&self) -> Result<InstallReport, Error> {
        let manifest = self.fetch_manifest().await?;
        let resources = ResourceList::build(&self.config, &manifest)?;

        self.store.open(&self.config.cache_version).await?;
        self.add_all(&resources).await
    }

    async fn fetch_manifest(&self) -> Result<Manifest, Error> {
        let request = Request::get(self.config.manifest_url.clone());
        let response = self.network.fetch(&request).await?;

        if !response.is_success() {
            return Err(Error::ManifestFetch {
                url: self.config.manifest_url.to_string(),
                status: response.status.as_u16(),
            });
        }

        Manifest::parse(response.body())
    }

    async fn add_all(&self, resources: &ResourceList) -> Result<InstallReport, Error> {
        let fetches = resources.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::BulkCacheWrite { resource: url.to_string(), reason: e.to_string() })?;

            if !response.is_success() {
                return Err(Error::BulkCacheWrite {
                    resource: url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            let cached = response.to_cached(&request.cache_url());
            Ok::<(Request, CachedResponse), Error>((request, cached))
        });

        let entries = try_join_all(fetches).await?;
        let bytes: u64 = entries.iter().map(|(_, cached)| cached.body.len() as u64).sum();
        let count = entries.len();
        let partition = self.config.cache_version.clone();

        self.store
            .put_all(&partition, entries)
            .await
            .map_err(|e| Error::BulkCacheWrite { resource: format!("partition {partition}"), reason: e.to_string() })?;

        Ok(InstallReport { partition, resources: count, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MANIFEST_RESOURCES, RecordingStore, Site};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn installer(site: &Site, store: Arc<RecordingStore>) -> Installer {
        Installer::new(site.network(), store, Arc::new(site.config()))
    }

    #[tokio::test]
    async fn test_install_caches_statics_and_manifest_resources() {
        let site = Site::start("build-1").await;
        let store = Arc::new(RecordingStore::new().await);

        let report = installer(&site, store.clone()).install().await.unwrap();
        assert_eq!(report.partition, "v1");
        assert_eq!(report.resources, 8 + MANIFEST_RESOURCES.len());
        assert!(report.bytes > 0);

        let marker = store.db().match_request(&Request::get(site.url("/MILESTONE"))).await.unwrap().unwrap();
        assert_eq!(marker.text(), "build-1");

        let wasm = store.db().match_request(&Request::get(site.url("/_framework/dotnet.wasm"))).await.unwrap();
        assert!(wasm.is_some());

        assert_eq!(store.calls().first().map(String::as_str), Some("open:v1"));
        assert_eq!(store.count("put_all:v1:10"), 1);
    }

    #[tokio::test]
    async fn test_manifest_status_error() {
        let site = Site::start("build-1").await;
        site.server.reset().await;
        Mock::given(method("GET"))
            .and(path("/_framework/blazor.boot.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&site.server)
            .await;

        let store = Arc::new(RecordingStore::new().await);
        let result = installer(&site, store.clone()).install().await;

        assert!(matches!(result, Err(Error::ManifestFetch { status: 404, .. })));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_without_fingerprinting() {
        let site = Site::start("build-1").await;
        site.server.reset().await;
        Mock::given(method("GET"))
            .and(path("/_framework/blazor.boot.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"resources":{}}"#))
            .mount(&site.server)
            .await;

        let store = Arc::new(RecordingStore::new().await);
        let result = installer(&site, store.clone()).install().await;

        assert!(matches!(result, Err(Error::ManifestParse(_))));
        assert_eq!(store.count("open:"), 0);
    }

    #[tokio::test]
    async fn test_failed_resource_writes_nothing() {
        let site = Site::start("build-1").await;
        Mock::given(method("GET"))
            .and(path("/backdrop.png"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&site.server)
            .await;

        let store = Arc::new(RecordingStore::new().await);
        let result = installer(&site, store.clone()).install().await;

        match result {
            Err(Error::BulkCacheWrite { resource, reason }) => {
                assert!(resource.ends_with("/backdrop.png"));
                assert_eq!(reason, "status 500");
            }
            other => panic!("expected BulkCacheWrite, got {other:?}"),
        }

        assert_eq!(store.count("put_all:"), 0);
        // The partition stays open; there is no rollback.
        assert_eq!(store.db().partition_names().await.unwrap(), vec!["v1"]);
        let root = store.db().match_request(&Request::get(site.url("/"))).await.unwrap();
        assert!(root.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_origin() {
        let site = Site::start("build-1").await;
        let store = Arc::new(RecordingStore::new().await);
        let installer = Installer::new(
            Arc::new(crate::test_utils::FailingNetwork),
            store.clone(),
            Arc::new(site.config()),
        );

        // The manifest itself is unreachable, which surfaces as a transport error.
        let result = installer.install().await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
