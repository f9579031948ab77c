//! Version marker comparison.

use std::sync::Arc;

use serde::Serialize;

use super::AgentConfig;
use precache_core::{CacheMode, CacheStore, Credentials, Error, Network, Request};

/// How the cached content relates to the origin's current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Staleness {
    /// The cached marker equals the origin's marker.
    Fresh,
    /// No cached marker, or a different one.
    Stale { cached: Option<String>, latest: String },
    /// The comparison could not be made; treated as not stale.
    Unknown { reason: String },
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale { .. })
    }
}

#[derive(Clone)]
pub struct VersionChecker {
    network: Arc<dyn Network>,
    store: Arc<dyn CacheStore>,
    config: Arc<AgentConfig>,
}

impl VersionChecker {
    pub fn new(network: Arc<dyn Network>, store: Arc<dyn CacheStore>, config: Arc<AgentConfig>) -> Self {
        Self { network, store, config }
    }

    /// Whether the cache must be flushed. Never fails: an unreachable marker
    /// counts as up to date.
    pub async fn is_stale(&self) -> bool {
        self.check().await.is_stale()
    }

    /// Compare the origin's marker with the cached one.
    pub async fn check(&self) -> Staleness {
        let latest = match self.fetch_latest().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!("failed to fetch latest version marker, skipping cache flush: {e}");
                return Staleness::Unknown { reason: e.to_string() };
            }
        };

        let request = Request::get(self.config.marker_url.clone());
        let cached = match self.store.match_request(&request).await {
            Ok(cached) => cached.map(|c| c.text()),
            Err(e) => {
                tracing::warn!("failed to read cached version marker: {e}");
                return Staleness::Unknown { reason: e.to_string() };
            }
        };

        match cached {
            Some(cached) if cached == latest => {
                tracing::info!(marker = %latest, "cache is up to date, no flush needed");
                Staleness::Fresh
            }
            cached => {
                tracing::info!(cached = ?cached, latest = %latest, "version marker changed");
                Staleness::Stale { cached, latest }
            }
        }
    }

    /// GET the marker past every transport cache.
    async fn fetch_latest(&self) -> Result<String, Error> {
        let request = Request::get(self.config.marker_url.clone())
            .with_cache_mode(CacheMode::NoCache)
            .with_credentials(Credentials::SameOrigin);

        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::MarkerFetch(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::MarkerFetch(format!(
                "{} returned status {}",
                self.config.marker_url,
                response.status.as_u16()
            )));
        }

        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingNetwork, RecordingStore, Site, seed};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn checker(site: &Site, store: Arc<RecordingStore>) -> VersionChecker {
        VersionChecker::new(site.network(), store, Arc::new(site.config()))
    }

    #[tokio::test]
    async fn test_equal_markers_are_fresh() {
        let site = Site::start("build-100").await;
        let store = Arc::new(RecordingStore::new().await);
        seed(store.as_ref(), "v1", site.url("/MILESTONE"), "build-100").await;

        assert_eq!(checker(&site, store).check().await, Staleness::Fresh);
    }

    #[tokio::test]
    async fn test_missing_cached_marker_is_stale() {
        let site = Site::start("build-1").await;
        let store = Arc::new(RecordingStore::new().await);

        let staleness = checker(&site, store).check().await;
        assert_eq!(staleness, Staleness::Stale { cached: None, latest: "build-1".into() });
        assert!(staleness.is_stale());
    }

    #[tokio::test]
    async fn test_changed_marker_is_stale() {
        let site = Site::start("build-2").await;
        let store = Arc::new(RecordingStore::new().await);
        seed(store.as_ref(), "v1", site.url("/MILESTONE"), "build-1").await;

        assert!(checker(&site, store).is_stale().await);
    }

    #[tokio::test]
    async fn test_marker_fetch_failure_is_not_stale() {
        let site = Site::start("build-1").await;
        let store = Arc::new(RecordingStore::new().await);
        let checker = VersionChecker::new(Arc::new(FailingNetwork), store.clone(), Arc::new(site.config()));

        assert!(!checker.is_stale().await);
        assert!(matches!(checker.check().await, Staleness::Unknown { .. }));
        assert_eq!(store.count("match:"), 0);
    }

    #[tokio::test]
    async fn test_marker_error_status_is_not_stale() {
        let site = Site::start("build-1").await;
        Mock::given(method("GET"))
            .and(path("/MILESTONE"))
            .respond_with(ResponseTemplate::new(503))
            .with_priority(1)
            .mount(&site.server)
            .await;
        let store = Arc::new(RecordingStore::new().await);

        assert!(!checker(&site, store).is_stale().await);
    }

    #[tokio::test]
    async fn test_marker_is_fetched_without_transport_cache() {
        let site = Site::start("build-1").await;
        Mock::given(method("GET"))
            .and(path("/MILESTONE"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("build-1"))
            .with_priority(1)
            .expect(1)
            .mount(&site.server)
            .await;
        let store = Arc::new(RecordingStore::new().await);

        checker(&site, store).check().await;
    }
}
