//! The pre-caching agent.
//!
//! ### Components
//! - [`Installer`]: manifest fetch, resource list, bulk add into the versioned partition
//! - [`VersionChecker`]: compares the origin's version marker with the cached one
//! - [`Flusher`]: deletes every partition and reinstalls when the marker changed
//! - [`Interceptor`]: cache-or-network decision for every fetch
//! - [`Worker`]: install / activate / fetch lifecycle and pending work
//!
//! Every component holds shared handles to the same [`AgentConfig`], cache
//! store and network, so they are cheap to clone.

pub mod clients;
pub mod flush;
pub mod installer;
pub mod intercept;
pub mod lifecycle;
pub mod manifest;
pub mod pending;
pub mod version;

pub use clients::{Client, Clients, WorkerId};
pub use flush::{FlushOutcome, Flusher};
pub use installer::{InstallReport, Installer};
pub use intercept::{Interceptor, apply_isolation_headers};
pub use lifecycle::{Worker, WorkerState};
pub use manifest::{Manifest, ResourceList};
pub use pending::{PendingWork, TaskOutcome};
pub use version::{Staleness, VersionChecker};

use precache_core::{AppConfig, Error};
use url::Url;

/// Resolved agent settings: every path is already joined onto the origin.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub origin: Url,
    /// Name of the current cache partition.
    pub cache_version: String,
    pub manifest_url: Url,
    /// Prepended to every fingerprinting key of the manifest.
    pub manifest_resource_prefix: String,
    pub marker_url: Url,
    /// Resources cached verbatim, in configured order.
    pub static_resources: Vec<Url>,
}

impl AgentConfig {
    /// Resolve the application configuration against its origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let join = |path: &str| origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        Ok(Self {
            manifest_url: join(&config.manifest_path)?,
            marker_url: join(&config.marker_path)?,
            static_resources: config.static_resources.iter().map(|p| join(p)).collect::<Result<_, _>>()?,
            cache_version: config.cache_version.clone(),
            manifest_resource_prefix: config.manifest_resource_prefix.clone(),
            origin,
        })
    }

    /// URL of a manifest resource key.
    pub fn manifest_resource_url(&self, key: &str) -> Result<Url, Error> {
        let path = format!("{}{}", self.manifest_resource_prefix, key);
        self.origin.join(&path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }
}
