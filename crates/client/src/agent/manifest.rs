//! Build manifest parsing and the resource list derived from it.

use serde::Deserialize;
use url::Url;

use super::AgentConfig;
use precache_core::Error;

/// The build manifest. Only `resources.fingerprinting` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub resources: ManifestResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestResources {
    /// Resource filename -> fingerprint, in document order.
    pub fingerprinting: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Parse a manifest body.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(body).map_err(|e| Error::ManifestParse(e.to_string()))
    }

    /// Fingerprinted resource filenames in document order.
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.fingerprinting.keys().map(String::as_str)
    }
}

/// Absolute URLs to cache during install: static resources first, then the
/// manifest resources. Each URL appears once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceList {
    urls: Vec<Url>,
}

impl ResourceList {
    pub fn build(config: &AgentConfig, manifest: &Manifest) -> Result<Self, Error> {
        let mut list = Self::default();
        for url in &config.static_resources {
            list.push(url.clone());
        }
        for name in manifest.resource_names() {
            list.push(config.manifest_resource_url(name)?);
        }
        Ok(list)
    }

    fn push(&mut self, url: Url) {
        if !self.urls.contains(&url) {
            self.urls.push(url);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.urls.iter()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
