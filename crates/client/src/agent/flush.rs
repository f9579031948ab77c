//! Cache invalidation: delete every partition and install again.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::installer::{InstallReport, Installer};
use super::version::{Staleness, VersionChecker};
use precache_core::{CacheStore, Error};

/// Result of a check-and-flush sequence.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// The cached marker matches; nothing was touched.
    UpToDate,
    /// The marker could not be compared; nothing was touched.
    Skipped { reason: String },
    Flushed { report: InstallReport },
    Failed { reason: String },
}

#[derive(Clone)]
pub struct Flusher {
    store: Arc<dyn CacheStore>,
    installer: Installer,
    checker: VersionChecker,
    in_flight: Arc<Mutex<()>>,
}

impl Flusher {
    pub fn new(store: Arc<dyn CacheStore>, installer: Installer, checker: VersionChecker) -> Self {
        Self { store, installer, checker, in_flight: Arc::new(Mutex::new(())) }
    }

    /// Delete every partition, then run the installer.
    ///
    /// All deletions run to completion before the first failure, if any, is
    /// returned as `CacheDeletion`; the installer does not run in that case.
    pub async fn flush_and_reinstall(&self) -> Result<InstallReport, Error> {
        let names = self.store.keys().await?;
        tracing::info!(partitions = names.len(), "cache expired, flushing");

        let results = join_all(names.iter().map(|name| self.store.delete(name))).await;
        if let Some((name, e)) = names.iter().zip(results).find_map(|(name, r)| r.err().map(|e| (name, e))) {
            return Err(Error::CacheDeletion { name: name.clone(), reason: e.to_string() });
        }

        tracing::info!("reinstalling cache after flush");
        self.installer.install().await
    }

    /// Check the version marker and flush when it changed. Never fails.
    ///
    /// Concurrent callers run one at a time; a caller that waited sees the
    /// marker the previous sequence installed.
    pub async fn maybe_flush(&self) -> FlushOutcome {
        let _guard = self.in_flight.lock().await;

        let staleness = self.checker.check().await;
        if !staleness.is_stale() {
            return match staleness {
                Staleness::Unknown { reason } => FlushOutcome::Skipped { reason },
                _ => FlushOutcome::UpToDate,
            };
        }

        self.flush_locked().await
    }

    /// Flush and reinstall without consulting the marker.
    pub async fn force_flush(&self) -> FlushOutcome {
        let _guard = self.in_flight.lock().await;
        self.flush_locked().await
    }

    /// Reserve the single-flight slot. No check-and-flush runs until the
    /// returned guard is dropped.
    pub async fn hold(&self) -> OwnedMutexGuard<()> {
        self.in_flight.clone().lock_owned().await
    }

    async fn flush_locked(&self) -> FlushOutcome {
        match self.flush_and_reinstall().await {
            Ok(report) => FlushOutcome::Flushed { report },
            Err(e) => {
                tracing::error!("failed to check/flush cache: {e}");
                FlushOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}
