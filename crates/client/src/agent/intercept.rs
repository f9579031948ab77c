//! Fetch interception: serve from the cache when possible, otherwise from
//! the network, and never fail.
//!
//! Responses served from the cache always carry cross-origin isolation
//! headers; network responses pass through untouched.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;

use super::AgentConfig;
use super::flush::Flusher;
use precache_core::{CacheStore, CachedResponse, Error, Network, Request, Response};

/// Headers forced onto every response served from the cache.
const ISOLATION_HEADERS: [(&str, &str); 2] =
    [("cross-origin-embedder-policy", "require-corp"), ("cross-origin-opener-policy", "same-origin")];

/// Set the cross-origin isolation headers, replacing any previous values so
/// each is present exactly once.
pub fn apply_isolation_headers(headers: &mut HeaderMap) {
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

#[derive(Clone)]
pub struct Interceptor {
    network: Arc<dyn Network>,
    store: Arc<dyn CacheStore>,
    config: Arc<AgentConfig>,
    flusher: Flusher,
}

impl Interceptor {
    pub fn new(network: Arc<dyn Network>, store: Arc<dyn CacheStore>, config: Arc<AgentConfig>, flusher: Flusher) -> Self {
        Self { network, store, config, flusher }
    }

    /// Answer a request. Failures become the fallback response.
    pub async fn handle(&self, request: &Request) -> Response {
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(e) => {
                let failure = Error::Interception(format!("{} {}: {e}", request.method, request.url));
                tracing::error!("fetch error occurred: {failure}");
                Response::fallback()
            }
        }
    }

    async fn try_handle(&self, request: &Request) -> Result<Response, Error> {
        if request.is_root() {
            let outcome = self.flusher.maybe_flush().await;
            tracing::debug!(?outcome, "root navigation version check");
        }

        if request.method == Method::GET
            && request.is_same_origin(&self.config.origin)
            && let Some(cached) = self.store.match_request(request).await?
        {
            tracing::debug!(url = %request.url, "serving from cache");
            return Ok(serve_cached(&cached));
        }

        self.network.fetch(request).await
    }
}

/// Build a new response from a stored entry.
fn serve_cached(cached: &CachedResponse) -> Response {
    let mut response = cached.to_response();
    apply_isolation_headers(&mut response.headers);
    response
}
