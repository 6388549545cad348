//! Cache-first fetch pipeline with stale fallback.
//!
//! Both adapters share this pipeline; they differ only in how they build
//! the upstream request and how they normalize its payload:
//!
//! 1. A fresh cache entry is returned without calling the upstream.
//! 2. Otherwise the upstream is called and its payload validated.
//! 3. A valid payload is cached for the provider's TTL and returned.
//! 4. On any failure the retained (possibly expired) payload is returned
//!    as [`Freshness::Stale`](crate::Freshness::Stale); with nothing
//!    cached the failure propagates.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use devheat_core::{ActivityMap, CacheValue, Lookup, ProviderKind, SharedCache};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::FetchOutcome;

/// Normalizer used to validate a payload before it is cached.
pub type Normalizer = fn(&Value) -> ProviderResult<ActivityMap>;

/// The per-provider view of the shared response cache.
#[derive(Debug, Clone)]
pub struct CachedUpstream {
    kind: ProviderKind,
    cache: SharedCache,
    ttl: Duration,
}

impl CachedUpstream {
    /// Creates a pipeline caching payloads of `kind` for `ttl`.
    pub fn new(kind: ProviderKind, cache: SharedCache, ttl: Duration) -> Self {
        Self { kind, cache, ttl }
    }

    /// Returns the TTL applied to fresh payloads.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Trims and checks an identity, rejecting empty ones.
    pub fn identity<'a>(&self, identity: &'a str) -> ProviderResult<&'a str> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(ProviderError::bad_request("identity is empty").with_provider(self.kind));
        }
        Ok(identity)
    }

    fn cached_payload(&self, key: &str) -> Lookup<Arc<Value>> {
        match self.cache.lookup(key) {
            Lookup::Fresh(value) => value.into_upstream().map_or(Lookup::Miss, Lookup::Fresh),
            Lookup::Stale(value) => value.into_upstream().map_or(Lookup::Miss, Lookup::Stale),
            Lookup::Miss => Lookup::Miss,
        }
    }

    /// Runs the pipeline for `identity`.
    ///
    /// `request` is only polled when no fresh entry exists.
    pub async fn fetch<F>(
        &self,
        identity: &str,
        request: F,
        normalize: Normalizer,
    ) -> ProviderResult<FetchOutcome<Arc<Value>>>
    where
        F: Future<Output = ProviderResult<Value>>,
    {
        let key = self.kind.cache_key(identity);

        if let Lookup::Fresh(payload) = self.cached_payload(&key) {
            debug!(provider = %self.kind, key = %key, "Serving upstream payload from cache");
            return Ok(FetchOutcome::cached(payload));
        }

        let result = request.await.and_then(|payload| {
            normalize(&payload).map_err(|e| e.with_provider(self.kind))?;
            Ok(payload)
        });

        match result {
            Ok(payload) => {
                let payload = Arc::new(payload);
                self.cache
                    .set(key, CacheValue::Upstream(payload.clone()), self.ttl);
                Ok(FetchOutcome::fresh(payload))
            }
            Err(error) => match self.cached_payload(&key).any() {
                Some(payload) => {
                    warn!(
                        provider = %self.kind,
                        identity = %identity,
                        error = %error,
                        "Upstream failed, serving stale cached payload"
                    );
                    Ok(FetchOutcome::stale(payload, error))
                }
                None => {
                    warn!(
                        provider = %self.kind,
                        identity = %identity,
                        error = %error,
                        "Upstream failed with nothing cached"
                    );
                    Err(error)
                }
            },
        }
    }
}
