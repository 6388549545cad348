//! ActivityProvider trait definition.
//!
//! This module defines the [`ActivityProvider`] trait, which is the core
//! abstraction for upstream activity sources (GitHub, LeetCode).
//!
//! Providers are responsible for:
//! - Fetching the raw upstream payload for an identity, through the cache
//! - Falling back to a retained stale payload when the upstream fails
//! - Normalizing the payload into an [`ActivityMap`]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use devheat_core::{ActivityMap, ProviderKind};

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so the aggregator can hold providers
/// as `Arc<dyn ActivityProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where a fetched value came from.
#[derive(Debug)]
pub enum Freshness {
    /// Fetched from the upstream during this call.
    Fresh,
    /// Served from an unexpired cache entry; the upstream was not called.
    Cached,
    /// The upstream failed and an expired cache entry was served instead.
    Stale {
        /// The failure that triggered the fallback.
        reason: ProviderError,
    },
}

impl Freshness {
    /// Returns true if the value is a stale fallback.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns the failure behind a stale fallback.
    pub fn stale_reason(&self) -> Option<&ProviderError> {
        match self {
            Self::Stale { reason } => Some(reason),
            Self::Fresh | Self::Cached => None,
        }
    }
}

/// A fetched value together with its freshness.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    /// The fetched value.
    pub value: T,
    /// Where the value came from.
    pub freshness: Freshness,
}

impl<T> FetchOutcome<T> {
    /// Creates an outcome fetched from the upstream.
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            freshness: Freshness::Fresh,
        }
    }

    /// Creates an outcome served from cache.
    pub fn cached(value: T) -> Self {
        Self {
            value,
            freshness: Freshness::Cached,
        }
    }

    /// Creates a stale fallback outcome.
    pub fn stale(value: T, reason: ProviderError) -> Self {
        Self {
            value,
            freshness: Freshness::Stale { reason },
        }
    }

    /// Maps the value, keeping the freshness.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        FetchOutcome {
            value: f(self.value),
            freshness: self.freshness,
        }
    }
}

/// The core abstraction for activity providers.
///
/// # Implementation Notes
///
/// - `fetch_raw` must consult the cache first and must only fail when no
///   cached payload (fresh or retained stale) exists
/// - `normalize` must be pure: the same payload always yields the same map
/// - Implementations should be `Send + Sync` for use in async contexts
pub trait ActivityProvider: Send + Sync {
    /// Returns which upstream this provider talks to.
    fn kind(&self) -> ProviderKind;

    /// Fetches the raw upstream payload for an identity.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the upstream fails and nothing is cached.
    fn fetch_raw<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, ProviderResult<FetchOutcome<Arc<serde_json::Value>>>>;

    /// Normalizes a raw payload into a date-to-count mapping.
    fn normalize(&self, payload: &serde_json::Value) -> ProviderResult<ActivityMap>;

    /// Fetches and normalizes the activity of an identity.
    fn fetch<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, ProviderResult<FetchOutcome<ActivityMap>>> {
        Box::pin(async move {
            let outcome = self.fetch_raw(identity).await?;
            let activity = self.normalize(&outcome.value)?;
            Ok(outcome.map(|_| activity))
        })
    }
}

/// A provider that always returns an error.
///
/// This is useful for testing or as a placeholder when a provider
/// fails to initialize.
#[derive(Debug)]
pub struct ErrorProvider {
    kind: ProviderKind,
    error: ProviderError,
}

impl ErrorProvider {
    /// Creates a new error provider.
    pub fn new(kind: ProviderKind, error: ProviderError) -> Self {
        Self { kind, error }
    }
}

impl ActivityProvider for ErrorProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch_raw<'a>(
        &'a self,
        _identity: &'a str,
    ) -> BoxFuture<'a, ProviderResult<FetchOutcome<Arc<serde_json::Value>>>> {
        // ProviderError is not Clone, rebuild it from its parts
        let error =
            ProviderError::new(self.error.code(), self.error.message()).with_provider(self.kind);
        Box::pin(async move { Err(error) })
    }

    fn normalize(&self, _payload: &serde_json::Value) -> ProviderResult<ActivityMap> {
        Ok(ActivityMap::new())
    }
}
