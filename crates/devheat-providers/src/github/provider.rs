//! GitHub provider implementation.

use std::sync::Arc;

use devheat_core::{ActivityMap, ProviderKind, SharedCache};
use serde_json::{Value, json};
use tracing::info;

use crate::cached::CachedUpstream;
use crate::error::{ProviderError, ProviderResult};
use crate::http::GraphqlClient;
use crate::provider::{ActivityProvider, BoxFuture, FetchOutcome};

use super::calendar::{CONTRIBUTIONS_QUERY, normalize_calendar};
use super::config::GitHubConfig;

/// GitHub contribution calendar provider.
///
/// Requires an access token; without one every fetch fails with a
/// configuration error before the cache is consulted.
pub struct GitHubProvider {
    config: GitHubConfig,
    client: GraphqlClient,
    upstream: CachedUpstream,
}

impl GitHubProvider {
    /// Creates a new GitHub provider sharing `cache`.
    pub fn new(config: GitHubConfig, cache: SharedCache) -> ProviderResult<Self> {
        let client = GraphqlClient::new(
            ProviderKind::GitHub,
            config.endpoint.clone(),
            config.http.clone(),
        )?;
        let upstream = CachedUpstream::new(ProviderKind::GitHub, cache, config.cache_ttl);

        info!(
            endpoint = %config.endpoint,
            has_token = config.has_token(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Configured GitHub provider"
        );

        Ok(Self {
            config,
            client,
            upstream,
        })
    }

    fn token(&self) -> ProviderResult<&str> {
        self.config.token.as_deref().ok_or_else(|| {
            ProviderError::configuration("GitHub token is not configured")
                .with_provider(ProviderKind::GitHub)
        })
    }
}

impl ActivityProvider for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn fetch_raw<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, ProviderResult<FetchOutcome<Arc<Value>>>> {
        Box::pin(async move {
            let identity = self.upstream.identity(identity)?;
            let token = self.token()?;

            let request =
                self.client
                    .query(CONTRIBUTIONS_QUERY, json!({ "login": identity }), Some(token));

            self.upstream
                .fetch(identity, request, normalize_calendar)
                .await
        })
    }

    fn normalize(&self, payload: &Value) -> ProviderResult<ActivityMap> {
        normalize_calendar(payload)
    }
}
