//! LeetCode provider implementation.

use std::sync::Arc;

use devheat_core::{ActivityMap, ProviderKind, SharedCache};
use serde_json::{Value, json};
use tracing::info;

use crate::cached::CachedUpstream;
use crate::error::ProviderResult;
use crate::http::GraphqlClient;
use crate::provider::{ActivityProvider, BoxFuture, FetchOutcome};

use super::calendar::{SUBMISSION_CALENDAR_QUERY, normalize_calendar};
use super::config::LeetCodeConfig;

/// LeetCode submission calendar provider.
pub struct LeetCodeProvider {
    client: GraphqlClient,
    upstream: CachedUpstream,
}

impl LeetCodeProvider {
    /// Creates a new LeetCode provider sharing `cache`.
    pub fn new(config: LeetCodeConfig, cache: SharedCache) -> ProviderResult<Self> {
        let client = GraphqlClient::new(
            ProviderKind::LeetCode,
            config.endpoint.clone(),
            config.http.clone(),
        )?;

        info!(
            endpoint = %config.endpoint,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Configured LeetCode provider"
        );

        Ok(Self {
            client,
            upstream: CachedUpstream::new(ProviderKind::LeetCode, cache, config.cache_ttl),
        })
    }
}

impl ActivityProvider for LeetCodeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LeetCode
    }

    fn fetch_raw<'a>(
        &'a self,
        identity: &'a str,
    ) -> BoxFuture<'a, ProviderResult<FetchOutcome<Arc<Value>>>> {
        Box::pin(async move {
            let identity = self.upstream.identity(identity)?;
            let request = self.client.query(
                SUBMISSION_CALENDAR_QUERY,
                json!({ "username": identity }),
                None,
            );

            self.upstream
                .fetch(identity, request, normalize_calendar)
                .await
        })
    }

    fn normalize(&self, payload: &Value) -> ProviderResult<ActivityMap> {
        normalize_calendar(payload)
    }
}
