//! LeetCode provider configuration.

use std::time::Duration;
use url::Url;

use crate::http::HttpOptions;

/// Configuration for the LeetCode provider.
#[derive(Debug, Clone)]
pub struct LeetCodeConfig {
    /// GraphQL endpoint.
    pub endpoint: Url,

    /// How long a fetched payload stays fresh.
    pub cache_ttl: Duration,

    /// Transport limits. The default sends a browser user agent.
    pub http: HttpOptions,
}

impl LeetCodeConfig {
    /// Default GraphQL endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://leetcode.com/graphql";

    /// Default cache TTL in seconds.
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

    /// Default user agent.
    pub const DEFAULT_USER_AGENT: &'static str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15";

    /// Creates a configuration with the public endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: Url::parse(Self::DEFAULT_ENDPOINT).expect("Invalid default LeetCode endpoint"),
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_SECS),
            http: HttpOptions::default().with_user_agent(Self::DEFAULT_USER_AGENT),
        }
    }

    /// Sets the GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Result<Self, url::ParseError> {
        self.endpoint = Url::parse(endpoint.as_ref())?;
        Ok(self)
    }

    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the transport limits.
    pub fn with_http(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self::new()
    }
}
