//! GitHub provider configuration.

use std::time::Duration;
use url::Url;

use crate::http::HttpOptions;

/// Configuration for the GitHub provider.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// GraphQL endpoint.
    pub endpoint: Url,

    /// Personal access token sent as a bearer token.
    pub token: Option<String>,

    /// How long a fetched payload stays fresh.
    pub cache_ttl: Duration,

    /// Transport limits.
    pub http: HttpOptions,
}

impl GitHubConfig {
    /// Default GraphQL endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.github.com/graphql";

    /// Default cache TTL in seconds.
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

    /// Creates a configuration with the public endpoint and no token.
    pub fn new() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_SECS),
            http: HttpOptions::default(),
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

    /// Sets the access token. Blank tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
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

    /// Returns true if a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_endpoint() -> Url {
    Url::parse(GitHubConfig::DEFAULT_ENDPOINT).expect("Invalid default GitHub endpoint")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = GitHubConfig::new();
        assert_eq!(config.endpoint.as_str(), "https://api.github.com/graphql");
        assert!(!config.has_token());
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.http.timeout, Duration::from_secs(8));
        assert_eq!(config.http.max_body_bytes, 500 * 1024);
    }

    #[test]
    fn config_builder_methods() {
        let config = GitHubConfig::new()
            .with_endpoint("http://localhost:8080/graphql")
            .unwrap()
            .with_token("ghp_secret")
            .with_cache_ttl(Duration::from_secs(60));

        assert_eq!(config.endpoint.as_str(), "http://localhost:8080/graphql");
        assert_eq!(config.token.as_deref(), Some("ghp_secret"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn blank_token_is_ignored() {
        assert!(!GitHubConfig::new().with_token("  ").has_token());
    }

    #[test]
    fn invalid_endpoint_returns_error() {
        assert!(GitHubConfig::new().with_endpoint("not a url").is_err());
    }
}
