//! Bounded GraphQL-over-HTTP client shared by the adapters.
//!
//! Each request gets a hard deadline covering connect, send and body read,
//! and the response body is read chunk by chunk up to a size limit.

use std::time::Duration;

use devheat_core::ProviderKind;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Transport limits for upstream requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// Hard deadline for a whole request, including the body.
    pub timeout: Duration,
    /// Largest accepted response body, in bytes.
    pub max_body_bytes: usize,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl HttpOptions {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

    /// Default response size limit.
    pub const DEFAULT_MAX_BODY_BYTES: usize = 500 * 1024;

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the response size limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
            user_agent: format!("devheat/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Maps an upstream HTTP status to an error class.
///
/// 2xx and 3xx are accepted.
pub fn classify_status(status: StatusCode) -> ProviderResult<()> {
    if status.is_success() || status.is_redirection() {
        return Ok(());
    }

    let message = format!("upstream returned HTTP {}", status.as_u16());
    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::not_found(message),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited(message)
        }
        StatusCode::UNAUTHORIZED => ProviderError::configuration(message),
        s if s.is_server_error() => ProviderError::server(message),
        _ => ProviderError::invalid_response(message),
    })
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("request timeout: {}", e))
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// HTTP client for one GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    client: Client,
    endpoint: Url,
    options: HttpOptions,
    kind: ProviderKind,
}

impl GraphqlClient {
    /// Creates a new client for the given endpoint.
    pub fn new(kind: ProviderKind, endpoint: Url, options: HttpOptions) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_provider(kind)
            })?;

        Ok(Self {
            client,
            endpoint,
            options,
            kind,
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts a GraphQL query and returns the decoded JSON body.
    ///
    /// The whole exchange is bounded by the configured timeout; an elapsed
    /// deadline is reported as [`ProviderErrorCode::Timeout`](crate::ProviderErrorCode::Timeout).
    pub async fn query(
        &self,
        query: &str,
        variables: Value,
        bearer_token: Option<&str>,
    ) -> ProviderResult<Value> {
        let kind = self.kind;
        let timeout = self.options.timeout;

        match tokio::time::timeout(timeout, self.send(query, variables, bearer_token)).await {
            Ok(result) => result.map_err(|e| e.with_provider(kind)),
            Err(_) => Err(ProviderError::timeout(format!(
                "no response within {}ms",
                timeout.as_millis()
            ))
            .with_provider(kind)),
        }
    }

    async fn send(
        &self,
        query: &str,
        variables: Value,
        bearer_token: Option<&str>,
    ) -> ProviderResult<Value> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }));

        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        trace!(provider = %self.kind, endpoint = %self.endpoint, "Sending GraphQL request");

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(provider = %self.kind, status = status.as_u16(), "Upstream responded");

        classify_status(status)?;

        let body = self.read_body(response).await?;
        serde_json::from_slice(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_source(e)
        })
    }

    async fn read_body(&self, mut response: Response) -> ProviderResult<Vec<u8>> {
        let limit = self.options.max_body_bytes;
        let too_large = || {
            ProviderError::invalid_response(format!("response body exceeds {} bytes", limit))
        };

        if response
            .content_length()
            .is_some_and(|length| length > limit as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
