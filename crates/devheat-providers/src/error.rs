//! Error types for upstream provider operations.
//!
//! Every failure an adapter can produce is classified with a
//! [`ProviderErrorCode`]. The code decides whether stale data may be served
//! in its place and which HTTP status the server answers with, while
//! [`ProviderError::user_message`] gives the text shown to API clients.

use std::fmt;

use devheat_core::ProviderKind;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The identity does not exist upstream, or the payload names no user.
    NotFound,
    /// The upstream refused the request because of rate limits (403, 429).
    RateLimited,
    /// The upstream did not answer within the request timeout.
    Timeout,
    /// Connection failed, DNS resolution failed, the body could not be read.
    NetworkError,
    /// The upstream returned a 5xx status.
    ServerError,
    /// Unexpected status, unparseable body, or a body over the size limit.
    InvalidResponse,
    /// Missing or rejected credentials on our side.
    ConfigurationError,
    /// The request itself was unusable (e.g. an empty identity).
    BadRequest,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::BadRequest => "bad_request",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while fetching from an upstream provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// Diagnostic message, for logs.
    message: String,
    /// The provider that generated this error.
    provider: Option<ProviderKind>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Sets the provider for this error.
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider, if set.
    pub fn provider(&self) -> Option<ProviderKind> {
        self.provider
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns the message shown to API clients.
    ///
    /// Unlike [`ProviderError::message`], this never leaks upstream details.
    pub fn user_message(&self) -> String {
        let name = self
            .provider
            .map(|provider| provider.display_name())
            .unwrap_or("upstream");

        match self.code {
            ProviderErrorCode::NotFound => format!("{name} user not found"),
            ProviderErrorCode::RateLimited => format!("{name} API rate limit exceeded"),
            ProviderErrorCode::Timeout | ProviderErrorCode::NetworkError => {
                format!("{name} API timeout or network error")
            }
            ProviderErrorCode::ServerError => {
                format!("Failed to fetch {name} data. Please try again later.")
            }
            ProviderErrorCode::InvalidResponse => match self.provider {
                Some(ProviderKind::LeetCode) => "No data found for this LeetCode user".to_string(),
                _ => "No valid data found for this user".to_string(),
            },
            ProviderErrorCode::ConfigurationError => "Server configuration error".to_string(),
            ProviderErrorCode::BadRequest => "Username is required".to_string(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
