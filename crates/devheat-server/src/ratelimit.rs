//! Fixed-window per-client rate limiting.
//!
//! Each client (keyed by forwarded address or peer address) gets a counter
//! that resets when its window elapses. Every response carries
//! `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`;
//! requests over the limit get `429` with `Retry-After`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, trace};

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Window end used when the configured length would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window; 0 disables limiting.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Returns true if requests are limited.
    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
    reset_wall: DateTime<Utc>,
}

impl Window {
    fn open(now: Instant, wall: DateTime<Utc>, length: Duration) -> Self {
        let reset_wall = TimeDelta::from_std(length)
            .ok()
            .and_then(|delta| wall.checked_add_signed(delta))
            .unwrap_or(wall);
        Self {
            count: 0,
            reset_at: now
                .checked_add(length)
                .unwrap_or_else(|| now + FAR_FUTURE),
            reset_wall,
        }
    }
}

/// The result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until the window resets, rounded up.
    pub retry_after: u64,
}

impl RateLimitDecision {
    /// Writes the `X-RateLimit-*` headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
        if let Ok(reset) =
            HeaderValue::from_str(&self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        {
            headers.insert(X_RATELIMIT_RESET.clone(), reset);
        }
    }
}

/// Per-client fixed-window counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts a request for `client`.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now(), Utc::now())
    }

    fn check_at(&self, client: &str, now: Instant, wall: DateTime<Utc>) -> RateLimitDecision {
        let length = self.config.window;
        let mut window = self
            .windows
            .entry(client.to_string())
            .or_insert_with(|| Window::open(now, wall, length));

        if now > window.reset_at {
            *window = Window::open(now, wall, length);
        }
        window.count = window.count.saturating_add(1);

        let until_reset = window.reset_at.saturating_duration_since(now);
        RateLimitDecision {
            allowed: window.count <= self.config.max_requests,
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(window.count),
            reset_at: window.reset_wall,
            retry_after: until_reset.as_secs() + u64::from(until_reset.subsec_nanos() > 0),
        }
    }

    /// Drops windows that have elapsed, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.reset_at);
        let removed = before.saturating_sub(self.windows.len());
        trace!(removed, "Swept rate limit windows");
        removed
    }

    /// Returns the number of tracked clients.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns true if no client is tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identifies the client behind a request.
///
/// Uses the first `X-Forwarded-For` address, then `X-Real-IP`, then the
/// peer address, then `"unknown"`.
pub fn client_key(request: &Request) -> String {
    if let Some(first) = header_str(request, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_str(request, "x-real-ip") {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Response for a client over its limit.
#[derive(Debug)]
pub struct RateLimitExceeded {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "Too many requests, please try again later.",
            "retryAfter": self.retry_after,
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after));
        response
    }
}

/// Rate limiting middleware.
///
/// ```ignore
/// Router::new()
///     .route("/api/heatmap", get(heatmap))
///     .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
/// ```
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.config().is_enabled() {
        return next.run(request).await;
    }

    let client = client_key(&request);
    let decision = limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        debug!(
            client = %client,
            retry_after = decision.retry_after,
            "Rate limit exceeded"
        );
        RateLimitExceeded {
            retry_after: decision.retry_after,
        }
        .into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}
