//! HTTP routes.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/heatmap` | Merged heatmap for a GitHub and/or LeetCode user |
//! | `GET /api/github-contribs` | Raw GitHub contribution calendar |
//! | `GET /api/leetcode-contribs` | Raw LeetCode submission calendar |
//! | `GET /api/health` | Liveness and cache size |
//!
//! Every route also answers `OPTIONS` preflights, and every response carries
//! `Access-Control-Allow-Origin: *` plus a fixed set of security headers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router, middleware};
use devheat_core::{HeatmapResponse, ProviderKind};
use devheat_providers::ProviderError;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::aggregator::{Aggregator, HeatmapQuery};
use crate::error::ApiError;
use crate::ratelimit::{RateLimiter, rate_limit_middleware};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    started_at: Instant,
}

impl AppState {
    /// Creates handler state around an aggregator.
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            started_at: Instant::now(),
        }
    }
}

/// Query of the per-provider passthrough routes; `id` is accepted as an
/// alias of `username`. Blank values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
    pub id: Option<String>,
}

impl UsernameQuery {
    fn username(&self) -> Option<&str> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|value| !value.is_empty())
        }
        present(&self.username).or_else(|| present(&self.id))
    }
}

/// Builds the application router.
///
/// `OPTIONS` requests are answered by the CORS layer and are not counted
/// by the rate limiter.
pub fn router(state: AppState, limiter: RateLimiter) -> Router {
    Router::new()
        .route("/api/heatmap", get(heatmap))
        .route("/api/github-contribs", get(github_contribs))
        .route("/api/leetcode-contribs", get(leetcode_contribs))
        .route("/api/health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<HeatmapResponse>, ApiError> {
    Ok(Json(state.aggregator.aggregate(&query).await?))
}

async fn github_contribs(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<Value>, ApiError> {
    contributions(&state, ProviderKind::GitHub, &query).await
}

async fn leetcode_contribs(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<Value>, ApiError> {
    contributions(&state, ProviderKind::LeetCode, &query).await
}

async fn contributions(
    state: &AppState,
    kind: ProviderKind,
    query: &UsernameQuery,
) -> Result<Json<Value>, ApiError> {
    let username = query.username().ok_or_else(|| {
        ProviderError::bad_request("username query parameter is missing").with_provider(kind)
    })?;

    let outcome = state.aggregator.provider(kind).fetch_raw(username).await?;
    Ok(Json(Value::clone(&outcome.value)))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "cacheEntries": state.aggregator.cache().len(),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
