//! HTTP server: heatmap aggregation, passthrough routes, rate limiting.
//!
//! This crate wires the providers and the shared response cache into an
//! axum application:
//! - [`Aggregator`] merges both providers into a cached heatmap
//! - [`routes::router`] exposes the JSON API
//! - [`Sweeper`] removes expired cache entries in the background
//! - [`SignalHandler`] turns SIGTERM/SIGINT into a graceful shutdown
//!
//! # Example
//!
//! ```rust,no_run
//! use devheat_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default().with_github_token("ghp_...");
//!     run_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod signals;
pub mod sweeper;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use devheat_core::{ResponseCache, SharedCache};
use devheat_providers::{ActivityProvider, GitHubProvider, LeetCodeProvider};
use tracing::{info, warn};

pub use aggregator::{AggregateError, Aggregator, AggregatorConfig, HeatmapQuery};
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use routes::AppState;
pub use signals::{ShutdownHandle, SignalHandler};
pub use sweeper::Sweeper;

/// The assembled application: router plus the shared state the background
/// tasks need.
pub struct App {
    pub router: Router,
    pub cache: SharedCache,
    pub limiter: RateLimiter,
}

/// Builds providers, the aggregator and the router from configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or an HTTP client
/// cannot be created.
pub fn build_app(config: &ServerConfig) -> ServerResult<App> {
    config.validate()?;

    let cache: SharedCache = Arc::new(ResponseCache::new(config.stale_retention()));

    let github_config = config.github_config()?;
    if !github_config.has_token() {
        warn!("No GitHub token configured, GitHub requests will fail with a configuration error");
    }
    let github: Arc<dyn ActivityProvider> =
        Arc::new(GitHubProvider::new(github_config, cache.clone())?);
    let leetcode: Arc<dyn ActivityProvider> =
        Arc::new(LeetCodeProvider::new(config.leetcode_config()?, cache.clone())?);

    let aggregator = Aggregator::new(
        cache.clone(),
        github,
        leetcode,
        config.aggregator_config(),
    );
    let limiter = RateLimiter::new(config.rate_limit_config());
    let router = routes::router(AppState::new(Arc::new(aggregator)), limiter.clone());

    Ok(App {
        router,
        cache,
        limiter,
    })
}

/// Runs the server until SIGTERM or SIGINT.
pub async fn run_server(config: ServerConfig) -> ServerResult<()> {
    let app = build_app(&config)?;

    let signals = SignalHandler::new();
    signals.spawn_listener();
    let shutdown = signals.shutdown_handle();

    let mut sweeper = Sweeper::new(app.cache, config.sweep_interval());
    if config.rate_limit_config().is_enabled() {
        sweeper = sweeper.with_rate_limiter(app.limiter);
    }
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.wait()));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        rate_limit = config.rate_limit.max_requests,
        "devheat listening"
    );

    let graceful = shutdown.wait();
    axum::serve(
        listener,
        app.router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful.wait())
    .await?;

    // The listener can also stop on its own; make sure the sweeper follows.
    shutdown.trigger();
    let _ = sweeper_task.await;

    info!("Server stopped");
    Ok(())
}
