//! Background expiry sweep.
//!
//! Reads evict lazily, so entries that are never read again would stay in
//! memory. The sweeper runs on a fixed interval independent of traffic and
//! drops expired cache entries and elapsed rate limit windows.

use std::time::Duration;

use devheat_core::SharedCache;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::ratelimit::RateLimiter;
use crate::signals::ShutdownSignal;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cache_entries: usize,
    pub rate_limit_windows: usize,
}

/// Periodically sweeps the response cache and the rate limiter.
pub struct Sweeper {
    cache: SharedCache,
    limiter: Option<RateLimiter>,
    interval: Duration,
}

impl Sweeper {
    /// Default interval between sweeps.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Creates a sweeper for `cache`.
    pub fn new(cache: SharedCache, interval: Duration) -> Self {
        Self {
            cache,
            limiter: None,
            interval,
        }
    }

    /// Builder: also sweep the rate limiter.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Runs one sweep.
    pub fn sweep_once(&self) -> SweepReport {
        let report = SweepReport {
            cache_entries: self.cache.sweep(),
            rate_limit_windows: self.limiter.as_ref().map_or(0, RateLimiter::sweep),
        };
        debug!(
            cache_entries = report.cache_entries,
            rate_limit_windows = report.rate_limit_windows,
            remaining = self.cache.len(),
            "Sweep completed"
        );
        report
    }

    /// Sweeps every interval until `shutdown` fires.
    pub async fn run(self, shutdown: ShutdownSignal) {
        info!(interval_secs = self.interval.as_secs(), "Cache sweeper started");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = shutdown.wait();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = &mut shutdown => {
                    info!("Cache sweeper stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimitConfig;
    use crate::signals::SignalHandler;
    use devheat_core::{CacheValue, ResponseCache};
    use serde_json::json;
    use std::sync::Arc;

    fn cache_without_retention() -> SharedCache {
        Arc::new(ResponseCache::new(Duration::ZERO))
    }

    fn upstream_value() -> CacheValue {
        CacheValue::Upstream(Arc::new(json!({"data": {}})))
    }

    #[test]
    fn sweep_once_reports_removals() {
        let cache = cache_without_retention();
        cache.set("github:old", upstream_value(), Duration::ZERO);
        cache.set("github:new", upstream_value(), Duration::from_secs(60));

        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 10,
            window: Duration::from_millis(1),
        });
        limiter.check("203.0.113.7");

        std::thread::sleep(Duration::from_millis(5));

        let sweeper = Sweeper::new(cache.clone(), Sweeper::DEFAULT_INTERVAL)
            .with_rate_limiter(limiter.clone());
        let report = sweeper.sweep_once();

        assert_eq!(
            report,
            SweepReport {
                cache_entries: 1,
                rate_limit_windows: 1,
            }
        );
        assert_eq!(cache.len(), 1);
        assert!(limiter.is_empty());
    }

    #[tokio::test]
    async fn runs_until_shutdown() {
        let cache = cache_without_retention();
        cache.set("leetcode:old", upstream_value(), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(5)).await;

        let handler = SignalHandler::new();
        let sweeper = Sweeper::new(cache.clone(), Duration::from_millis(10));
        let task = tokio::spawn(sweeper.run(handler.shutdown_handle().wait()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());

        handler.trigger_shutdown();
        let result = tokio::time::timeout(Duration::from_millis(100), task).await;
        assert!(result.is_ok());
    }
}
