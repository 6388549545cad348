//! Heatmap aggregation.
//!
//! The [`Aggregator`] validates a [`HeatmapQuery`], consults the merge cache,
//! fans out to both providers, and merges their activity into a
//! [`HeatmapResponse`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use devheat_core::{
    ActivityMap, CacheValue, CalendarDate, DateParseError, DateRange, HeatmapMeta,
    HeatmapResponse, Palette, ProviderErrors, ProviderKind, SharedCache, UnifiedDay,
    UnknownPalette, today_utc,
};
use devheat_providers::ActivityProvider;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Aggregation errors.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Neither identity was supplied.
    #[error("At least one username (github or leetcode) is required")]
    MissingIdentity,

    /// `from` or `to` is not a calendar date.
    #[error("Invalid date format. Use ISO 8601 (YYYY-MM-DD)")]
    InvalidDate(#[source] DateParseError),

    /// `cacheTTL` is not a non-negative integer.
    #[error("Invalid cacheTTL. Use a non-negative number of seconds")]
    InvalidCacheTtl { value: String },

    /// `palette` is not a known palette.
    #[error("Invalid palette. Use one of: github, blue, mono, sunset")]
    InvalidPalette(#[source] UnknownPalette),

    /// Every requested provider failed and none had a cached fallback.
    #[error("Failed to fetch data from all providers")]
    AllProvidersFailed { github: String, leetcode: String },
}

impl AggregateError {
    /// Returns true for errors caused by the request itself.
    pub fn is_invalid_request(&self) -> bool {
        !matches!(self, Self::AllProvidersFailed { .. })
    }
}

/// Aggregator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// TTL of a merged response when the query sets none.
    pub default_ttl: Duration,
    /// Upper bound for a query-supplied TTL.
    pub max_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10 * 60),
            max_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Raw query parameters of a heatmap request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeatmapQuery {
    pub github: Option<String>,
    pub leetcode: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: Option<String>,
    #[serde(rename = "includeZeros")]
    pub include_zeros: Option<String>,
    pub palette: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl HeatmapQuery {
    /// Creates a query for the given identities.
    pub fn new(github: Option<&str>, leetcode: Option<&str>) -> Self {
        Self {
            github: github.map(String::from),
            leetcode: leetcode.map(String::from),
            ..Self::default()
        }
    }

    /// Builder: set the date window.
    pub fn with_range(mut self, from: &str, to: &str) -> Self {
        self.from = Some(from.to_string());
        self.to = Some(to.to_string());
        self
    }

    /// Builder: request zero-activity days.
    pub fn with_zeros(mut self) -> Self {
        self.include_zeros = Some("1".to_string());
        self
    }

    /// Builder: set the merge cache TTL in seconds.
    pub fn with_cache_ttl(mut self, seconds: &str) -> Self {
        self.cache_ttl = Some(seconds.to_string());
        self
    }

    /// Builder: set the palette.
    pub fn with_palette(mut self, palette: &str) -> Self {
        self.palette = Some(palette.to_string());
        self
    }

    /// Validates the query against `today`.
    pub fn validate(
        &self,
        today: CalendarDate,
        config: &AggregatorConfig,
    ) -> Result<HeatmapRequest, AggregateError> {
        let github = non_empty(&self.github).map(String::from);
        let leetcode = non_empty(&self.leetcode).map(String::from);
        if github.is_none() && leetcode.is_none() {
            return Err(AggregateError::MissingIdentity);
        }

        let range = DateRange::resolve(non_empty(&self.from), non_empty(&self.to), today)
            .map_err(AggregateError::InvalidDate)?;

        let ttl = match non_empty(&self.cache_ttl) {
            None => config.default_ttl,
            Some(value) => {
                let seconds = value
                    .parse::<u64>()
                    .map_err(|_| AggregateError::InvalidCacheTtl {
                        value: value.to_string(),
                    })?;
                Duration::from_secs(seconds).min(config.max_ttl)
            }
        };

        let palette = non_empty(&self.palette)
            .map(str::parse::<Palette>)
            .transpose()
            .map_err(AggregateError::InvalidPalette)?;

        let include_zeros = matches!(non_empty(&self.include_zeros), Some("1" | "true"));

        Ok(HeatmapRequest {
            github,
            leetcode,
            range,
            include_zeros,
            ttl,
            palette,
        })
    }
}

/// A validated heatmap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapRequest {
    pub github: Option<String>,
    pub leetcode: Option<String>,
    pub range: DateRange,
    pub include_zeros: bool,
    pub ttl: Duration,
    pub palette: Option<Palette>,
}

impl HeatmapRequest {
    /// Returns the merge cache key.
    ///
    /// Both identities are encoded as one JSON array, so an absent identity
    /// (`null`) and identities containing `:` cannot collide with other
    /// requests. The palette is not part of the key; it only decorates the
    /// response.
    pub fn cache_key(&self) -> String {
        let identities = serde_json::json!([self.github, self.leetcode]);
        let mut key = format!("heatmap:{}:{}:{}", identities, self.range.from, self.range.to);
        if self.include_zeros {
            key.push_str(":zeros");
        }
        key
    }
}

/// Merges two activity maps over `range`.
///
/// Dates outside the range are dropped, and days whose combined total is
/// zero are dropped unless `include_zeros` is set.
pub fn merge_activity(
    github: &ActivityMap,
    leetcode: &ActivityMap,
    range: DateRange,
    include_zeros: bool,
) -> BTreeMap<CalendarDate, UnifiedDay> {
    let dates: BTreeSet<CalendarDate> = github
        .keys()
        .chain(leetcode.keys())
        .copied()
        .filter(|date| range.contains(*date))
        .collect();

    dates
        .into_iter()
        .filter_map(|date| {
            let day = UnifiedDay::new(
                github.get(&date).copied().unwrap_or(0),
                leetcode.get(&date).copied().unwrap_or(0),
            );
            (include_zeros || !day.is_zero()).then_some((date, day))
        })
        .collect()
}

/// Result of one provider fetch within an aggregation.
#[derive(Debug, Default)]
struct ProviderSlot {
    activity: ActivityMap,
    /// User-facing message, set on failure or stale fallback.
    message: Option<String>,
    failed: bool,
}

async fn fetch_slot(provider: &dyn ActivityProvider, identity: Option<&str>) -> ProviderSlot {
    let Some(identity) = identity else {
        return ProviderSlot::default();
    };
    let kind = provider.kind();

    match provider.fetch(identity).await {
        Ok(outcome) => {
            let message = outcome.freshness.stale_reason().map(|reason| {
                warn!(provider = %kind, identity, error = %reason, "Serving stale activity");
                reason.user_message()
            });
            debug!(
                provider = %kind,
                identity,
                days = outcome.value.len(),
                freshness = ?outcome.freshness,
                "Fetched activity"
            );
            ProviderSlot {
                activity: outcome.value,
                message,
                failed: false,
            }
        }
        Err(e) => {
            warn!(provider = %kind, identity, error = %e, "Activity fetch failed");
            ProviderSlot {
                activity: ActivityMap::new(),
                message: Some(e.user_message()),
                failed: true,
            }
        }
    }
}

/// Combines both providers into heatmap responses, caching merged results.
pub struct Aggregator {
    cache: SharedCache,
    github: Arc<dyn ActivityProvider>,
    leetcode: Arc<dyn ActivityProvider>,
    config: AggregatorConfig,
}

impl Aggregator {
    /// Creates an aggregator over both providers.
    pub fn new(
        cache: SharedCache,
        github: Arc<dyn ActivityProvider>,
        leetcode: Arc<dyn ActivityProvider>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            cache,
            github,
            leetcode,
            config,
        }
    }

    /// Returns the shared response cache.
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Returns the provider for `kind`.
    pub fn provider(&self, kind: ProviderKind) -> &dyn ActivityProvider {
        match kind {
            ProviderKind::GitHub => self.github.as_ref(),
            ProviderKind::LeetCode => self.leetcode.as_ref(),
        }
    }

    /// Builds the heatmap for a query, with today's UTC date as the default
    /// window end.
    pub async fn aggregate(&self, query: &HeatmapQuery) -> Result<HeatmapResponse, AggregateError> {
        self.aggregate_on(query, today_utc()).await
    }

    /// Builds the heatmap for a query relative to `today`.
    pub async fn aggregate_on(
        &self,
        query: &HeatmapQuery,
        today: CalendarDate,
    ) -> Result<HeatmapResponse, AggregateError> {
        let request = query.validate(today, &self.config)?;
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key).and_then(CacheValue::into_heatmap) {
            debug!(key = %key, "Heatmap cache hit");
            let mut response = cached.as_cache_hit();
            response.meta.palette = request.palette;
            return Ok(response);
        }

        let (github, leetcode) = tokio::join!(
            fetch_slot(self.github.as_ref(), request.github.as_deref()),
            fetch_slot(self.leetcode.as_ref(), request.leetcode.as_deref()),
        );

        if github.failed && leetcode.failed {
            return Err(AggregateError::AllProvidersFailed {
                github: github.message.unwrap_or_default(),
                leetcode: leetcode.message.unwrap_or_default(),
            });
        }

        let days = merge_activity(
            &github.activity,
            &leetcode.activity,
            request.range,
            request.include_zeros,
        );

        let errors = ProviderErrors {
            github: github.message,
            leetcode: leetcode.message,
        };

        let response = HeatmapResponse {
            meta: HeatmapMeta {
                github: request.github.clone(),
                leetcode: request.leetcode.clone(),
                from: request.range.from,
                to: request.range.to,
                generated_at: Utc::now(),
                cache_hit: false,
                palette: request.palette,
                errors: (!errors.is_empty()).then_some(errors),
            },
            days,
        };

        info!(
            key = %key,
            days = response.days.len(),
            total = response.total(),
            partial = response.meta.errors.is_some(),
            ttl_secs = request.ttl.as_secs(),
            "Built heatmap"
        );

        // Merged responses are never served stale, so they are not retained.
        self.cache.set_without_retention(
            key,
            CacheValue::Heatmap(Arc::new(response.clone())),
            request.ttl,
        );

        Ok(response)
    }
}
