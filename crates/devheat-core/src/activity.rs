//! Activity types for the heatmap.
//!
//! This module provides the data model shared by providers and the aggregator:
//! - [`ProviderKind`]: The upstream activity sources
//! - [`ActivityMap`]: A normalized date-to-count mapping for one provider
//! - [`UnifiedDay`]: The merged per-date record for both providers
//! - [`HeatmapResponse`]: The aggregated result served to clients

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::palette::Palette;
use crate::time::CalendarDate;

/// A normalized per-provider mapping from calendar date to activity count.
///
/// Keyed by date, so there is at most one count per date.
pub type ActivityMap = BTreeMap<CalendarDate, u64>;

/// The upstream activity sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GitHub contribution calendar.
    GitHub,
    /// LeetCode submission calendar.
    LeetCode,
}

impl ProviderKind {
    /// Returns the identifier used in cache keys and query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::LeetCode => "leetcode",
        }
    }

    /// Returns a human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::LeetCode => "LeetCode",
        }
    }

    /// Returns the cache key for a raw upstream payload of this provider.
    pub fn cache_key(&self, identity: &str) -> String {
        format!("{}:{}", self.as_str(), identity)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sums the counts of an activity map, saturating at `u64::MAX`.
pub fn total_count(activity: &ActivityMap) -> u64 {
    activity
        .values()
        .fold(0, |total, count| total.saturating_add(*count))
}

/// The merged activity for a single day.
///
/// `total` always equals `github + leetcode` (saturating at `u64::MAX`);
/// use [`UnifiedDay::new`] to construct one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedDay {
    /// Combined count across providers.
    pub total: u64,
    /// GitHub contributions on this day.
    pub github: u64,
    /// LeetCode submissions on this day.
    pub leetcode: u64,
}

impl UnifiedDay {
    /// Creates a unified day from per-provider counts.
    pub fn new(github: u64, leetcode: u64) -> Self {
        Self {
            total: github.saturating_add(leetcode),
            github,
            leetcode,
        }
    }

    /// Returns true if no activity was recorded.
    pub fn is_zero(&self) -> bool {
        self.total == 0
    }
}

/// Per-provider error messages attached to a partially failed response.
///
/// Both slots are always serialized; `null` means that provider had no error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrors {
    pub github: Option<String>,
    pub leetcode: Option<String>,
}

impl ProviderErrors {
    /// Returns true if no provider has an error.
    pub fn is_empty(&self) -> bool {
        self.github.is_none() && self.leetcode.is_none()
    }
}

/// Metadata describing how a heatmap response was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapMeta {
    /// GitHub identity queried, if any.
    pub github: Option<String>,
    /// LeetCode identity queried, if any.
    pub leetcode: Option<String>,
    /// First day of the window.
    pub from: CalendarDate,
    /// Last day of the window.
    pub to: CalendarDate,
    /// When the response was built.
    pub generated_at: DateTime<Utc>,
    /// Whether the response was served from the merge cache.
    pub cache_hit: bool,
    /// Palette requested by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
    /// Errors for providers that failed or were served from stale data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ProviderErrors>,
}

/// The aggregated, date-indexed heatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapResponse {
    pub meta: HeatmapMeta,
    pub days: BTreeMap<CalendarDate, UnifiedDay>,
}

impl HeatmapResponse {
    /// Returns a copy marked as served from cache.
    pub fn as_cache_hit(&self) -> Self {
        let mut response = self.clone();
        response.meta.cache_hit = true;
        response
    }

    /// Returns the combined total over all days, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.days
            .values()
            .fold(0, |total, day| total.saturating_add(day.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_meta() -> HeatmapMeta {
        HeatmapMeta {
            github: Some("octocat".to_string()),
            leetcode: None,
            from: date(2024, 1, 1),
            to: date(2024, 1, 31),
            generated_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
            cache_hit: false,
            palette: None,
            errors: None,
        }
    }

    #[test]
    fn provider_kind_names() {
        assert_eq!(ProviderKind::GitHub.as_str(), "github");
        assert_eq!(ProviderKind::LeetCode.display_name(), "LeetCode");
        assert_eq!(ProviderKind::GitHub.cache_key("octocat"), "github:octocat");
        assert_eq!(ProviderKind::LeetCode.cache_key("neal"), "leetcode:neal");
        assert_eq!(ProviderKind::LeetCode.to_string(), "leetcode");
    }

    #[test]
    fn unified_day_total() {
        let day = UnifiedDay::new(5, 3);
        assert_eq!(day.total, 8);
        assert_eq!(day.github, 5);
        assert_eq!(day.leetcode, 3);
        assert!(!day.is_zero());
        assert!(UnifiedDay::new(0, 0).is_zero());
    }

    #[test]
    fn provider_errors_slots() {
        assert!(ProviderErrors::default().is_empty());

        let errors = ProviderErrors {
            github: None,
            leetcode: Some("LeetCode user not found".to_string()),
        };
        assert!(!errors.is_empty());
    }

    #[test]
    fn response_json_shape() {
        let mut days = BTreeMap::new();
        days.insert(date(2024, 1, 15), UnifiedDay::new(5, 0));

        let mut meta = sample_meta();
        meta.errors = Some(ProviderErrors {
            github: None,
            leetcode: Some("boom".to_string()),
        });

        let response = HeatmapResponse { meta, days };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["meta"]["github"], "octocat");
        assert!(json["meta"]["leetcode"].is_null());
        assert_eq!(json["meta"]["from"], "2024-01-01");
        assert_eq!(json["meta"]["cacheHit"], false);
        assert!(json["meta"].get("palette").is_none());
        assert!(json["meta"]["errors"]["github"].is_null());
        assert_eq!(json["meta"]["errors"]["leetcode"], "boom");
        assert_eq!(
            json["days"]["2024-01-15"],
            serde_json::json!({"total": 5, "github": 5, "leetcode": 0})
        );
    }

    #[test]
    fn errors_omitted_when_absent() {
        let response = HeatmapResponse {
            meta: sample_meta(),
            days: BTreeMap::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["meta"].get("errors").is_none());
        assert_eq!(json["days"], serde_json::json!({}));
    }

    #[test]
    fn cache_hit_copy() {
        let response = HeatmapResponse {
            meta: sample_meta(),
            days: BTreeMap::new(),
        };
        let hit = response.as_cache_hit();
        assert!(hit.meta.cache_hit);
        assert!(!response.meta.cache_hit);
        assert_eq!(hit.meta.generated_at, response.meta.generated_at);
    }

    #[test]
    fn deserializes_back() {
        let mut days = BTreeMap::new();
        days.insert(date(2024, 1, 15), UnifiedDay::new(2, 1));
        let response = HeatmapResponse {
            meta: sample_meta(),
            days,
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: HeatmapResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total(), 3);
        assert_eq!(parsed.meta.from, date(2024, 1, 1));
        assert_eq!(parsed.meta.to, date(2024, 1, 31));
    }

    #[test]
    fn total_count_sums() {
        let mut activity = ActivityMap::new();
        activity.insert(date(2024, 1, 1), 3);
        activity.insert(date(2024, 1, 2), 4);
        assert_eq!(total_count(&activity), 7);
    }

    #[test]
    fn extreme_counts_saturate() {
        let day = UnifiedDay::new(1, u64::MAX);
        assert_eq!(day.total, u64::MAX);
        assert_eq!(day.leetcode, u64::MAX);

        let mut activity = ActivityMap::new();
        activity.insert(date(2024, 1, 1), u64::MAX);
        activity.insert(date(2024, 1, 2), 2);
        assert_eq!(total_count(&activity), u64::MAX);

        let mut days = BTreeMap::new();
        days.insert(date(2024, 1, 1), day);
        days.insert(date(2024, 1, 2), UnifiedDay::new(3, 0));
        let response = HeatmapResponse {
            meta: sample_meta(),
            days,
        };
        assert_eq!(response.total(), u64::MAX);
    }
}
