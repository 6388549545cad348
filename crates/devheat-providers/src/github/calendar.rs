//! GitHub contribution calendar payload.

use chrono::NaiveDate;
use devheat_core::{ActivityMap, ProviderKind};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};

/// GraphQL query for a user's contribution calendar.
pub const CONTRIBUTIONS_QUERY: &str = r#"
query ($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            contributionCount
            date
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
struct Data {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    contributions_collection: Option<ContributionsCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
}

/// The contribution calendar of one user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    /// Total reported by GitHub.
    pub total_contributions: u64,
    /// Weeks, oldest first.
    pub weeks: Vec<ContributionWeek>,
}

/// One calendar week.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionWeek {
    pub contribution_days: Vec<ContributionDay>,
}

/// One calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub contribution_count: u64,
}

impl ContributionCalendar {
    /// Flattens the weeks into a date-to-count mapping.
    pub fn to_activity(&self) -> ActivityMap {
        let mut activity = ActivityMap::new();
        for day in self.weeks.iter().flat_map(|week| &week.contribution_days) {
            *activity.entry(day.date).or_insert(0) += day.contribution_count;
        }
        activity
    }
}

/// Extracts the contribution calendar from a GraphQL response.
///
/// A response naming no user is reported as not-found; any other shape
/// mismatch as an invalid response.
pub fn parse_calendar(payload: &Value) -> ProviderResult<ContributionCalendar> {
    let envelope = Envelope::deserialize(payload).map_err(|e| {
        ProviderError::invalid_response(format!("unexpected GitHub payload: {}", e))
            .with_provider(ProviderKind::GitHub)
    })?;

    let user = envelope
        .data
        .and_then(|data| data.user)
        .ok_or_else(|| {
            ProviderError::not_found("GraphQL response has no user")
                .with_provider(ProviderKind::GitHub)
        })?;

    user.contributions_collection
        .map(|collection| collection.contribution_calendar)
        .ok_or_else(|| {
            ProviderError::invalid_response("user has no contributionsCollection")
                .with_provider(ProviderKind::GitHub)
        })
}

/// Normalizes a GraphQL response into a date-to-count mapping.
pub fn normalize_calendar(payload: &Value) -> ProviderResult<ActivityMap> {
    parse_calendar(payload).map(|calendar| calendar.to_activity())
}
