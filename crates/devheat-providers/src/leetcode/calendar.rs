//! LeetCode submission calendar decoding.

use std::sync::LazyLock;

use devheat_core::{ActivityMap, ProviderKind, date_from_epoch_seconds};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ProviderError, ProviderResult};

/// GraphQL query for a user's submission calendar.
pub const SUBMISSION_CALENDAR_QUERY: &str = r#"
query ($username: String!) {
  matchedUser(username: $username) {
    submissionCalendar
  }
}
"#;

/// `"<digits>": <digits>` pairs, for calendars that are not valid JSON.
static ENTRY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\d+)"\s*:\s*(\d+)"#).expect("Invalid calendar entry regex"));

/// One decoder in the submission calendar pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// The calendar is already a JSON object.
    Structured,
    /// The calendar is a string holding a JSON object.
    JsonString,
    /// The calendar is a string that is not valid JSON; entries are
    /// recovered by pattern matching.
    PatternScan,
}

impl DecodeStage {
    /// Stages in the order they are tried.
    pub const PIPELINE: [DecodeStage; 3] = [
        DecodeStage::Structured,
        DecodeStage::JsonString,
        DecodeStage::PatternScan,
    ];

    /// Returns a short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::JsonString => "json_string",
            Self::PatternScan => "pattern_scan",
        }
    }

    /// Runs this stage, returning `None` if it does not apply.
    pub fn decode(&self, raw: &Value) -> Option<ActivityMap> {
        match self {
            Self::Structured => raw.as_object().map(decode_object),
            Self::JsonString => raw
                .as_str()
                .and_then(|text| serde_json::from_str::<Map<String, Value>>(text).ok())
                .map(|object| decode_object(&object)),
            Self::PatternScan => raw.as_str().and_then(scan_entries),
        }
    }
}

fn add_entry(activity: &mut ActivityMap, timestamp: i64, count: u64) {
    if let Some(date) = date_from_epoch_seconds(timestamp) {
        let total = activity.entry(date).or_insert(0);
        *total = total.saturating_add(count);
    }
}

fn decode_object(object: &Map<String, Value>) -> ActivityMap {
    let mut activity = ActivityMap::new();
    for (timestamp, count) in object {
        // Non-integer keys and counts are skipped.
        if let (Ok(timestamp), Some(count)) = (timestamp.trim().parse::<i64>(), count.as_u64()) {
            add_entry(&mut activity, timestamp, count);
        }
    }
    activity
}

fn scan_entries(text: &str) -> Option<ActivityMap> {
    let mut activity = ActivityMap::new();
    let mut matched = false;

    for captures in ENTRY_PATTERN.captures_iter(text) {
        matched = true;
        if let (Ok(timestamp), Ok(count)) = (captures[1].parse::<i64>(), captures[2].parse::<u64>())
        {
            add_entry(&mut activity, timestamp, count);
        }
    }

    matched.then_some(activity)
}

/// Decodes a raw `submissionCalendar` value.
///
/// Returns the first stage of [`DecodeStage::PIPELINE`] that applies,
/// together with its mapping. Timestamps falling on the same UTC date are
/// summed.
pub fn decode_submission_calendar(raw: &Value) -> Option<(DecodeStage, ActivityMap)> {
    DecodeStage::PIPELINE
        .into_iter()
        .find_map(|stage| stage.decode(raw).map(|activity| (stage, activity)))
}

fn submission_calendar(payload: &Value) -> ProviderResult<&Value> {
    let user = payload
        .get("data")
        .and_then(|data| data.get("matchedUser"))
        .filter(|user| !user.is_null())
        .ok_or_else(|| {
            ProviderError::not_found("GraphQL response has no matchedUser")
                .with_provider(ProviderKind::LeetCode)
        })?;

    match user.get("submissionCalendar") {
        None | Some(Value::Null) => Err(ProviderError::invalid_response(
            "matchedUser has no submissionCalendar",
        )
        .with_provider(ProviderKind::LeetCode)),
        Some(raw) => Ok(raw),
    }
}

/// Normalizes a GraphQL response into a date-to-count mapping.
pub fn normalize_calendar(payload: &Value) -> ProviderResult<ActivityMap> {
    let raw = submission_calendar(payload)?;

    let (stage, activity) = decode_submission_calendar(raw).ok_or_else(|| {
        ProviderError::invalid_response("unrecognized submissionCalendar encoding")
            .with_provider(ProviderKind::LeetCode)
    })?;

    trace!(stage = stage.as_str(), days = activity.len(), "Decoded submission calendar");
    Ok(activity)
}
