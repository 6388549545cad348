//! LeetCode submission calendar provider.
//!
//! LeetCode reports submissions as a mapping from Unix epoch seconds to
//! counts, usually encoded as a JSON string inside the GraphQL response.
//! [`decode_submission_calendar`] tries progressively looser decoders until
//! one succeeds.

mod calendar;
mod config;
mod provider;

pub use calendar::{
    DecodeStage, SUBMISSION_CALENDAR_QUERY, decode_submission_calendar, normalize_calendar,
};
pub use config::LeetCodeConfig;
pub use provider::LeetCodeProvider;
