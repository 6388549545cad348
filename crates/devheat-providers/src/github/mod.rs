//! GitHub contribution calendar provider.
//!
//! Queries the GitHub GraphQL API for a user's contribution calendar and
//! flattens its weeks into a date-to-count mapping.
//!
//! # Example
//!
//! ```ignore
//! use devheat_providers::github::{GitHubConfig, GitHubProvider};
//!
//! let config = GitHubConfig::new().with_token(std::env::var("GITHUB_TOKEN")?);
//! let provider = GitHubProvider::new(config, cache)?;
//! let outcome = provider.fetch("octocat").await?;
//! ```

mod calendar;
mod config;
mod provider;

pub use calendar::{CONTRIBUTIONS_QUERY, ContributionCalendar, normalize_calendar, parse_calendar};
pub use config::GitHubConfig;
pub use provider::GitHubProvider;
