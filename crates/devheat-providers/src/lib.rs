//! ActivityProvider trait and upstream adapters.
//!
//! This crate provides the abstraction layer for activity sources:
//!
//! - [`ActivityProvider`] - The core trait that all upstream adapters implement
//! - [`CachedUpstream`] - Cache-first fetch pipeline with stale fallback
//! - [`GraphqlClient`] - Bounded HTTP client for GraphQL endpoints
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  GitHub GraphQL │    │ LeetCode GraphQL│
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ GitHubProvider  │    │LeetCodeProvider │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │    CachedUpstream    │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼ raw payload (cached)
//!              ┌─────────────┐
//!              │ normalize() │
//!              └──────┬──────┘
//!                     │
//!                     ▼
//!              ┌─────────────┐
//!              │ ActivityMap │
//!              └─────────────┘
//! ```

pub mod cached;
pub mod error;
pub mod github;
pub mod http;
pub mod leetcode;
pub mod provider;

// Re-export main types at crate root
pub use cached::CachedUpstream;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use github::{GitHubConfig, GitHubProvider};
pub use http::{GraphqlClient, HttpOptions, classify_status};
pub use leetcode::{LeetCodeConfig, LeetCodeProvider};
pub use provider::{ActivityProvider, BoxFuture, ErrorProvider, FetchOutcome, Freshness};
