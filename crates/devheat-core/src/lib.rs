//! Core types: calendar dates, activity maps, palettes, the TTL cache

pub mod activity;
pub mod cache;
pub mod palette;
pub mod time;
pub mod tracing;

pub use activity::{
    total_count, ActivityMap, HeatmapMeta, HeatmapResponse, ProviderErrors, ProviderKind,
    UnifiedDay,
};
pub use cache::{CacheEntry, CacheValue, Lookup, ResponseCache, SharedCache, TtlCache};
pub use palette::{Palette, UnknownPalette};
pub use time::{
    date_from_epoch_seconds, parse_calendar_date, today_utc, CalendarDate, DateParseError,
    DateRange,
};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
