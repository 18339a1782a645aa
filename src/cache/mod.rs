// src/cache/mod.rs
// In-process caching for per-user search results

pub mod search_cache;

pub use search_cache::{CacheKey, SearchCacheStats, SearchResultCache};

use std::time::Duration;

pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(60);
