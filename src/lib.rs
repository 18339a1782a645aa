pub mod db {
    pub mod schema_init;
}
pub mod ai;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod journal;
pub mod middleware;
pub mod monitoring;
pub mod storage;
pub mod store;

pub use cache::SearchResultCache;
pub use journal::JournalService;
