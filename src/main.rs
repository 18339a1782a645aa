// src/main.rs
use audio_journal::ai::build_ai_services;
use audio_journal::api::{start_api_server, AppState};
use audio_journal::auth::build_identity_provider;
use audio_journal::config::ApiConfig;
use audio_journal::journal::JournalService;
use audio_journal::monitoring::{self, MonitoringConfig};
use audio_journal::storage::LocalObjectStore;
use audio_journal::store::SqliteDocumentStore;
use std::io;
use std::sync::Arc;
use tracing::{error, info};

fn startup_error(stage: &str, err: impl std::fmt::Display) -> io::Error {
    error!(stage, error = %err, "startup failed");
    io::Error::other(format!("{}: {}", stage, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ApiConfig::from_env().map_err(|e| io::Error::other(e.to_string()))?;

    let monitoring_config = MonitoringConfig::from_env();
    let _log_guard = monitoring::init_tracing(&monitoring_config)?;
    monitoring::metrics::init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "Starting audio journal backend"
    );

    let store = SqliteDocumentStore::open(&config.db_path())
        .map_err(|e| startup_error("database", e))?;
    info!(path = %config.db_path().display(), "Document store ready");

    let objects = Arc::new(
        LocalObjectStore::new(config.media_dir(), &config.public_base_url)
            .map_err(|e| startup_error("media", e))?,
    );
    let ai = build_ai_services(&config).map_err(|e| startup_error("ai", e))?;
    let identity = build_identity_provider(&config).map_err(|e| startup_error("auth", e))?;

    let journal = JournalService::new(
        Arc::new(store),
        objects.clone(),
        ai,
        config.search_cache_ttl,
        config.max_query_len,
    );
    info!(
        ttl_secs = config.search_cache_ttl.as_secs(),
        max_query_len = config.max_query_len,
        "Search cache configured"
    );

    let state = AppState::new(journal, objects, config.max_upload_bytes);
    start_api_server(&config, state, identity)?.await
}
