pub mod audio_routes;
pub mod upload;

use crate::auth::IdentityProvider;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::journal::JournalService;
use crate::middleware::RequestId;
use crate::monitoring::HealthTracker;
use crate::storage::{ObjectStore, StorageError};
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{dev::Server, web, App, Error, HttpResponse, HttpServer};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Everything handlers need, shared across workers.
pub struct AppState {
    pub journal: JournalService,
    pub objects: Arc<dyn ObjectStore>,
    pub health: HealthTracker,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        journal: JournalService,
        objects: Arc<dyn ObjectStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            journal,
            objects,
            health: HealthTracker::new(),
            max_upload_bytes,
        }
    }
}

async fn root_handler() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Audio journal backend is running\n\nTry /health or /ready\n"))
}

async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let database_ok = match state.journal.ping_store().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "health check: document store unreachable");
            false
        }
    };
    let status = state.health.status(database_ok);
    if database_ok {
        Ok(HttpResponse::Ok().json(status))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(status))
    }
}

async fn ready_check(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let store_ok = state.journal.ping_store().await.is_ok();
    if state.health.is_ready() && store_ok {
        Ok(HttpResponse::Ok().json(json!({
            "status": "ready",
            "search_cache": state.journal.cache_stats(),
            "timestamp": Utc::now().to_rfc3339(),
        })))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(json!({
            "status": "not ready",
            "timestamp": Utc::now().to_rfc3339(),
        })))
    }
}

async fn get_metrics() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(crate::monitoring::export_prometheus()))
}

async fn serve_media(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let object = match state.objects.get(&path).await {
        Ok(object) => object,
        Err(StorageError::InvalidPath(_)) | Err(StorageError::NotFound(_)) => {
            return Err(ApiError::not_found("Media not found"));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok()
        .content_type(object.content_type)
        .insert_header((header::CACHE_CONTROL, "private, max-age=3600"))
        .body(object.bytes))
}

/// Routes, plus JSON/query extractor configs that answer with `{"error": ...}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .route("/", web::get().to(root_handler))
    .route("/health", web::get().to(health_check))
    .route("/ready", web::get().to(ready_check))
    .route("/metrics", web::get().to(get_metrics))
    .route("/media/{path:.*}", web::get().to(serve_media))
    .configure(audio_routes::configure);
}

fn build_cors(allowed_origin: Option<&str>) -> Cors {
    let cors = match allowed_origin {
        Some(origin) => Cors::default().allowed_origin(origin),
        None => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers(vec!["X-Cache", "X-Request-Id"])
        .max_age(3600)
}

/// Bind and return the running server. Readiness flips once bound.
pub fn start_api_server(
    config: &ApiConfig,
    state: AppState,
    identity: Arc<dyn IdentityProvider>,
) -> std::io::Result<Server> {
    let bind_addr = config.bind_addr();
    let cors_origin = config.cors_allowed_origin.clone();
    let state = web::Data::new(state);
    let identity: web::Data<dyn IdentityProvider> = web::Data::from(identity);

    let app_state = state.clone();
    let mut http_server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(identity.clone())
            .wrap(build_cors(cors_origin.as_deref()))
            .wrap(RequestId)
            .configure(configure)
    });
    if let Some(workers) = config.workers {
        http_server = http_server.workers(workers);
    }

    let server = http_server.bind(&bind_addr)?.run();
    info!(addr = %bind_addr, "HTTP server listening");
    state.health.mark_ready();
    Ok(server)
}
