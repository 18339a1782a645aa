// src/api/audio_routes.rs
use super::upload::read_upload;
use super::AppState;
use crate::ai::ChatMessage;
use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::journal::UpdateEntry;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub const CACHE_HEADER: &str = "X-Cache";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Fixed paths first so they do not match `{entry_id}`.
    cfg.service(
        web::scope("/api/audio")
            .route("/upload", web::post().to(upload_audio))
            .route("/search", web::get().to(search_entries))
            .route("", web::get().to(list_entries))
            .route("/{entry_id}/chat", web::post().to(chat_about_entry))
            .service(
                web::resource("/{entry_id}")
                    .route(web::get().to(get_entry))
                    .route(web::patch().to(update_entry))
                    .route(web::delete().to(delete_entry)),
            ),
    );
}

pub async fn upload_audio(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let upload = read_upload(payload, state.max_upload_bytes).await?;
    info!(user_id = %user.uid, size = upload.bytes.len(), "upload received");
    let entry = state.journal.upload(&user.uid, upload).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Upload successful",
        "entry": entry,
    })))
}

pub async fn list_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    let params = params.into_inner();
    let page = state
        .journal
        .list(&user.uid, params.limit, params.cursor.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn search_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> ApiResult<HttpResponse> {
    let raw = params.q.as_deref().unwrap_or("");
    let outcome = state.journal.search(&user.uid, raw).await?;
    Ok(HttpResponse::Ok()
        .insert_header((CACHE_HEADER, outcome.source.as_header_value()))
        .json(outcome.entries.as_slice()))
}

pub async fn get_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let entry = state.journal.get(&user.uid, &path).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn update_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateEntry>,
) -> ApiResult<HttpResponse> {
    let entry = state
        .journal
        .update(&user.uid, &path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn delete_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let entry_id = path.into_inner();
    state.journal.delete(&user.uid, &entry_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Entry deleted",
        "entryId": entry_id,
    })))
}

pub async fn chat_about_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ChatRequest>,
) -> ApiResult<HttpResponse> {
    let ChatRequest { message, history } = body.into_inner();
    let response = state
        .journal
        .chat(&user.uid, &path, &message, &history)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "response": response })))
}
