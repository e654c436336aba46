//! Memory handlers.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::dto::{MemoryResponse, UpdateMemoryRequest, UploadMemoryRequest};
use crate::api::extractors::AppJson;
use crate::api::response::ErrorEnvelope;
use crate::api::AppState;
use crate::error::{KeepsakeError, Result};
use crate::models::{IngestOptions, MemoryRef};

/// Response header carrying how many submitted images were dropped as undecodable.
pub const SKIPPED_MEDIA_HEADER: &str = "x-keepsake-skipped-media";

fn parse_ref(raw: &str) -> Result<MemoryRef> {
    MemoryRef::parse(raw).ok_or_else(|| KeepsakeError::NotFound(format!("memory {raw}")))
}

/// `POST /memory/upload`
#[utoipa::path(
    post,
    path = "/memory/upload",
    tag = "memories",
    operation_id = "memories.upload",
    request_body = UploadMemoryRequest,
    responses(
        (status = 201, description = "Memory stored", body = MemoryResponse,
            headers(("x-keepsake-skipped-media" = u32, description = "Images skipped as undecodable"))),
        (status = 400, description = "Invalid request or media", body = ErrorEnvelope),
    )
)]
pub async fn upload_memory(
    State(state): State<AppState>,
    AppJson(req): AppJson<UploadMemoryRequest>,
) -> Result<impl IntoResponse> {
    let options = IngestOptions::from(&state.config.media);
    let (memory, skipped) = req.into_new_memory(&options)?;
    let report = state.memory.ingest(memory, skipped).await?;

    Ok((
        StatusCode::CREATED,
        [(SKIPPED_MEDIA_HEADER, report.skipped.len().to_string())],
        Json(MemoryResponse::from(report.memory)),
    ))
}

/// `GET /memory/random`
#[utoipa::path(
    get,
    path = "/memory/random",
    tag = "memories",
    operation_id = "memories.random",
    responses(
        (status = 200, description = "A uniformly chosen memory", body = MemoryResponse),
        (status = 404, description = "No memories stored", body = ErrorEnvelope),
    )
)]
pub async fn random_memory(State(state): State<AppState>) -> Result<Json<MemoryResponse>> {
    let memory = state.memory.random().await?;
    Ok(Json(memory.into()))
}

/// `GET /memory/{id}`
#[utoipa::path(
    get,
    path = "/memory/{id}",
    tag = "memories",
    operation_id = "memories.get",
    params(("id" = String, Path, description = "Numeric sequence (`7`) or full id (`m_007`)")),
    responses(
        (status = 200, description = "Memory found", body = MemoryResponse),
        (status = 404, description = "Memory not found", body = ErrorEnvelope),
    )
)]
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryResponse>> {
    let memory = state.memory.get(&parse_ref(&id)?).await?;
    Ok(Json(memory.into()))
}

/// `PATCH /memory/{id}`
#[utoipa::path(
    patch,
    path = "/memory/{id}",
    tag = "memories",
    operation_id = "memories.update",
    params(("id" = String, Path, description = "Numeric sequence or full id")),
    request_body = UpdateMemoryRequest,
    responses(
        (status = 200, description = "Memory updated", body = MemoryResponse),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (status = 404, description = "Memory not found", body = ErrorEnvelope),
    )
)]
pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateMemoryRequest>,
) -> Result<impl IntoResponse> {
    let memory_ref = parse_ref(&id)?;
    let options = IngestOptions::from(&state.config.media);
    let (patch, skipped) = req.into_patch(&options)?;
    let memory = state.memory.update(&memory_ref, patch).await?;

    Ok((
        [(SKIPPED_MEDIA_HEADER, skipped.len().to_string())],
        Json(MemoryResponse::from(memory)),
    ))
}

/// `DELETE /memory/{id}`
#[utoipa::path(
    delete,
    path = "/memory/{id}",
    tag = "memories",
    operation_id = "memories.delete",
    params(("id" = String, Path, description = "Numeric sequence or full id")),
    responses(
        (status = 204, description = "Memory deleted"),
        (status = 404, description = "Memory not found", body = ErrorEnvelope),
    )
)]
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.memory.delete(&parse_ref(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /memory/{id}/media/{filename}`
#[utoipa::path(
    get,
    path = "/memory/{id}/media/{filename}",
    tag = "memories",
    operation_id = "memories.media",
    params(
        ("id" = String, Path, description = "Numeric sequence or full id"),
        ("filename" = String, Path, description = "Image filename within the memory"),
    ),
    responses(
        (status = 200, description = "Raw image bytes", content_type = "application/octet-stream"),
        (status = 304, description = "Matches `If-None-Match`"),
        (status = 404, description = "Memory or image not found", body = ErrorEnvelope),
    )
)]
pub async fn get_media(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response> {
    let stored = state.memory.media(&parse_ref(&id)?, &filename).await?;
    let etag = format!("\"{}\"", stored.sha256);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"));
    let etag = HeaderValue::from_str(&etag)
        .map_err(|e| KeepsakeError::Internal(format!("invalid etag: {e}")))?;
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    let content_type = if stored.content_type == "application/octet-stream" {
        mime_guess::from_path(&stored.filename)
            .first_or_octet_stream()
            .to_string()
    } else {
        stored.content_type
    };
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [(header::CONTENT_TYPE, content_type), (header::ETAG, etag)],
        stored.bytes,
    )
        .into_response())
}
