use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Keepsake API",
        version = "1.0.0",
        description = "Self-hostable photo-memory journal. Stores memories with inline images and serves a timeline and keyword search.",
    ),
    paths(
        handlers::health::health_check,
        handlers::memories::upload_memory,
        handlers::memories::random_memory,
        handlers::memories::get_memory,
        handlers::memories::update_memory,
        handlers::memories::delete_memory,
        handlers::memories::get_media,
        handlers::timeline::list_timeline,
        handlers::timeline::list_years,
        handlers::search::search,
    ),
    components(schemas(
        // Errors
        response::ErrorCode,
        response::ApiError,
        response::ErrorEnvelope,
        // Common
        dto::common::CoordinatesInput,
        dto::common::LocationInput,
        dto::common::CoordinatesPayload,
        dto::common::LocationPayload,
        dto::common::PersonPayload,
        dto::common::ImagePayload,
        dto::common::MediaPayload,
        // Memories
        dto::memories::UploadMemoryRequest,
        dto::memories::UpdateMemoryRequest,
        dto::memories::MemoryResponse,
        // Timeline
        dto::timeline::TimelineEntryResponse,
        // Search
        dto::search::SearchLocationPayload,
        dto::search::SearchMediaPayload,
        dto::search::SearchResultResponse,
        // Health
        handlers::health::HealthData,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "memories", description = "Memory ingest, retrieval, update and media"),
        (name = "timeline", description = "Year-bucketed chronological view"),
        (name = "search", description = "Keyword search over memories"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
