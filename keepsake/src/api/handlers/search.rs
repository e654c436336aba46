use axum::extract::State;
use axum::Json;

use crate::api::dto::{SearchQuery, SearchResultResponse};
use crate::api::extractors::AppQuery;
use crate::api::response::ErrorEnvelope;
use crate::api::AppState;
use crate::error::{KeepsakeError, Result};

/// `GET /search`
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    operation_id = "search.memories",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches in insertion order", body = Vec<SearchResultResponse>),
        (status = 400, description = "Invalid query", body = ErrorEnvelope),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<Vec<SearchResultResponse>>> {
    if query.limit == Some(0) {
        return Err(KeepsakeError::validation("limit", "must be at least 1"));
    }

    let results = state
        .search
        .search(query.q.as_deref().unwrap_or_default(), query.limit)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}
