use axum::extract::State;
use axum::Json;

use crate::api::dto::{TimelineEntryResponse, TimelineQuery};
use crate::api::extractors::AppQuery;
use crate::api::response::ErrorEnvelope;
use crate::api::AppState;

/// `GET /timeline`
#[utoipa::path(
    get,
    path = "/timeline",
    tag = "timeline",
    operation_id = "timeline.list",
    params(TimelineQuery),
    responses(
        (status = 200, description = "Entries newest first", body = Vec<TimelineEntryResponse>),
        (status = 400, description = "Invalid query", body = ErrorEnvelope),
    )
)]
pub async fn list_timeline(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TimelineQuery>,
) -> Json<Vec<TimelineEntryResponse>> {
    let entries = match query.year {
        Some(year) => state.timeline.list_by_year(year),
        None => state.timeline.list_all(),
    };
    Json(entries.into_iter().map(Into::into).collect())
}

/// `GET /timeline/years`
#[utoipa::path(
    get,
    path = "/timeline/years",
    tag = "timeline",
    operation_id = "timeline.years",
    responses(
        (status = 200, description = "Distinct years, most recent first", body = Vec<i32>),
    )
)]
pub async fn list_years(State(state): State<AppState>) -> Json<Vec<i32>> {
    Json(state.timeline.years())
}
