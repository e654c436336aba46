use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    /// `ok`, or `error` when syncing with the remote replica failed.
    pub database: String,
    /// Number of stored memories.
    pub memories: u64,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthData>> {
    let database = match state.db.sync().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Database sync failed");
            "error"
        }
    };
    let memories = state.memory.count().await?;

    Ok(Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        memories,
    }))
}
