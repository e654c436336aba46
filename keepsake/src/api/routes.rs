use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.server.max_body_bytes;

    let memories = Router::new()
        .route("/upload", post(handlers::memories::upload_memory))
        .route("/random", get(handlers::memories::random_memory))
        .route(
            "/{id}",
            get(handlers::memories::get_memory)
                .patch(handlers::memories::update_memory)
                .delete(handlers::memories::delete_memory),
        )
        .route("/{id}/media/{filename}", get(handlers::memories::get_media));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/memory", memories)
        .route("/timeline", get(handlers::timeline::list_timeline))
        .route("/timeline/years", get(handlers::timeline::list_years))
        .route("/search", get(handlers::search::search))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
