//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Origins allowed when `HEARLEARN_CORS_ORIGINS` is unset
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8081",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8081",
];

fn cors_layer(origins: Option<String>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) if origins.trim() == "*" => AllowOrigin::any(),
        Some(origins) => AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok()),
        ),
        None => AllowOrigin::list(DEV_ORIGINS.map(HeaderValue::from_static)),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins.clone());

    let api_routes = Router::new()
        // Library endpoints
        .route(
            "/library",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route(
            "/library/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/library/:id/pages", get(handlers::get_pages))
        .route("/library/:id/retry", post(handlers::retry_document))
        .route("/library/:id/progress", post(handlers::save_progress))
        // Bookmarks and annotations
        .route(
            "/library/:id/bookmarks/:page",
            put(handlers::put_bookmark).delete(handlers::delete_bookmark),
        )
        .route(
            "/library/:id/annotations/:page",
            put(handlers::put_annotation).delete(handlers::delete_annotation),
        )
        .route("/stats", get(handlers::get_stats))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // SSE endpoint
        .route("/sync", get(handlers::sync_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
