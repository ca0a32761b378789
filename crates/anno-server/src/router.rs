use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler;
use crate::service::AnnotationService;

/// Build the axum router with all annotation endpoints.
pub fn build_router(service: Arc<AnnotationService>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .route("/:user/:collection", post(handler::create_annotation))
        .route(
            "/:user/:collection/:annotation",
            get(handler::get_annotation).delete(handler::delete_annotation),
        )
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    if config.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
