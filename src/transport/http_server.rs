use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    server::AppState,
    transport::{middleware::add_response_headers, routes},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stream", get(routes::relay_stream))
        .route("/planes", get(routes::get_planes))
        .route("/health", get(routes::get_health))
        .route("/version", get(routes::get_version))
        .layer(middleware::from_fn(add_response_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
