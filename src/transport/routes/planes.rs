use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{common::errors::ErrorBody, server::AppState};

const PATH: &str = "/planes";

/// GET /planes
pub async fn get_planes(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("GET {}", PATH);

    match &state.telemetry {
        Some(feed) => Json(feed.snapshot()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::not_found("telemetry is disabled", PATH)),
        )
            .into_response(),
    }
}
