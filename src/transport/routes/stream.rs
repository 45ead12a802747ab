use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::{
    common::{errors::ErrorBody, types::StreamId},
    relay::RelayStream,
    server::AppState,
};

const PATH: &str = "/stream";

/// GET /stream
///
/// Headers are only committed once the transcoder is running, so a spawn
/// failure can still become a 500. After that the body just ends.
pub async fn relay_stream(State(state): State<Arc<AppState>>) -> Response {
    let id = StreamId::next();
    tracing::info!("GET {} [{}]", PATH, id);

    let stream = match RelayStream::open(
        id,
        &state.topology,
        state.interrupt_grace(),
        &state.active_streams,
        state.shutdown.child_token(),
    ) {
        Ok(stream) => stream,
        Err(e) => {
            error!("[{}] relay failed to start: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::internal(e.to_string(), PATH)),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, state.topology.mime_type()),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
