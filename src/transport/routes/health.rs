use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub active_streams: usize,
    pub uptime_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
    pub build_time: u64,
}

/// GET /health
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Health> {
    tracing::debug!("GET /health");
    Json(Health {
        status: "ok",
        active_streams: state.active_streams.count(),
        uptime_ms: state.uptime_ms(),
    })
}

/// GET /version
pub async fn get_version() -> Json<VersionInfo> {
    tracing::debug!("GET /version");
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT").unwrap_or("unknown"),
        branch: option_env!("GIT_BRANCH").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIME")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
    })
}
