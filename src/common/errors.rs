use serde::Serialize;

use crate::common::types::now_ms;

/// JSON error response returned by the HTTP surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ErrorBody {
    fn new(status: u16, error: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            status,
            error: error.into(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn not_found(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(404, "Not Found", message, path)
    }

    pub fn internal(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(500, "Internal Server Error", message, path)
    }
}

/// Failures of a single relay operation. None of these escape the connection that hit them.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The transcoder could not be launched at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transcoder {0} pipe was not captured")]
    MissingPipe(&'static str),
    #[error("relay I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-side engine failures. All of them are caught and logged by the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    /// The platform refused to create an output context (usually outside a gesture).
    #[error("audio output context unavailable: {0}")]
    ContextUnavailable(String),
    /// The media element refused to start (autoplay policy, decode error).
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("failed to decode loop asset: {0}")]
    Decode(String),
    #[error("platform error: {0}")]
    Platform(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telemetry endpoint returned {0}")]
    Status(u16),
    #[error("malformed telemetry payload: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_serializes_camel_case() {
        let body = ErrorBody::internal("boom", "/stream");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 500);
        assert_eq!(json["error"], "Internal Server Error");
        assert_eq!(json["path"], "/stream");
        assert!(json["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn spawn_error_names_program() {
        let err = RelayError::Spawn {
            program: "ffmpeg".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("failed to spawn `ffmpeg`"));
    }
}
