use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    common::types::now_ms,
    configs::Config,
    relay::{ActiveStreams, MixingTopology},
    telemetry::TelemetryFeed,
};

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    /// Built once from `[relay]`; every request reads it.
    pub topology: Arc<MixingTopology>,
    pub active_streams: ActiveStreams,
    /// Cancelled when the server starts shutting down. Ends every open relay body.
    pub shutdown: CancellationToken,
    pub telemetry: Option<Arc<TelemetryFeed>>,
    pub started_at: u64,
}

impl AppState {
    pub fn new(config: Config, telemetry: Option<Arc<TelemetryFeed>>) -> Self {
        Self {
            topology: Arc::new(MixingTopology::from_config(&config.relay)),
            config,
            active_streams: ActiveStreams::new(),
            shutdown: CancellationToken::new(),
            telemetry,
            started_at: now_ms(),
        }
    }

    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_millis(self.config.relay.interrupt_grace_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.config.server.shutdown_grace_ms)
    }

    pub fn uptime_ms(&self) -> u64 {
        now_ms().saturating_sub(self.started_at)
    }
}
