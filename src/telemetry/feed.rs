use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    common::{errors::TelemetryError, types::now_ms},
    configs::TelemetryConfig,
    telemetry::opensky::{Aircraft, OpenSkyClient},
};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Unix ms of the last successful poll; `None` until the first one lands.
    pub updated_at: Option<u64>,
    pub aircraft: Vec<Aircraft>,
}

/// Polls the aircraft-state endpoint on a fixed interval and keeps the
/// latest nearest-N list. A failed poll keeps the previous snapshot.
pub struct TelemetryFeed {
    client: OpenSkyClient,
    config: TelemetryConfig,
    snapshot: RwLock<TelemetrySnapshot>,
}

impl TelemetryFeed {
    pub fn new(client: OpenSkyClient, config: TelemetryConfig) -> Self {
        Self {
            client,
            config,
            snapshot: RwLock::new(TelemetrySnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot.read().clone()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.interval_secs.max(1))
    }

    pub async fn poll_once(&self) -> Result<usize, TelemetryError> {
        let aircraft = self
            .client
            .nearest(&self.config.bbox, self.config.reference, self.config.limit)
            .await?;
        Ok(self.store(aircraft))
    }

    fn store(&self, aircraft: Vec<Aircraft>) -> usize {
        let count = aircraft.len();
        *self.snapshot.write() = TelemetrySnapshot {
            updated_at: Some(now_ms()),
            aircraft,
        };
        count
    }

    /// Polls immediately, then every interval, until `shutdown` fires.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match self.poll_once().await {
                            Ok(count) => debug!("telemetry updated: {} nearest aircraft", count),
                            Err(e) => warn!("telemetry poll failed: {}", e),
                        }
                    }
                }
            }

            debug!("telemetry poller stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(interval_secs: u64) -> TelemetryFeed {
        let client = Arc::new(reqwest::Client::new());
        TelemetryFeed::new(
            OpenSkyClient::new(client, "http://127.0.0.1:9/api/states/all"),
            TelemetryConfig {
                interval_secs,
                ..TelemetryConfig::default()
            },
        )
    }

    fn aircraft(id: &str) -> Aircraft {
        Aircraft {
            id: id.into(),
            callsign: "N/A".into(),
            lat: 33.9,
            lon: -118.4,
            altitude: None,
            groundspeed: None,
            distance_km: 1.0,
        }
    }

    #[test]
    fn starts_empty() {
        let snapshot = feed(10).snapshot();
        assert!(snapshot.updated_at.is_none());
        assert!(snapshot.aircraft.is_empty());
    }

    #[test]
    fn interval_is_at_least_a_second() {
        assert_eq!(feed(0).interval(), Duration::from_secs(1));
        assert_eq!(feed(10).interval(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_snapshot() {
        let feed = feed(10);
        feed.store(vec![aircraft("abc")]);
        let before = feed.snapshot();

        assert!(feed.poll_once().await.is_err());
        let after = feed.snapshot();
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.aircraft, before.aircraft);
    }

    #[tokio::test]
    async fn poller_stops_on_shutdown() {
        let feed = Arc::new(feed(10));
        let token = CancellationToken::new();
        let task = feed.spawn(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
