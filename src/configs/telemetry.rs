use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lamin: f64,
    pub lomin: f64,
    pub lamax: f64,
    pub lomax: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_bbox")]
    pub bbox: BoundingBox,
    #[serde(default = "default_reference")]
    pub reference: GeoPoint,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://opensky-network.org/api/states/all".to_string()
}

fn default_bbox() -> BoundingBox {
    BoundingBox {
        lamin: 33.5,
        lomin: -119.0,
        lamax: 34.5,
        lomax: -117.5,
    }
}

fn default_reference() -> GeoPoint {
    GeoPoint {
        lat: 33.9422,
        lon: -118.4036,
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_limit() -> usize {
    6
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            bbox: default_bbox(),
            reference: default_reference(),
            interval_secs: default_interval_secs(),
            limit: default_limit(),
        }
    }
}
