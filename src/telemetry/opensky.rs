use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    common::errors::TelemetryError,
    configs::{BoundingBox, GeoPoint},
    telemetry::geo::haversine_km,
};

/// One aircraft near the reference point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    /// ICAO 24-bit transponder address.
    pub id: String,
    pub callsign: String,
    pub lat: f64,
    pub lon: f64,
    /// Barometric altitude, metres.
    pub altitude: Option<f64>,
    /// Ground speed, m/s.
    pub groundspeed: Option<f64>,
    pub distance_km: f64,
}

pub struct OpenSkyClient {
    client: Arc<reqwest::Client>,
    endpoint: String,
}

impl OpenSkyClient {
    pub fn new(client: Arc<reqwest::Client>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn fetch_states(&self, bbox: &BoundingBox) -> Result<Value, TelemetryError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lamin", bbox.lamin),
                ("lomin", bbox.lomin),
                ("lamax", bbox.lamax),
                ("lomax", bbox.lomax),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TelemetryError::Status(resp.status().as_u16()));
        }

        Ok(resp.json().await?)
    }

    /// Fetches the bounding box and keeps the `limit` aircraft closest to `reference`.
    pub async fn nearest(
        &self,
        bbox: &BoundingBox,
        reference: GeoPoint,
        limit: usize,
    ) -> Result<Vec<Aircraft>, TelemetryError> {
        let body = self.fetch_states(bbox).await?;
        let aircraft = parse_states(&body, reference)?;
        debug!("telemetry: {} aircraft in box", aircraft.len());
        Ok(nearest(aircraft, limit))
    }
}

/// Reads the `states` rows. Rows without a position are skipped; a null
/// `states` (nothing in the box) is an empty list.
pub fn parse_states(body: &Value, reference: GeoPoint) -> Result<Vec<Aircraft>, TelemetryError> {
    let states = match body.get("states") {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) => return Ok(Vec::new()),
        Some(_) => return Err(TelemetryError::Parse("`states` is not an array".into())),
        None => return Err(TelemetryError::Parse("missing `states`".into())),
    };

    Ok(states.iter().filter_map(|row| parse_row(row, reference)).collect())
}

fn parse_row(row: &Value, reference: GeoPoint) -> Option<Aircraft> {
    let row = row.as_array()?;
    let lon = row.get(5)?.as_f64()?;
    let lat = row.get(6)?.as_f64()?;

    let callsign = row
        .get(1)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("N/A")
        .to_string();

    Some(Aircraft {
        id: row.first()?.as_str()?.to_string(),
        callsign,
        lat,
        lon,
        altitude: row.get(7).and_then(Value::as_f64),
        groundspeed: row.get(9).and_then(Value::as_f64),
        distance_km: haversine_km(reference, GeoPoint { lat, lon }),
    })
}

pub fn nearest(mut aircraft: Vec<Aircraft>, limit: usize) -> Vec<Aircraft> {
    aircraft.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    aircraft.truncate(limit);
    aircraft
}
