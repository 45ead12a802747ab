//! Nearby-aircraft feed shown next to the player. Independent of the audio path.

pub mod feed;
pub mod geo;
pub mod opensky;

pub use feed::{TelemetryFeed, TelemetrySnapshot};
pub use geo::haversine_km;
pub use opensky::{Aircraft, OpenSkyClient};
