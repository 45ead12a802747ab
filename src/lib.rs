pub mod audio;
pub mod common;
pub mod configs;
pub mod player;
pub mod relay;
pub mod server;
pub mod telemetry;
pub mod transport;
