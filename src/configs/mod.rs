pub mod base;
pub mod logging;
pub mod player;
pub mod relay;
pub mod server;
pub mod telemetry;

pub use base::*;
pub use logging::*;
pub use player::*;
pub use relay::*;
pub use server::*;
pub use telemetry::*;
