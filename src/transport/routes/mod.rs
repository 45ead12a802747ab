pub mod health;
pub mod planes;
pub mod stream;

pub use health::{get_health, get_version};
pub use planes::get_planes;
pub use stream::relay_stream;
