pub mod engine;
pub mod media_session;
pub mod platform;
pub mod sampler;
pub mod state;

pub use engine::{AudioEngine, ElementEvent, Gesture};
pub use media_session::{MediaAction, MediaSessionBridge};
pub use platform::Platform;
pub use sampler::SamplingLoop;
pub use state::{Effect, PlayerEvent, PlayerState, Snapshot, transition};
