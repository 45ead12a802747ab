//! Server-side relay: one transcoder subprocess per `GET /stream`, its stdout
//! piped into the response, torn down on every termination path.

pub mod process;
pub mod stream;
pub mod topology;

pub use process::{ActiveStreams, MixerProcess, ShutdownReport, TerminationReason};
pub use stream::RelayStream;
pub use topology::{LiveInput, LoopInput, MixingTopology, OutputEncoding};
