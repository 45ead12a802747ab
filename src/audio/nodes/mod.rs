pub mod analyser;
pub mod biquad;
pub mod buffer_source;
pub mod gain;

pub use analyser::AnalyserNode;
pub use biquad::{BiquadCoeffs, BiquadFilter};
pub use buffer_source::{AudioBuffer, LoopingBufferSource};
pub use gain::{GainNode, GainParam};
