pub mod constants;
pub mod decoder;
pub mod energy;
pub mod graph;
pub mod nodes;
pub mod resample;

pub use energy::{EnergyMeter, EnergyReading, ScaleCurve, rms_from_bytes};
pub use graph::{AudioGraph, GraphHandles, GraphRenderer, SourceBinding};
pub use nodes::{AnalyserNode, AudioBuffer, GainNode, GainParam};
