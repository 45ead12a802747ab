//! Client-side processing graph.
//!
//! The edges are fixed when the graph is built:
//!
//! ```text
//! source -> stages -> [loop, analysed] -> analyser -> [loop, bypass] -> master -> destination
//! ```
//!
//! Only gain values change afterwards, and the looping asset may be attached
//! once its decode finishes.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    audio::{
        constants::GRAPH_CHANNELS,
        nodes::{AnalyserNode, AudioBuffer, BiquadFilter, GainNode, GainParam, LoopingBufferSource},
    },
    configs::{FilterStageConfig, LoopRouting, PlayerConfig},
    player::platform::SampleTap,
};

/// Exclusive right to pull audio from one playback element.
///
/// Created once, next to the element it taps, and consumed by
/// [`AudioGraph::build`]. Binding a second source to the same element is a
/// construction precondition violation; holding the binding by value is what
/// rules it out.
pub struct SourceBinding {
    tap: Box<dyn SampleTap>,
}

impl SourceBinding {
    pub fn new(tap: impl SampleTap + 'static) -> Self {
        Self { tap: Box::new(tap) }
    }
}

enum Stage {
    Filter(BiquadFilter),
    Gain(GainNode),
}

impl Stage {
    fn process(&mut self, block: &mut [f32]) {
        match self {
            Stage::Filter(filter) => filter.process(block),
            Stage::Gain(gain) => gain.process(block),
        }
    }
}

/// Control-side handles into a built graph.
#[derive(Clone)]
pub struct GraphHandles {
    pub master: GainParam,
    pub analyser: Arc<AnalyserNode>,
}

/// The graph as driven by the output context's render callback.
pub type GraphRenderer = Arc<Mutex<AudioGraph>>;

pub struct AudioGraph {
    source: Box<dyn SampleTap>,
    stages: Vec<Stage>,
    analyser: Arc<AnalyserNode>,
    routing: LoopRouting,
    background: Option<LoopingBufferSource>,
    master: GainNode,
    sample_rate: u32,
    channels: usize,
}

impl AudioGraph {
    pub fn build(binding: SourceBinding, config: &PlayerConfig, sample_rate: u32, muted: bool) -> Self {
        let stages = config
            .filters
            .iter()
            .map(|stage| match *stage {
                FilterStageConfig::Gain { value } => Stage::Gain(GainNode::new(value)),
                _ => match BiquadFilter::from_config(stage, sample_rate as f64, GRAPH_CHANNELS) {
                    Some(filter) => Stage::Filter(filter),
                    None => Stage::Gain(GainNode::new(1.0)),
                },
            })
            .collect::<Vec<_>>();

        let master = GainNode::new(if muted { 0.0 } else { config.master_gain });

        debug!(
            "audio graph built: {} stage(s), fft {}, {} Hz, loop routing {:?}",
            stages.len(),
            config.validated_fft_size(),
            sample_rate,
            config.loop_routing
        );

        Self {
            source: binding.tap,
            stages,
            analyser: Arc::new(AnalyserNode::new(config.validated_fft_size())),
            routing: config.loop_routing,
            background: None,
            master,
            sample_rate,
            channels: GRAPH_CHANNELS,
        }
    }

    pub fn handles(&self) -> GraphHandles {
        GraphHandles {
            master: self.master.param(),
            analyser: self.analyser.clone(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Starts the looping asset through its own gain stage. Returns the gain
    /// handle, or `None` if a loop is already attached or the buffer is empty.
    pub fn attach_loop(&mut self, buffer: AudioBuffer, gain: f32) -> Option<GainParam> {
        if self.background.is_some() {
            warn!("loop asset already attached, ignoring second buffer");
            return None;
        }
        if buffer.is_empty() {
            warn!("loop asset decoded to an empty buffer");
            return None;
        }
        if buffer.sample_rate != self.sample_rate {
            warn!(
                "loop asset is {} Hz but the graph runs at {} Hz",
                buffer.sample_rate, self.sample_rate
            );
        }

        let node = GainNode::new(gain);
        let param = node.param();
        debug!("loop asset attached: {} frames, gain {}", buffer.frames(), gain);
        self.background = Some(LoopingBufferSource::new(buffer, node));
        Some(param)
    }

    /// Renders one interleaved block into `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        let channels = self.channels;
        out.fill(0.0);
        self.source.pull(out, channels);

        for stage in self.stages.iter_mut() {
            stage.process(out);
        }

        if self.routing == LoopRouting::Analysed {
            if let Some(background) = self.background.as_mut() {
                background.mix_into(out, channels);
            }
        }

        self.analyser.capture(out, channels);

        if self.routing == LoopRouting::Bypass {
            if let Some(background) = self.background.as_mut() {
                background.mix_into(out, channels);
            }
        }

        self.master.process(out);
    }

    pub fn into_renderer(self) -> GraphRenderer {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::constants::RENDER_QUANTUM_FRAMES;

    struct Constant(f32);

    impl SampleTap for Constant {
        fn pull(&mut self, out: &mut [f32], _channels: usize) {
            out.fill(self.0);
        }
    }

    fn block() -> Vec<f32> {
        vec![0.0; RENDER_QUANTUM_FRAMES * GRAPH_CHANNELS]
    }

    fn config(routing: LoopRouting) -> PlayerConfig {
        PlayerConfig {
            loop_routing: routing,
            ..PlayerConfig::default()
        }
    }

    fn loop_buffer(value: f32) -> AudioBuffer {
        AudioBuffer {
            samples: vec![value; 64],
            sample_rate: 44_100,
            channels: 2,
        }
    }

    fn analysed_bytes(handles: &GraphHandles) -> Vec<u8> {
        let mut bytes = vec![0u8; handles.analyser.frequency_bin_count()];
        handles.analyser.byte_time_domain_data(&mut bytes);
        bytes
    }

    #[test]
    fn analyser_sees_signal_before_master_gain() {
        let mut graph = AudioGraph::build(
            SourceBinding::new(Constant(0.5)),
            &PlayerConfig::default(),
            44_100,
            true,
        );
        let handles = graph.handles();
        let mut out = block();
        // Two quanta fill the 256-sample window.
        graph.render(&mut out);
        graph.render(&mut out);

        assert!(out.iter().all(|&s| s == 0.0), "muted output must be silent");
        assert!(analysed_bytes(&handles).iter().all(|&b| b == 192));
    }

    #[test]
    fn master_gain_change_applies_to_next_block() {
        let mut graph = AudioGraph::build(
            SourceBinding::new(Constant(0.25)),
            &PlayerConfig::default(),
            44_100,
            false,
        );
        let handles = graph.handles();
        let mut out = block();

        graph.render(&mut out);
        assert_eq!(out[0], 0.25);

        handles.master.set(0.0);
        graph.render(&mut out);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn bypass_loop_is_audible_but_not_analysed() {
        let mut graph = AudioGraph::build(
            SourceBinding::new(Constant(0.0)),
            &config(LoopRouting::Bypass),
            44_100,
            false,
        );
        let handles = graph.handles();
        assert!(graph.attach_loop(loop_buffer(0.5), 0.5).is_some());

        let mut out = block();
        graph.render(&mut out);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!(analysed_bytes(&handles).iter().all(|&b| b == 128));
    }

    #[test]
    fn analysed_loop_moves_the_visualizer() {
        let mut graph = AudioGraph::build(
            SourceBinding::new(Constant(0.0)),
            &config(LoopRouting::Analysed),
            44_100,
            false,
        );
        let handles = graph.handles();
        graph.attach_loop(loop_buffer(0.5), 0.5);

        let mut out = block();
        graph.render(&mut out);
        graph.render(&mut out);
        assert!(analysed_bytes(&handles).iter().all(|&b| b == 160));
    }

    #[test]
    fn loop_attaches_once() {
        let mut graph = AudioGraph::build(
            SourceBinding::new(Constant(0.0)),
            &PlayerConfig::default(),
            44_100,
            false,
        );
        assert!(graph.attach_loop(loop_buffer(0.1), 0.08).is_some());
        assert!(graph.attach_loop(loop_buffer(0.1), 0.08).is_none());
        assert!(graph.has_background());
    }

    #[test]
    fn configured_stages_run_in_order() {
        let config = PlayerConfig {
            filters: vec![
                FilterStageConfig::Gain { value: 0.5 },
                FilterStageConfig::Lowpass {
                    frequency: 8_000.0,
                    q: 0.707,
                },
            ],
            ..PlayerConfig::default()
        };
        let mut graph = AudioGraph::build(SourceBinding::new(Constant(0.8)), &config, 44_100, false);
        assert_eq!(graph.stage_count(), 2);

        let mut out = block();
        for _ in 0..20 {
            graph.render(&mut out);
        }
        // DC passes the lowpass unchanged once settled.
        assert!((out[out.len() - 1] - 0.4).abs() < 1e-3);
    }
}
