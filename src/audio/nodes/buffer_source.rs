use crate::audio::nodes::gain::GainNode;

/// Decoded interleaved audio held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioBuffer {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Plays a buffer forever, wrapping at the end, through its own gain stage.
pub struct LoopingBufferSource {
    buffer: AudioBuffer,
    /// Frame index of the next sample to emit.
    cursor: usize,
    gain: GainNode,
    scratch: Vec<f32>,
}

impl LoopingBufferSource {
    pub fn new(buffer: AudioBuffer, gain: GainNode) -> Self {
        Self {
            buffer,
            cursor: 0,
            gain,
            scratch: Vec::new(),
        }
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }

    /// Adds the next `acc.len() / channels` frames into `acc`, mapping the
    /// buffer's channels onto the graph's (mono is duplicated).
    pub fn mix_into(&mut self, acc: &mut [f32], channels: usize) {
        let frames = self.buffer.frames();
        if frames == 0 || channels == 0 {
            return;
        }

        let src_channels = self.buffer.channels;
        self.scratch.clear();
        self.scratch.reserve(acc.len());
        for _ in 0..acc.len() / channels {
            let base = self.cursor * src_channels;
            for c in 0..channels {
                let src = if c < src_channels { c } else { src_channels - 1 };
                self.scratch.push(self.buffer.samples[base + src]);
            }
            self.cursor = (self.cursor + 1) % frames;
        }

        self.gain.accumulate(&self.scratch, acc);
    }
}
