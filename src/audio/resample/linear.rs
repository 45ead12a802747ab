//! Linear-interpolation resampler over interleaved `f32` frames.

pub struct LinearResampler {
    /// Source / target ratio (< 1.0 upsamples, > 1.0 downsamples).
    ratio: f64,
    /// Fractional read position, in frames, relative to the current block.
    position: f64,
    /// Last frame of the previous block, for interpolation across blocks.
    previous: Vec<f32>,
    channels: usize,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            ratio: source_rate as f64 / target_rate.max(1) as f64,
            position: 0.0,
            previous: vec![0.0; channels],
            channels,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        (self.ratio - 1.0).abs() < f64::EPSILON
    }

    /// Resamples `input` and appends the result to `output`.
    ///
    /// Position `p` interpolates between frame `floor(p) - 1` (or the carried
    /// previous frame) and frame `floor(p)`.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let frames = input.len() / self.channels;
        if frames == 0 {
            return;
        }

        while self.position < frames as f64 {
            let idx = self.position as usize;
            let fract = self.position.fract() as f32;

            for c in 0..self.channels {
                let s1 = if idx == 0 {
                    self.previous[c]
                } else {
                    input[(idx - 1) * self.channels + c]
                };
                let s2 = input[idx * self.channels + c];
                output.push(s1 + (s2 - s1) * fract);
            }

            self.position += self.ratio;
        }

        self.position -= frames as f64;
        let last = (frames - 1) * self.channels;
        self.previous
            .copy_from_slice(&input[last..last + self.channels]);
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.previous.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::resample::resample_interleaved;

    #[test]
    fn doubling_rate_doubles_frames() {
        let input: Vec<f32> = (0..100).flat_map(|i| [i as f32, -(i as f32)]).collect();
        let output = resample_interleaved(&input, 2, 22_050, 44_100);
        assert_eq!(output.len(), 400);
    }

    #[test]
    fn halving_rate_halves_frames() {
        let input = vec![0.5f32; 200];
        let output = resample_interleaved(&input, 1, 48_000, 24_000);
        assert_eq!(output.len(), 100);
    }

    #[test]
    fn same_rate_is_identity() {
        let input = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample_interleaved(&input, 1, 44_100, 44_100), input);
        assert!(LinearResampler::new(44_100, 44_100, 2).is_passthrough());
    }
}
