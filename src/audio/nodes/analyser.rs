//! Pass-through analysis stage.
//!
//! Keeps the most recent `fft_size` mono samples in a ring. The render side
//! writes after every block; the frame loop copies the window out as centered
//! unsigned bytes. The signal itself is never altered.

use parking_lot::Mutex;

use crate::audio::constants::{DEFAULT_FFT_SIZE, MAX_FFT_SIZE, MIN_FFT_SIZE};

struct Window {
    samples: Vec<f32>,
    /// Next slot to overwrite; also the oldest sample once the ring is full.
    write: usize,
}

pub struct AnalyserNode {
    fft_size: usize,
    window: Mutex<Window>,
}

impl Default for AnalyserNode {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

impl AnalyserNode {
    /// `fft_size` is clamped to `32..=32768` and rounded up to a power of two.
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two()
            .min(MAX_FFT_SIZE);
        Self {
            fft_size,
            window: Mutex::new(Window {
                samples: vec![0.0; fft_size],
                write: 0,
            }),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Samples returned per time-domain read.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feeds one interleaved block, down-mixed to mono.
    pub fn capture(&self, interleaved: &[f32], channels: usize) {
        let channels = channels.max(1);
        let inv = 1.0 / channels as f32;
        let mut window = self.window.lock();
        let len = window.samples.len();
        for frame in interleaved.chunks(channels) {
            let mono = frame.iter().sum::<f32>() * inv;
            let write = window.write;
            window.samples[write] = mono;
            window.write = (write + 1) % len;
        }
    }

    /// Fills `out` with the oldest `out.len()` samples of the current window
    /// as `floor(128 * (1 + x))`, clipped to `0..=255`.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let window = self.window.lock();
        let len = window.samples.len();
        for (i, byte) in out.iter_mut().take(len).enumerate() {
            let x = window.samples[(window.write + i) % len];
            *byte = (128.0 * (1.0 + x)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Float variant of [`Self::byte_time_domain_data`].
    pub fn float_time_domain_data(&self, out: &mut [f32]) {
        let window = self.window.lock();
        let len = window.samples.len();
        for (i, value) in out.iter_mut().take(len).enumerate() {
            *value = window.samples[(window.write + i) % len];
        }
    }

    pub fn clear(&self) {
        let mut window = self.window.lock();
        window.samples.fill(0.0);
        window.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_yields_128_samples() {
        let analyser = AnalyserNode::default();
        assert_eq!(analyser.fft_size(), 256);
        assert_eq!(analyser.frequency_bin_count(), 128);
    }

    #[test]
    fn silence_reads_as_center() {
        let analyser = AnalyserNode::default();
        let mut bytes = vec![0u8; analyser.frequency_bin_count()];
        analyser.byte_time_domain_data(&mut bytes);
        assert!(bytes.iter().all(|&b| b == 128));
    }

    #[test]
    fn full_scale_is_clipped() {
        let analyser = AnalyserNode::new(32);
        let block: Vec<f32> = (0..64).map(|i| if i % 4 < 2 { 1.5 } else { -1.5 }).collect();
        analyser.capture(&block, 2);

        let mut bytes = vec![0u8; 32];
        analyser.byte_time_domain_data(&mut bytes);
        assert!(bytes.iter().all(|&b| b == 255 || b == 0));
    }

    #[test]
    fn stereo_is_downmixed() {
        let analyser = AnalyserNode::new(32);
        analyser.capture(&[1.0, 0.0], 2);

        let mut values = vec![0.0f32; 32];
        analyser.float_time_domain_data(&mut values);
        assert_eq!(values[31], 0.5);
        assert_eq!(values[0], 0.0);
    }

    #[test]
    fn fft_size_is_normalized() {
        assert_eq!(AnalyserNode::new(1).fft_size(), 32);
        assert_eq!(AnalyserNode::new(300).fft_size(), 512);
        assert_eq!(AnalyserNode::new(1 << 20).fft_size(), 32_768);
    }
}
