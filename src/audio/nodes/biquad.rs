use std::f64::consts::PI;

use crate::configs::FilterStageConfig;

/// Biquad filter coefficients (normalized by a0).
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    fn omega(freq: f64, q: f64, sample_rate: f64) -> (f64, f64, f64) {
        let nyquist = sample_rate * 0.5;
        let freq = freq.clamp(1.0, nyquist - 1.0);
        let q = if q > 0.0 { q } else { std::f64::consts::FRAC_1_SQRT_2 };
        let omega0 = 2.0 * PI * freq / sample_rate;
        (omega0.sin(), omega0.cos(), omega0.sin() / (2.0 * q))
    }

    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (_, cos_w, alpha) = Self::omega(freq, q, sample_rate);
        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            b0: (1.0 - cos_w) * 0.5 * inv_a0,
            b1: (1.0 - cos_w) * inv_a0,
            b2: (1.0 - cos_w) * 0.5 * inv_a0,
            a1: -2.0 * cos_w * inv_a0,
            a2: (1.0 - alpha) * inv_a0,
        }
    }

    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (_, cos_w, alpha) = Self::omega(freq, q, sample_rate);
        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            b0: (1.0 + cos_w) * 0.5 * inv_a0,
            b1: -(1.0 + cos_w) * inv_a0,
            b2: (1.0 + cos_w) * 0.5 * inv_a0,
            a1: -2.0 * cos_w * inv_a0,
            a2: (1.0 - alpha) * inv_a0,
        }
    }

    /// Constant 0 dB peak gain bandpass.
    pub fn bandpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let (_, cos_w, alpha) = Self::omega(freq, q, sample_rate);
        let inv_a0 = 1.0 / (1.0 + alpha);
        Self {
            b0: alpha * inv_a0,
            b1: 0.0,
            b2: -alpha * inv_a0,
            a1: -2.0 * cos_w * inv_a0,
            a2: (1.0 - alpha) * inv_a0,
        }
    }
}

/// Per-channel Direct Form I state.
#[derive(Debug, Clone, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        if !output.is_finite() {
            *self = Self::default();
            return 0.0;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// A filter stage over interleaved samples, one state per channel.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs, channels: usize) -> Self {
        Self {
            coeffs,
            states: vec![BiquadState::default(); channels.max(1)],
        }
    }

    /// `None` for stage configs that are not filters (plain gain).
    pub fn from_config(config: &FilterStageConfig, sample_rate: f64, channels: usize) -> Option<Self> {
        let coeffs = match *config {
            FilterStageConfig::Lowpass { frequency, q } => {
                BiquadCoeffs::lowpass(frequency, q, sample_rate)
            }
            FilterStageConfig::Highpass { frequency, q } => {
                BiquadCoeffs::highpass(frequency, q, sample_rate)
            }
            FilterStageConfig::Bandpass { frequency, q } => {
                BiquadCoeffs::bandpass(frequency, q, sample_rate)
            }
            FilterStageConfig::Gain { .. } => return None,
        };
        Some(Self::new(coeffs, channels))
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        let channels = self.states.len();
        for frame in samples.chunks_mut(channels) {
            for (sample, state) in frame.iter_mut().zip(self.states.iter_mut()) {
                *sample = state.process(*sample as f64, &self.coeffs) as f32;
            }
        }
    }

    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(|s| *s = BiquadState::default());
    }
}
