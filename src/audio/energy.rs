//! Loudness proxy for the visualizer.
//!
//! The analyser hands out unsigned 8-bit time-domain samples centered at 128.
//! Each frame they are normalized to `[-1, 1]`, reduced to a root-mean-square
//! value, and mapped through `(1 + rms * K) ^ exponent` to an indicator scale.

use crate::audio::constants::{BYTE_CENTER, DEFAULT_SENSITIVITY, NEUTRAL_SCALE};

/// `(sample - 128) / 128`.
#[inline]
pub fn normalize_byte(sample: u8) -> f32 {
    (sample as f32 - BYTE_CENTER) / BYTE_CENTER
}

/// Root-mean-square of a centered 8-bit buffer. Empty buffers read as silence.
pub fn rms_from_bytes(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples
        .iter()
        .map(|&s| {
            let v = normalize_byte(s);
            v * v
        })
        .sum();

    (sum / samples.len() as f32).sqrt()
}

/// Maps RMS energy to a visual scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleCurve {
    sensitivity: f32,
    exponent: f32,
}

impl Default for ScaleCurve {
    fn default() -> Self {
        Self::linear(DEFAULT_SENSITIVITY)
    }
}

impl ScaleCurve {
    /// Negative sensitivities and non-positive exponents would make the curve
    /// decreasing, so they are clamped.
    pub fn new(sensitivity: f32, exponent: f32) -> Self {
        let sensitivity = if sensitivity.is_finite() {
            sensitivity.max(0.0)
        } else {
            DEFAULT_SENSITIVITY
        };
        let exponent = if exponent.is_finite() && exponent > 0.0 {
            exponent
        } else {
            1.0
        };
        Self {
            sensitivity,
            exponent,
        }
    }

    pub fn linear(sensitivity: f32) -> Self {
        Self::new(sensitivity, 1.0)
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn exponent(&self) -> f32 {
        self.exponent
    }

    pub fn scale(&self, rms: f32) -> f32 {
        let rms = if rms.is_finite() { rms.max(0.0) } else { 0.0 };
        let base = NEUTRAL_SCALE + rms * self.sensitivity;
        if self.exponent == 1.0 {
            base
        } else {
            base.powf(self.exponent)
        }
    }
}

/// One frame's reading: the energy and the scale of each indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReading {
    pub rms: f32,
    pub primary: f32,
    pub secondary: Option<f32>,
}

impl EnergyReading {
    pub fn neutral() -> Self {
        Self {
            rms: 0.0,
            primary: NEUTRAL_SCALE,
            secondary: Some(NEUTRAL_SCALE),
        }
    }
}

/// The primary indicator follows `primary`; the optional secondary indicator
/// applies its own exponent on top for a more exaggerated response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyMeter {
    primary: ScaleCurve,
    secondary: Option<ScaleCurve>,
}

impl EnergyMeter {
    pub fn new(sensitivity: f32, secondary_exponent: Option<f32>) -> Self {
        Self {
            primary: ScaleCurve::linear(sensitivity),
            secondary: secondary_exponent.map(|exp| ScaleCurve::new(sensitivity, exp)),
        }
    }

    pub fn read(&self, samples: &[u8]) -> EnergyReading {
        let rms = rms_from_bytes(samples);
        EnergyReading {
            rms,
            primary: self.primary.scale(rms),
            secondary: self.secondary.map(|curve| curve.scale(rms)),
        }
    }
}
