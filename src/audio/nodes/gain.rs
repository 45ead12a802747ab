use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

/// Live-mutable gain shared between the control side and the render side.
/// Stored as `f32` bits; a new value is picked up by the next rendered block.
#[derive(Debug, Clone)]
pub struct GainParam(Arc<AtomicU32>);

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(sanitize(value).to_bits())))
    }

    pub fn set(&self, value: f32) {
        self.0.store(sanitize(value).to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Multiplies every sample by its parameter.
#[derive(Debug, Clone)]
pub struct GainNode {
    param: GainParam,
}

impl GainNode {
    pub fn new(value: f32) -> Self {
        Self {
            param: GainParam::new(value),
        }
    }

    pub fn param(&self) -> GainParam {
        self.param.clone()
    }

    pub fn process(&self, samples: &mut [f32]) {
        let gain = self.param.get();
        if (gain - 1.0).abs() <= f32::EPSILON {
            return;
        }
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }

    /// `acc += input * gain`, the summing junction for mixed-in sources.
    pub fn accumulate(&self, input: &[f32], acc: &mut [f32]) {
        let gain = self.param.get();
        for (out, &s) in acc.iter_mut().zip(input) {
            *out += s * gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_changes_apply_to_next_block() {
        let node = GainNode::new(1.0);
        let handle = node.param();

        let mut block = [0.5f32; 4];
        node.process(&mut block);
        assert_eq!(block, [0.5; 4]);

        handle.set(0.0);
        node.process(&mut block);
        assert_eq!(block, [0.0; 4]);
    }

    #[test]
    fn invalid_values_are_silenced() {
        let param = GainParam::new(f32::NAN);
        assert_eq!(param.get(), 0.0);
        param.set(-2.0);
        assert_eq!(param.get(), 0.0);
    }

    #[test]
    fn accumulate_sums_scaled_input() {
        let node = GainNode::new(0.5);
        let mut acc = [1.0f32, 1.0];
        node.accumulate(&[1.0, -1.0], &mut acc);
        assert_eq!(acc, [1.5, 0.5]);
    }
}
