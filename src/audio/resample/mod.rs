//! Rate conversion for decoded assets before they enter the graph.

pub mod linear;

pub use linear::LinearResampler;

/// Converts a whole interleaved buffer from `source_rate` to `target_rate`.
pub fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() || channels == 0 {
        return samples.to_vec();
    }

    let mut resampler = LinearResampler::new(source_rate, target_rate, channels);
    let expected = (samples.len() as u64 * target_rate as u64 / source_rate as u64) as usize;
    let mut output = Vec::with_capacity(expected + channels);
    resampler.process(samples, &mut output);
    output
}
