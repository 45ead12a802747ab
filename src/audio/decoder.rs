//! Decodes the looping background asset into memory.
//!
//! Runs on a blocking thread; the graph only sees the finished buffer.

use std::{fs::File, io::ErrorKind, path::Path};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::{
    audio::{nodes::AudioBuffer, resample::resample_interleaved},
    common::errors::PlayerError,
};

/// Decodes `path` to interleaved stereo at `target_rate`.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<AudioBuffer, PlayerError> {
    let file = File::open(path)
        .map_err(|e| PlayerError::Decode(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    decode_stream(mss, hint, target_rate)
}

pub fn decode_stream(
    mss: MediaSourceStream,
    hint: Hint,
    target_rate: u32,
) -> Result<AudioBuffer, PlayerError> {
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Decode(format!("probe failed: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlayerError::Decode("no audio track".into()))?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PlayerError::Decode("track has no sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlayerError::Decode(format!("read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frames are skipped, as a player would.
                warn!("skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(PlayerError::Decode(format!("decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        let src_channels = spec.channels.count();
        if src_channels == 0 {
            continue;
        }

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(src_channels) {
            let (left, right) = if src_channels == 1 {
                (frame[0], frame[0])
            } else {
                (frame[0], frame[1])
            };
            samples.push(left);
            samples.push(right);
        }
    }

    if samples.is_empty() {
        return Err(PlayerError::Decode("asset produced no samples".into()));
    }

    debug!(
        "decoded {} frames at {} Hz, resampling to {} Hz",
        samples.len() / 2,
        source_rate,
        target_rate
    );

    Ok(AudioBuffer {
        samples: resample_interleaved(&samples, 2, source_rate, target_rate),
        sample_rate: target_rate,
        channels: 2,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Minimal 16-bit PCM WAV.
    fn wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn decode_bytes(bytes: Vec<u8>, target_rate: u32) -> Result<AudioBuffer, PlayerError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        decode_stream(mss, hint, target_rate)
    }

    #[test]
    fn mono_wav_is_duplicated_to_stereo() {
        let buffer = decode_bytes(wav(44_100, 1, &[16_384; 441]), 44_100).unwrap();
        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.frames(), 441);
        assert!((buffer.samples[0] - 0.5).abs() < 1e-3);
        assert_eq!(buffer.samples[0], buffer.samples[1]);
    }

    #[test]
    fn asset_is_resampled_to_context_rate() {
        let buffer = decode_bytes(wav(22_050, 2, &[0; 2_000]), 44_100).unwrap();
        assert_eq!(buffer.sample_rate, 44_100);
        assert_eq!(buffer.frames(), 2_000);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = decode_file(Path::new("/no/such/loop.mp3"), 44_100).unwrap_err();
        assert!(matches!(err, PlayerError::Decode(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_bytes(vec![0u8; 64], 44_100).is_err());
    }
}
