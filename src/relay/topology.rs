//! Static description of the transcoder's inputs, gains and output encoding.
//!
//! A `MixingTopology` is built once from `[relay]` config and shared read-only
//! by every request; it is only ever turned into an argument vector.

use std::path::PathBuf;

use crate::{common::types::AudioFormat, configs::RelayConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct LiveInput {
    pub url: String,
    /// Client identifier presented to the feed host.
    pub user_agent: String,
    pub gain: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopInput {
    pub path: PathBuf,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputEncoding {
    pub format: AudioFormat,
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

impl Default for OutputEncoding {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mp3,
            channels: 2,
            sample_rate: 44_100,
            bitrate_kbps: 192,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixingTopology {
    pub program: String,
    pub live: LiveInput,
    pub background: Option<LoopInput>,
    pub output: OutputEncoding,
    pub log_level: String,
}

/// Label of the filter graph's final pad, mapped to the output.
const MIX_OUT: &str = "[aout]";

impl MixingTopology {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            live: LiveInput {
                url: config.live_feed_url.clone(),
                user_agent: config.user_agent.clone(),
                gain: config.live_gain.max(0.0),
            },
            background: config.loop_asset.as_ref().map(|path| LoopInput {
                path: PathBuf::from(path),
                gain: config.loop_gain.max(0.0),
            }),
            output: OutputEncoding {
                format: config.format,
                channels: config.channels.max(1),
                sample_rate: config.sample_rate,
                bitrate_kbps: config.bitrate_kbps,
            },
            log_level: config.log_level.clone(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.output.format.mime_type()
    }

    /// Per-input `volume` stages, then `amix` when there is a second input.
    pub fn filter_graph(&self) -> String {
        match &self.background {
            Some(background) => format!(
                "[0:a]volume={}[a0];[1:a]volume={}[a1];[a0][a1]amix=inputs=2:duration=longest{}",
                self.live.gain, background.gain, MIX_OUT
            ),
            None => format!("[0:a]volume={}{}", self.live.gain, MIX_OUT),
        }
    }

    /// Full argument list. The process reads nothing from stdin and writes the
    /// encoded stream to stdout.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            self.log_level.clone(),
            "-user_agent".into(),
            self.live.user_agent.clone(),
            "-i".into(),
            self.live.url.clone(),
        ];

        if let Some(background) = &self.background {
            args.extend([
                "-stream_loop".into(),
                "-1".into(),
                "-i".into(),
                background.path.to_string_lossy().into_owned(),
            ]);
        }

        args.extend([
            "-filter_complex".into(),
            self.filter_graph(),
            "-map".into(),
            MIX_OUT.into(),
            "-f".into(),
            self.output.format.muxer().into(),
            "-ac".into(),
            self.output.channels.to_string(),
            "-ar".into(),
            self.output.sample_rate.to_string(),
            "-b:a".into(),
            format!("{}k", self.output.bitrate_kbps),
            "pipe:1".into(),
        ]);

        args
    }

    /// Shell-ish rendering for the start-of-stream log line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.ffmpeg_args().into_iter().map(|arg| {
                if arg.contains(' ') || arg.contains(';') {
                    format!("\"{}\"", arg)
                } else {
                    arg
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], needle: &str) -> usize {
        args.iter().position(|a| a == needle).unwrap()
    }

    #[test]
    fn default_topology_mixes_feed_with_quiet_loop() {
        let topology = MixingTopology::from_config(&RelayConfig::default());
        assert_eq!(
            topology.filter_graph(),
            "[0:a]volume=1[a0];[1:a]volume=0.08[a1];[a0][a1]amix=inputs=2:duration=longest[aout]"
        );

        let args = topology.ffmpeg_args();
        let tail: Vec<&str> = args[args.len() - 11..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            ["-map", "[aout]", "-f", "mp3", "-ac", "2", "-ar", "44100", "-b:a", "192k", "pipe:1"]
        );
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        assert_eq!(args[position(&args, "-b:a") + 1], "192k");
        assert_eq!(args[position(&args, "-ar") + 1], "44100");
        assert_eq!(args[position(&args, "-ac") + 1], "2");
        assert_eq!(args[position(&args, "-f") + 1], "mp3");
    }

    #[test]
    fn loop_flag_applies_to_the_background_input_only() {
        let topology = MixingTopology::from_config(&RelayConfig::default());
        let args = topology.ffmpeg_args();

        let inputs: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(inputs.len(), 2);
        assert_eq!(args[inputs[0] + 1], "https://d.liveatc.net/klax6");
        assert_eq!(args[inputs[1] + 1], "public/elevator.mp3");

        let loop_flag = position(&args, "-stream_loop");
        assert_eq!(args[loop_flag + 1], "-1");
        assert!(loop_flag > inputs[0] && loop_flag < inputs[1]);

        let user_agent = position(&args, "-user_agent");
        assert!(user_agent < inputs[0]);
    }

    #[test]
    fn feed_only_topology_skips_amix() {
        let config = RelayConfig {
            loop_asset: None,
            live_gain: 0.5,
            ..RelayConfig::default()
        };
        let topology = MixingTopology::from_config(&config);
        assert_eq!(topology.filter_graph(), "[0:a]volume=0.5[aout]");

        let args = topology.ffmpeg_args();
        assert!(!args.iter().any(|a| a == "-stream_loop"));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    #[test]
    fn negative_gains_are_clamped() {
        let config = RelayConfig {
            live_gain: -1.0,
            loop_gain: -0.5,
            ..RelayConfig::default()
        };
        let topology = MixingTopology::from_config(&config);
        assert_eq!(topology.live.gain, 0.0);
        assert_eq!(topology.background.unwrap().gain, 0.0);
    }

    #[test]
    fn command_line_quotes_filter_graph() {
        let topology = MixingTopology::from_config(&RelayConfig::default());
        let line = topology.command_line();
        assert!(line.starts_with("ffmpeg -hide_banner -nostdin"));
        assert!(line.contains("\"[0:a]volume=1[a0];"));
    }
}
