use serde::{Deserialize, Serialize};

use crate::common::types::AudioFormat;

/// Transcoder invocation for `GET /stream`. Read once at startup into a `MixingTopology`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_live_feed_url")]
    pub live_feed_url: String,
    /// Sent as the client identifier when fetching the live feed.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Looping background track. Unset relays the live feed alone.
    #[serde(default = "default_loop_asset")]
    pub loop_asset: Option<String>,
    #[serde(default = "default_live_gain")]
    pub live_gain: f32,
    #[serde(default = "default_loop_gain")]
    pub loop_gain: f32,
    #[serde(default = "default_format")]
    pub format: AudioFormat,
    #[serde(default = "default_channels")]
    pub channels: u8,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
    /// Passed to `-loglevel`; anything the transcoder prints ends up in our log.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Time between the interrupt and the forced kill.
    #[serde(default = "default_interrupt_grace_ms")]
    pub interrupt_grace_ms: u64,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_live_feed_url() -> String {
    "https://d.liveatc.net/klax6".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36".to_string()
}

fn default_loop_asset() -> Option<String> {
    Some("public/elevator.mp3".to_string())
}

fn default_live_gain() -> f32 {
    1.0
}

fn default_loop_gain() -> f32 {
    0.08
}

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

fn default_channels() -> u8 {
    2
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_bitrate_kbps() -> u32 {
    192
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_interrupt_grace_ms() -> u64 {
    2_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            live_feed_url: default_live_feed_url(),
            user_agent: default_user_agent(),
            loop_asset: default_loop_asset(),
            live_gain: default_live_gain(),
            loop_gain: default_loop_gain(),
            format: default_format(),
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            bitrate_kbps: default_bitrate_kbps(),
            log_level: default_log_level(),
            interrupt_grace_ms: default_interrupt_grace_ms(),
        }
    }
}
