use serde::{Deserialize, Serialize};

/// What the persistent on-screen control does while audio is playing.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleMode {
    /// Pause the media element and stop the visualizer.
    #[default]
    Pause,
    /// Drive the master gain to zero and keep the element (and visualizer) running.
    Mute,
}

/// Where the looping background asset joins the graph.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoopRouting {
    /// Summed before the analyser, so it moves the visualizer.
    Analysed,
    /// Summed after the analyser; audible but invisible to the visualizer.
    #[default]
    Bypass,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterStageConfig {
    Lowpass { frequency: f64, q: f64 },
    Highpass { frequency: f64, q: f64 },
    Bandpass { frequency: f64, q: f64 },
    Gain { value: f32 },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MediaSessionConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_artist")]
    pub artist: String,
    #[serde(default)]
    pub artwork: Option<String>,
}

fn default_title() -> String {
    "KLAX Tower".to_string()
}

fn default_artist() -> String {
    "skywave".to_string()
}

impl Default for MediaSessionConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            artist: default_artist(),
            artwork: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Power applied to the scale for the secondary indicator.
    #[serde(default = "default_secondary_exponent")]
    pub secondary_exponent: f32,
    #[serde(default)]
    pub toggle_mode: ToggleMode,
    #[serde(default)]
    pub loop_routing: LoopRouting,
    /// A short track mixed in client side. Unset disables the second source.
    #[serde(default)]
    pub loop_asset: Option<String>,
    #[serde(default = "default_loop_gain")]
    pub loop_gain: f32,
    #[serde(default = "default_master_gain")]
    pub master_gain: f32,
    #[serde(default)]
    pub filters: Vec<FilterStageConfig>,
    #[serde(default)]
    pub media_session: Option<MediaSessionConfig>,
}

fn default_fft_size() -> usize {
    256
}

fn default_sensitivity() -> f32 {
    5.0
}

fn default_secondary_exponent() -> f32 {
    1.6
}

fn default_loop_gain() -> f32 {
    0.08
}

fn default_master_gain() -> f32 {
    1.0
}

impl PlayerConfig {
    /// FFT sizes follow the analyser rules: a power of two in `32..=32768`.
    pub fn validated_fft_size(&self) -> usize {
        let size = self.fft_size.clamp(32, 32_768);
        if size.is_power_of_two() {
            size
        } else {
            size.next_power_of_two().min(32_768)
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            sensitivity: default_sensitivity(),
            secondary_exponent: default_secondary_exponent(),
            toggle_mode: ToggleMode::default(),
            loop_routing: LoopRouting::default(),
            loop_asset: None,
            loop_gain: default_loop_gain(),
            master_gain: default_master_gain(),
            filters: Vec::new(),
            media_session: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_size_is_forced_to_power_of_two() {
        let mut config = PlayerConfig::default();
        assert_eq!(config.validated_fft_size(), 256);
        config.fft_size = 300;
        assert_eq!(config.validated_fft_size(), 512);
        config.fft_size = 4;
        assert_eq!(config.validated_fft_size(), 32);
    }

    #[test]
    fn filter_stages_parse_from_tagged_tables() {
        let raw = r#"
            toggle_mode = "mute"
            loop_routing = "analysed"
            filters = [
                { type = "highpass", frequency = 300.0, q = 0.707 },
                { type = "gain", value = 1.5 },
            ]
        "#;
        let config: PlayerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.toggle_mode, ToggleMode::Mute);
        assert_eq!(config.loop_routing, LoopRouting::Analysed);
        assert_eq!(
            config.filters,
            vec![
                FilterStageConfig::Highpass { frequency: 300.0, q: 0.707 },
                FilterStageConfig::Gain { value: 1.5 },
            ]
        );
    }
}
