use std::sync::atomic::{AtomicU64, Ordering};

/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one relay request in logs, from accept until the subprocess is reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u64);

impl StreamId {
    pub fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for StreamId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Encoded audio containers the relay can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Ogg,
    Aac,
}

impl AudioFormat {
    /// The ffmpeg muxer name passed to `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Aac => "adts",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Aac => "audio/aac",
        }
    }

    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "ogg" | "oga" => Some(Self::Ogg),
            "aac" => Some(Self::Aac),
            _ => None,
        }
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ids_are_unique_and_display_with_prefix() {
        let a = StreamId::next();
        let b = StreamId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("stream-"));
    }

    #[test]
    fn audio_format_mapping() {
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Mp3.muxer(), "mp3");
        assert_eq!(AudioFormat::from_ext("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_ext("wav"), None);
    }
}
