use std::sync::Arc;

use tracing::debug;

use crate::{
    configs::MediaSessionConfig,
    player::{
        platform::{MediaMetadata, MediaPlaybackState, MediaSession},
        state::{PlayerState, Snapshot},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
}

/// Keeps the OS media controls in step with the engine. Absent when the host
/// has no media session or the config leaves it out.
pub struct MediaSessionBridge {
    session: Option<Arc<dyn MediaSession>>,
    metadata: Option<MediaMetadata>,
    last: Option<MediaPlaybackState>,
}

impl MediaSessionBridge {
    pub fn new(session: Option<Arc<dyn MediaSession>>, config: Option<&MediaSessionConfig>) -> Self {
        let metadata = config.map(|c| MediaMetadata {
            title: c.title.clone(),
            artist: c.artist.clone(),
            artwork: c.artwork.clone(),
        });
        Self {
            session: if metadata.is_some() { session } else { None },
            metadata,
            last: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn register(&self) {
        if let (Some(session), Some(metadata)) = (&self.session, &self.metadata) {
            debug!("media session: {} / {}", metadata.title, metadata.artist);
            session.set_metadata(metadata);
        }
    }

    /// Publishes the playback state if it changed since the last call.
    pub fn sync(&mut self, snapshot: Snapshot) {
        let Some(session) = &self.session else {
            return;
        };
        let state = match snapshot.state {
            PlayerState::Playing => MediaPlaybackState::Playing,
            PlayerState::Ready | PlayerState::Paused => MediaPlaybackState::Paused,
            PlayerState::Uninitialized | PlayerState::Closed => MediaPlaybackState::None,
        };
        if self.last != Some(state) {
            session.set_playback_state(state);
            self.last = Some(state);
        }
    }

    /// Whether `action` should be forwarded to the toggle control. Actions
    /// that would not change the transport are dropped.
    pub fn wants_toggle(action: MediaAction, snapshot: Snapshot) -> bool {
        match action {
            MediaAction::Play => matches!(snapshot.state, PlayerState::Ready | PlayerState::Paused),
            MediaAction::Pause => snapshot.is_playing(),
        }
    }
}
