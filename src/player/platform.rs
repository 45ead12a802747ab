//! Seams between the engine and the host it runs in.
//!
//! A browser host maps these onto the output context, the media element, the
//! animation frame scheduler and the DOM; tests use recording fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{audio::GraphRenderer, common::errors::PlayerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Render-side pull of the playback element's decoded audio.
pub trait SampleTap: Send {
    /// Writes the next `out.len() / channels` interleaved frames. Leaves
    /// silence in `out` when the element is not producing audio.
    fn pull(&mut self, out: &mut [f32], channels: usize);
}

#[async_trait]
pub trait OutputContext: Send + Sync {
    fn state(&self) -> ContextState;
    fn sample_rate(&self) -> u32;
    async fn resume(&self) -> Result<(), PlayerError>;
    async fn close(&self) -> Result<(), PlayerError>;
    /// Hands the graph to the host's render callback, which drives
    /// [`crate::audio::AudioGraph::render`] once per quantum.
    fn attach(&self, renderer: GraphRenderer);
}

/// Creates output contexts. Hosts with autoplay policies refuse outside a
/// direct user gesture.
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn OutputContext>, PlayerError>;
}

#[async_trait]
pub trait PlaybackElement: Send + Sync {
    async fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Display-refresh scheduler. A requested frame fires once, by the host
/// calling [`crate::player::AudioEngine::sample_frame`] with its handle.
pub trait FrameClock: Send + Sync {
    fn request_frame(&self) -> FrameHandle;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// An on-screen element scaled by the audio energy.
pub trait Indicator: Send + Sync {
    fn apply_scale(&self, scale: f32);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub artwork: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaybackState {
    None,
    Paused,
    Playing,
}

/// OS-level media controls. Their play/pause actions come back to the
/// engine through [`crate::player::AudioEngine::on_media_action`].
pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: &MediaMetadata);
    fn set_playback_state(&self, state: MediaPlaybackState);
}

/// Everything the engine needs from its host.
#[derive(Clone)]
pub struct Platform {
    pub contexts: Arc<dyn ContextFactory>,
    pub element: Arc<dyn PlaybackElement>,
    pub clock: Arc<dyn FrameClock>,
    pub primary: Arc<dyn Indicator>,
    pub secondary: Option<Arc<dyn Indicator>>,
    pub media_session: Option<Arc<dyn MediaSession>>,
}
