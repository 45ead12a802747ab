//! Session-scoped owner of the client audio graph and its visual feedback.
//!
//! The host forwards input, native media events and display frames to one
//! `AudioEngine`; every reaction goes through the transition table in
//! [`crate::player::state`]. Failures are logged and never escape a handler.

use std::{path::PathBuf, sync::Arc};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        AudioGraph, EnergyMeter, EnergyReading, GainParam, GraphHandles, GraphRenderer,
        SourceBinding, constants::NEUTRAL_SCALE, decoder::decode_file, nodes::AudioBuffer,
    },
    common::errors::PlayerError,
    configs::PlayerConfig,
    player::{
        media_session::{MediaAction, MediaSessionBridge},
        platform::{ContextState, FrameHandle, OutputContext, Platform},
        sampler::SamplingLoop,
        state::{Effect, PlayerEvent, PlayerState, Snapshot, Transition, transition},
    },
};

/// Identity of one physical user input. Several listeners may observe the
/// same gesture; they pass the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gesture(pub u64);

/// Native events of the playback element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    Play,
    Pause,
}

type LoopDecode = JoinHandle<Result<AudioBuffer, PlayerError>>;

pub struct AudioEngine {
    config: PlayerConfig,
    platform: Platform,
    binding: Option<SourceBinding>,
    context: Option<Arc<dyn OutputContext>>,
    graph: Option<GraphRenderer>,
    handles: Option<GraphHandles>,
    loop_gain: Option<GainParam>,
    pending_loop: Option<LoopDecode>,
    snapshot: Snapshot,
    sampler: SamplingLoop,
    meter: EnergyMeter,
    scratch: Vec<u8>,
    init_gesture: Option<Gesture>,
    media: MediaSessionBridge,
}

impl AudioEngine {
    pub fn new(config: PlayerConfig, platform: Platform, binding: SourceBinding) -> Self {
        let secondary = platform
            .secondary
            .as_ref()
            .map(|_| config.secondary_exponent);
        let media = MediaSessionBridge::new(
            platform.media_session.clone(),
            config.media_session.as_ref(),
        );

        Self {
            meter: EnergyMeter::new(config.sensitivity, secondary),
            sampler: SamplingLoop::new(platform.clock.clone()),
            config,
            platform,
            binding: Some(binding),
            context: None,
            graph: None,
            handles: None,
            loop_gain: None,
            pending_loop: None,
            snapshot: Snapshot::default(),
            scratch: Vec::new(),
            init_gesture: None,
            media,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    pub fn state(&self) -> PlayerState {
        self.snapshot.state
    }

    pub fn is_muted(&self) -> bool {
        self.snapshot.muted
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn handles(&self) -> Option<&GraphHandles> {
        self.handles.as_ref()
    }

    pub fn renderer(&self) -> Option<&GraphRenderer> {
        self.graph.as_ref()
    }

    pub fn loop_gain(&self) -> Option<&GainParam> {
        self.loop_gain.as_ref()
    }

    /// Builds the graph and starts playback. Must be called from a direct
    /// user-input handler: the output context is created before the first
    /// suspension point. Later calls do nothing.
    pub async fn on_first_user_gesture(&mut self, gesture: Gesture) -> PlayerState {
        if self.snapshot.state != PlayerState::Uninitialized {
            return self.snapshot.state;
        }
        self.init_gesture = Some(gesture);
        self.dispatch(PlayerEvent::Gesture).await
    }

    /// The on-screen control. A toggle carrying the gesture that initialised
    /// the engine is the same click seen by a second listener and is ignored.
    pub async fn toggle(&mut self, gesture: Gesture) -> PlayerState {
        if self.init_gesture == Some(gesture) {
            debug!("toggle for initialising gesture {:?} ignored", gesture);
            return self.snapshot.state;
        }
        if self.snapshot.state == PlayerState::Uninitialized {
            self.init_gesture = Some(gesture);
        }
        self.dispatch(PlayerEvent::Toggle).await
    }

    /// Only touches the master gain.
    pub async fn set_muted(&mut self, muted: bool) -> PlayerState {
        self.dispatch(PlayerEvent::Mute(muted)).await
    }

    pub async fn on_element_event(&mut self, event: ElementEvent) -> PlayerState {
        let event = match event {
            ElementEvent::Play => PlayerEvent::MediaPlay,
            ElementEvent::Pause => PlayerEvent::MediaPause,
        };
        self.dispatch(event).await
    }

    /// Media-session play/pause. Delegates to the toggle control when the
    /// action would change the transport.
    pub async fn on_media_action(&mut self, action: MediaAction) -> PlayerState {
        if MediaSessionBridge::wants_toggle(action, self.snapshot) {
            self.dispatch(PlayerEvent::Toggle).await
        } else {
            self.snapshot.state
        }
    }

    pub async fn on_context_state(&mut self, state: ContextState) -> PlayerState {
        match state {
            ContextState::Suspended => self.dispatch(PlayerEvent::ContextSuspended).await,
            ContextState::Closed => {
                warn!("output context closed by the platform");
                self.snapshot.state
            }
            ContextState::Running => self.snapshot.state,
        }
    }

    /// Samples one display frame. Returns `None` for frames that are stale
    /// or arrive while not playing; those must not touch the indicators.
    pub fn sample_frame(&mut self, frame: FrameHandle) -> Option<EnergyReading> {
        if !self.sampler.on_frame(frame) {
            return None;
        }
        if !self.snapshot.is_playing() {
            self.sampler.cancel();
            return None;
        }
        self.poll_loop_asset();

        let handles = self.handles.as_ref()?;
        self.scratch.resize(handles.analyser.frequency_bin_count(), 128);
        handles.analyser.byte_time_domain_data(&mut self.scratch);

        let reading = self.meter.read(&self.scratch);
        self.platform.primary.apply_scale(reading.primary);
        if let (Some(indicator), Some(scale)) = (&self.platform.secondary, reading.secondary) {
            indicator.apply_scale(scale);
        }
        Some(reading)
    }

    /// Attaches the decoded loop asset once its decode has finished. Never
    /// blocks; returns whether a loop was attached by this call.
    pub fn poll_loop_asset(&mut self) -> bool {
        let Some(task) = self.pending_loop.take() else {
            return false;
        };
        if !task.is_finished() {
            self.pending_loop = Some(task);
            return false;
        }

        match task.now_or_never() {
            Some(Ok(Ok(buffer))) => {
                let Some(graph) = &self.graph else {
                    return false;
                };
                self.loop_gain = graph.lock().attach_loop(buffer, self.config.loop_gain);
                self.loop_gain.is_some()
            }
            Some(Ok(Err(e))) => {
                warn!("loop asset unavailable: {}", e);
                false
            }
            Some(Err(e)) => {
                warn!("loop asset decode task failed: {}", e);
                false
            }
            None => false,
        }
    }

    pub async fn teardown(&mut self) -> PlayerState {
        self.dispatch(PlayerEvent::Teardown).await
    }

    async fn dispatch(&mut self, event: PlayerEvent) -> PlayerState {
        let mut next_event = Some(event);

        while let Some(event) = next_event.take() {
            let before = self.snapshot;
            let Transition { next, effects } = transition(before, event, self.config.toggle_mode);
            if next != before {
                debug!("player {:?} -> {:?} on {:?}", before, next, event);
            }
            self.snapshot = next;

            for effect in effects {
                match self.apply(effect).await {
                    Ok(()) => {}
                    Err(PlayerError::PlaybackRejected(reason)) => {
                        warn!("playback rejected: {}", reason);
                        next_event = Some(PlayerEvent::PlayRejected(before));
                        break;
                    }
                    Err(e @ PlayerError::ContextUnavailable(_)) => {
                        warn!("{}", e);
                        self.snapshot = before;
                        break;
                    }
                    Err(e) => warn!("{:?} failed: {}", effect, e),
                }
            }

            self.media.sync(self.snapshot);
        }

        self.snapshot.state
    }

    async fn apply(&mut self, effect: Effect) -> Result<(), PlayerError> {
        match effect {
            Effect::BuildGraph => self.build_graph(),
            Effect::ResumeContext => match &self.context {
                Some(context) if context.state() == ContextState::Suspended => {
                    context.resume().await
                }
                _ => Ok(()),
            },
            Effect::PlayElement => self.platform.element.play().await.map_err(|e| match e {
                PlayerError::PlaybackRejected(_) => e,
                other => PlayerError::PlaybackRejected(other.to_string()),
            }),
            Effect::PauseElement => {
                if !self.platform.element.is_paused() {
                    self.platform.element.pause();
                }
                Ok(())
            }
            Effect::SetMuted(muted) => {
                if let Some(handles) = &self.handles {
                    handles
                        .master
                        .set(if muted { 0.0 } else { self.config.master_gain });
                }
                debug!("output {}", if muted { "muted" } else { "unmuted" });
                Ok(())
            }
            Effect::StartSampling => {
                if self.handles.is_none() {
                    return Err(PlayerError::Platform(
                        "sampling requested before the graph exists".into(),
                    ));
                }
                self.sampler.start();
                Ok(())
            }
            Effect::StopSampling => {
                self.sampler.cancel();
                self.platform.primary.apply_scale(NEUTRAL_SCALE);
                if let Some(secondary) = &self.platform.secondary {
                    secondary.apply_scale(NEUTRAL_SCALE);
                }
                Ok(())
            }
            Effect::CloseContext => {
                self.sampler.cancel();
                if let Some(task) = self.pending_loop.take() {
                    task.abort();
                }
                self.handles = None;
                self.graph = None;
                self.loop_gain = None;
                match self.context.take() {
                    Some(context) => context.close().await,
                    None => Ok(()),
                }
            }
        }
    }

    fn build_graph(&mut self) -> Result<(), PlayerError> {
        if self.graph.is_some() {
            return Ok(());
        }

        let context = self.platform.contexts.create()?;
        let Some(binding) = self.binding.take() else {
            return Err(PlayerError::Platform(
                "playback element is already bound to a graph".into(),
            ));
        };

        let sample_rate = context.sample_rate();
        let graph = AudioGraph::build(binding, &self.config, sample_rate, self.snapshot.muted);
        self.handles = Some(graph.handles());
        let renderer = graph.into_renderer();
        context.attach(renderer.clone());

        self.graph = Some(renderer);
        self.context = Some(context);
        self.media.register();
        self.start_loop_decode(sample_rate);

        info!("audio graph ready at {} Hz", sample_rate);
        Ok(())
    }

    fn start_loop_decode(&mut self, sample_rate: u32) {
        let Some(path) = self.config.loop_asset.as_ref().map(PathBuf::from) else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("decoding loop asset {}", path.display());
                self.pending_loop =
                    Some(handle.spawn_blocking(move || decode_file(&path, sample_rate)));
            }
            Err(_) => warn!("no runtime to decode {}, loop disabled", path.display()),
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.sampler.cancel();
        if let Some(task) = self.pending_loop.take() {
            task.abort();
        }

        let Some(context) = self.context.take() else {
            return;
        };
        if !self.platform.element.is_paused() {
            self.platform.element.pause();
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = context.close().await {
                    warn!("closing output context on drop: {}", e);
                }
            });
        }
    }
}
