//! Playback state machine.
//!
//! [`transition`] is the single source of truth for how the engine reacts to
//! gestures, control clicks, native media events and platform suspension. It
//! is pure: the engine executes the returned effects in order.

use crate::configs::ToggleMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No output context yet; waiting for the first gesture.
    Uninitialized,
    /// Graph built, transport idle.
    Ready,
    Playing,
    Paused,
    /// Torn down. Every event is ignored.
    Closed,
}

/// Transport state plus the orthogonal mute flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: PlayerState,
    pub muted: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            state: PlayerState::Uninitialized,
            muted: false,
        }
    }
}

impl Snapshot {
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// First direct user input; unlocks output creation.
    Gesture,
    /// The persistent on-screen control (or a media-session action).
    Toggle,
    /// The element's native `play` event.
    MediaPlay,
    /// The element's native `pause` event.
    MediaPause,
    /// The platform suspended the output context.
    ContextSuspended,
    /// The element refused to start. Carries the snapshot from before the
    /// attempt so the transport can fall back to it.
    PlayRejected(Snapshot),
    Mute(bool),
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    BuildGraph,
    ResumeContext,
    PlayElement,
    PauseElement,
    /// Master gain to zero (`true`) or back to its configured level.
    SetMuted(bool),
    StartSampling,
    /// Cancels the frame loop and puts the indicators back to neutral.
    StopSampling,
    CloseContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Snapshot,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(current: Snapshot) -> Self {
        Self {
            next: current,
            effects: Vec::new(),
        }
    }

    fn to(current: Snapshot, state: PlayerState, effects: Vec<Effect>) -> Self {
        Self {
            next: Snapshot { state, ..current },
            effects,
        }
    }
}

pub fn transition(current: Snapshot, event: PlayerEvent, mode: ToggleMode) -> Transition {
    use Effect::*;
    use PlayerEvent as E;
    use PlayerState as S;

    match (current.state, event) {
        (S::Closed, _) => Transition::stay(current),

        (_, E::Teardown) => {
            let mut effects = Vec::new();
            if current.is_playing() {
                effects.push(StopSampling);
            }
            if current.state != S::Uninitialized {
                effects.push(PauseElement);
                effects.push(CloseContext);
            }
            Transition::to(current, S::Closed, effects)
        }

        (_, E::Mute(muted)) => {
            if muted == current.muted {
                Transition::stay(current)
            } else {
                Transition {
                    next: Snapshot { muted, ..current },
                    effects: vec![SetMuted(muted)],
                }
            }
        }

        (S::Uninitialized, E::Gesture | E::Toggle) => Transition::to(
            current,
            S::Playing,
            vec![BuildGraph, ResumeContext, PlayElement, StartSampling],
        ),
        (S::Uninitialized, _) => Transition::stay(current),

        (S::Ready | S::Paused, E::Toggle) => {
            let mut effects = vec![ResumeContext, PlayElement, StartSampling];
            let mut next = Snapshot {
                state: S::Playing,
                ..current
            };
            if mode == ToggleMode::Mute && current.muted {
                effects.insert(0, SetMuted(false));
                next.muted = false;
            }
            Transition { next, effects }
        }
        (S::Ready | S::Paused, E::MediaPlay) => {
            Transition::to(current, S::Playing, vec![ResumeContext, StartSampling])
        }
        (S::Ready | S::Paused, _) => Transition::stay(current),

        (S::Playing, E::Toggle) => match mode {
            ToggleMode::Pause => {
                Transition::to(current, S::Paused, vec![PauseElement, StopSampling])
            }
            ToggleMode::Mute => {
                let muted = !current.muted;
                Transition {
                    next: Snapshot { muted, ..current },
                    effects: vec![SetMuted(muted)],
                }
            }
        },
        (S::Playing, E::MediaPause) => Transition::to(current, S::Paused, vec![StopSampling]),
        (S::Playing, E::ContextSuspended) => {
            Transition::to(current, S::Paused, vec![PauseElement, StopSampling])
        }
        // Sampling never started: PlayElement precedes StartSampling.
        (S::Playing, E::PlayRejected(prior)) => {
            let state = match prior.state {
                S::Uninitialized => S::Ready,
                other => other,
            };
            let effects = if prior.muted != current.muted {
                vec![SetMuted(prior.muted)]
            } else {
                Vec::new()
            };
            Transition {
                next: Snapshot {
                    state,
                    muted: prior.muted,
                },
                effects,
            }
        }
        (S::Playing, _) => Transition::stay(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(state: PlayerState) -> Snapshot {
        Snapshot {
            state,
            muted: false,
        }
    }

    #[test]
    fn first_gesture_builds_and_plays() {
        let t = transition(Snapshot::default(), PlayerEvent::Gesture, ToggleMode::Pause);
        assert_eq!(t.next.state, PlayerState::Playing);
        assert_eq!(
            t.effects,
            vec![
                Effect::BuildGraph,
                Effect::ResumeContext,
                Effect::PlayElement,
                Effect::StartSampling
            ]
        );
    }

    #[test]
    fn later_gestures_are_ignored() {
        for state in [PlayerState::Ready, PlayerState::Playing, PlayerState::Paused] {
            let t = transition(at(state), PlayerEvent::Gesture, ToggleMode::Pause);
            assert_eq!(t.next, at(state));
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn pause_mode_toggle_round_trip() {
        let paused = transition(at(PlayerState::Playing), PlayerEvent::Toggle, ToggleMode::Pause);
        assert_eq!(paused.next.state, PlayerState::Paused);
        assert_eq!(paused.effects, vec![Effect::PauseElement, Effect::StopSampling]);

        let playing = transition(paused.next, PlayerEvent::Toggle, ToggleMode::Pause);
        assert_eq!(playing.next.state, PlayerState::Playing);
        assert_eq!(
            playing.effects,
            vec![Effect::ResumeContext, Effect::PlayElement, Effect::StartSampling]
        );
    }

    #[test]
    fn mute_mode_toggle_keeps_playing() {
        let muted = transition(at(PlayerState::Playing), PlayerEvent::Toggle, ToggleMode::Mute);
        assert_eq!(muted.next.state, PlayerState::Playing);
        assert!(muted.next.muted);
        assert_eq!(muted.effects, vec![Effect::SetMuted(true)]);

        let unmuted = transition(muted.next, PlayerEvent::Toggle, ToggleMode::Mute);
        assert!(!unmuted.next.muted);
        assert_eq!(unmuted.effects, vec![Effect::SetMuted(false)]);
    }

    #[test]
    fn mute_is_idempotent_and_leaves_transport_alone() {
        for state in [PlayerState::Ready, PlayerState::Playing, PlayerState::Paused] {
            let once = transition(at(state), PlayerEvent::Mute(true), ToggleMode::Pause);
            assert_eq!(once.next.state, state);
            assert_eq!(once.effects, vec![Effect::SetMuted(true)]);

            let twice = transition(once.next, PlayerEvent::Mute(true), ToggleMode::Pause);
            assert_eq!(twice.next, once.next);
            assert!(twice.effects.is_empty());
        }
    }

    #[test]
    fn leaving_playing_always_stops_sampling() {
        for event in [
            PlayerEvent::MediaPause,
            PlayerEvent::ContextSuspended,
            PlayerEvent::Teardown,
        ] {
            let t = transition(at(PlayerState::Playing), event, ToggleMode::Pause);
            assert_ne!(t.next.state, PlayerState::Playing);
            let stops = t.effects.iter().filter(|e| **e == Effect::StopSampling).count();
            assert_eq!(stops, 1, "{:?}", event);
        }
    }

    #[test]
    fn rejected_play_falls_back_to_the_prior_state() {
        let t = transition(
            at(PlayerState::Playing),
            PlayerEvent::PlayRejected(at(PlayerState::Paused)),
            ToggleMode::Pause,
        );
        assert_eq!(t.next, at(PlayerState::Paused));
        assert!(t.effects.is_empty());

        let t = transition(
            at(PlayerState::Playing),
            PlayerEvent::PlayRejected(Snapshot::default()),
            ToggleMode::Pause,
        );
        assert_eq!(t.next.state, PlayerState::Ready);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn rejected_unmuting_resume_restores_mute() {
        let prior = Snapshot {
            state: PlayerState::Paused,
            muted: true,
        };
        let t = transition(
            at(PlayerState::Playing),
            PlayerEvent::PlayRejected(prior),
            ToggleMode::Mute,
        );
        assert_eq!(t.next, prior);
        assert_eq!(t.effects, vec![Effect::SetMuted(true)]);
    }

    #[test]
    fn suspension_pauses_the_element() {
        let t = transition(
            at(PlayerState::Playing),
            PlayerEvent::ContextSuspended,
            ToggleMode::Mute,
        );
        assert_eq!(t.next.state, PlayerState::Paused);
        assert!(t.effects.contains(&Effect::PauseElement));
    }

    #[test]
    fn native_play_resumes_sampling_without_replaying() {
        let t = transition(at(PlayerState::Paused), PlayerEvent::MediaPlay, ToggleMode::Pause);
        assert_eq!(t.next.state, PlayerState::Playing);
        assert!(!t.effects.contains(&Effect::PlayElement));
        assert!(t.effects.contains(&Effect::StartSampling));
    }

    #[test]
    fn closed_ignores_everything() {
        let closed = at(PlayerState::Closed);
        for event in [
            PlayerEvent::Gesture,
            PlayerEvent::Toggle,
            PlayerEvent::MediaPlay,
            PlayerEvent::Mute(true),
            PlayerEvent::Teardown,
        ] {
            let t = transition(closed, event, ToggleMode::Pause);
            assert_eq!(t.next, closed);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn teardown_before_gesture_has_nothing_to_release() {
        let t = transition(Snapshot::default(), PlayerEvent::Teardown, ToggleMode::Pause);
        assert_eq!(t.next.state, PlayerState::Closed);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn toggle_in_mute_mode_unmutes_on_resume() {
        let current = Snapshot {
            state: PlayerState::Paused,
            muted: true,
        };
        let t = transition(current, PlayerEvent::Toggle, ToggleMode::Mute);
        assert_eq!(t.next.state, PlayerState::Playing);
        assert!(!t.next.muted);
        assert_eq!(t.effects[0], Effect::SetMuted(false));
    }
}
