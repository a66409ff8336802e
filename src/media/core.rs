use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;
use thiserror::Error;

use crate::clock::{Clock, Scheduler, TimerHandle};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::SessionMetrics;

use super::consent::ConsentStore;

const LOG_TARGET: &str = "console::media";

/// Where the controller currently stands. `Confirmed` is terminal for the
/// page lifetime unless playback is externally paused, which drops the
/// controller back to `Unattempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockPhase {
    Unattempted,
    PlayingMuted,
    AwaitingGesture,
    PlayingUnmuted,
    Confirmed,
}

/// Platform rejection classes for a play attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Autoplay policy refused to start (or unmute) playback. Expected and
    /// recoverable; triggers the fallback/retry path.
    #[error("playback blocked pending a user gesture")]
    NotAllowed,
    #[error("playback failed: {0}")]
    Other(String),
}

/// External events the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSignal {
    /// Any user interaction anywhere on the page.
    Gesture,
    /// Playback paused for a reason other than reaching the end.
    Pause,
    /// Playback reached the end of the media.
    Ended,
    /// Stall, buffer underrun, or a comparable interruption.
    Stalled,
    /// Playback reported it is running.
    Playing,
    /// The mute state changed externally.
    VolumeChanged,
    /// The page became visible again.
    VisibilityRegained,
}

/// The video element analog. `request_play` reflects the platform's
/// autoplay policy: a muted attempt always succeeds, an unmuted attempt
/// may be rejected until a gesture or prior consent permits it.
pub trait MediaSurface: Send {
    fn request_play(&mut self, muted: bool) -> Result<(), PlaybackError>;
    fn is_muted(&self) -> bool;

    fn is_looping(&self) -> bool {
        true
    }

    fn rewind(&mut self) {}

    /// Show or hide the "sound locked" indicator attached to the surface.
    fn set_gate_visible(&mut self, _visible: bool) {}
}

/// Recovery poll token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecoveryTick;

pub struct UnlockConfig {
    /// Cadence of unmuted re-attempts while awaiting a gesture.
    pub recovery_interval: Duration,
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<SessionMetrics>>>,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            recovery_interval: Duration::from_millis(250),
            logger: None,
            metrics: None,
        }
    }
}

/// Retry state machine that escalates from muted to unmuted playback.
///
/// The loop is unbounded by design: the cinematic must eventually produce
/// sound, so every failure path degrades (muted fallback, gate indicator,
/// recovery poll) rather than reporting an error. The controller runs
/// independently of the terminal engine and shares nothing with it beyond
/// the optional metrics handle.
pub struct UnlockController {
    surface: Box<dyn MediaSurface>,
    consent: Box<dyn ConsentStore>,
    clock: Box<dyn Clock>,
    timers: Scheduler<RecoveryTick>,
    retry: Option<TimerHandle>,
    phase: UnlockPhase,
    awaiting: bool,
    consent_granted: bool,
    recovery_interval: Duration,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<SessionMetrics>>>,
}

impl UnlockController {
    pub fn new(
        surface: impl MediaSurface + 'static,
        consent: impl ConsentStore + 'static,
        clock: impl Clock + 'static,
        config: UnlockConfig,
    ) -> Self {
        // Consent is read once at start-up; afterwards the cached flag is
        // authoritative and only confirmed unlocks write it back.
        let consent_granted = consent.granted();
        Self {
            surface: Box::new(surface),
            consent: Box::new(consent),
            clock: Box::new(clock),
            timers: Scheduler::new(),
            retry: None,
            phase: UnlockPhase::Unattempted,
            awaiting: false,
            consent_granted,
            recovery_interval: config.recovery_interval,
            logger: config.logger,
            metrics: config.metrics,
        }
    }

    /// Work toward looping, unmuted playback. Safe to call at any time;
    /// repeated calls converge on the same state.
    ///
    /// The first attempt is unmuted with a muted fallback. While a gesture
    /// is still pending, re-invocations start muted so the fallback
    /// playback is never torn down — unless consent was already granted,
    /// in which case every attempt goes straight to unmuted.
    pub fn ensure_playing(&mut self) {
        let start_muted = self.awaiting && !self.consent_granted;
        self.attempt(start_muted, true);
    }

    /// Feed an external playback or interaction event.
    pub fn on_signal(&mut self, signal: MediaSignal) {
        match signal {
            MediaSignal::Gesture => {
                if self.awaiting {
                    self.record_retry();
                    self.attempt(false, false);
                }
            }
            MediaSignal::Pause => {
                if self.phase == UnlockPhase::Confirmed {
                    self.phase = UnlockPhase::Unattempted;
                }
                self.ensure_playing();
            }
            MediaSignal::Ended => {
                if !self.surface.is_looping() {
                    self.surface.rewind();
                }
                self.ensure_playing();
            }
            MediaSignal::Stalled => {
                self.ensure_playing();
            }
            MediaSignal::VisibilityRegained => {
                self.ensure_playing();
                self.schedule_recovery();
            }
            MediaSignal::Playing => {
                self.schedule_recovery();
            }
            MediaSignal::VolumeChanged => {
                if !self.surface.is_muted() {
                    self.unlocked();
                } else if self.awaiting {
                    self.surface.set_gate_visible(true);
                }
            }
        }
    }

    /// Drain due recovery polls.
    pub fn advance(&mut self) {
        let now = self.clock.now();
        while self.timers.pop_due(now).is_some() {
            self.retry = None;
            if !self.awaiting {
                continue;
            }
            self.record_retry();
            self.attempt(false, false);
            self.schedule_recovery();
        }
    }

    /// Earliest pending poll deadline, for sizing the embedder's poll
    /// timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn phase(&self) -> UnlockPhase {
        self.phase
    }

    pub fn awaiting_gesture(&self) -> bool {
        self.awaiting
    }

    fn attempt(&mut self, muted: bool, muted_fallback: bool) {
        match self.surface.request_play(muted) {
            Ok(()) => {
                if self.surface.is_muted() {
                    self.phase = UnlockPhase::PlayingMuted;
                    self.begin_awaiting();
                } else {
                    self.unlocked();
                }
            }
            Err(PlaybackError::NotAllowed) => {
                if !muted && muted_fallback {
                    self.attempt(true, false);
                    return;
                }
                // Muted playback (if any) keeps running; we only failed to
                // unmute it.
                if self.phase != UnlockPhase::PlayingMuted {
                    self.phase = UnlockPhase::AwaitingGesture;
                }
                self.begin_awaiting();
            }
            Err(PlaybackError::Other(reason)) => {
                self.log(
                    LogLevel::Debug,
                    "play_attempt_failed",
                    [json_kv("reason", json!(reason))],
                );
                self.schedule_recovery();
            }
        }
    }

    fn begin_awaiting(&mut self) {
        self.awaiting = true;
        self.surface.set_gate_visible(true);
        self.schedule_recovery();
    }

    fn unlocked(&mut self) {
        self.phase = UnlockPhase::PlayingUnmuted;
        self.awaiting = false;
        self.surface.set_gate_visible(false);
        if let Some(handle) = self.retry.take() {
            self.timers.cancel(handle);
        }
        if !self.consent_granted {
            self.consent_granted = true;
            self.consent.set_granted(true);
        }
        self.phase = UnlockPhase::Confirmed;
        self.log(LogLevel::Info, "unlock_confirmed", std::iter::empty());
    }

    fn schedule_recovery(&mut self) {
        if !self.awaiting || self.retry.is_some() {
            return;
        }
        let at = self.clock.now() + self.recovery_interval;
        self.retry = Some(self.timers.schedule(at, RecoveryTick));
    }

    fn record_retry(&mut self) {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_media_retry();
            }
        }
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) {
        if let Some(logger) = &self.logger {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::media::consent::MemoryConsent;

    #[derive(Debug, Default)]
    struct SurfaceState {
        muted: bool,
        looping: bool,
        allow_unmuted: bool,
        fail_unmuted_with_other: bool,
        gate_visible: bool,
        rewinds: u32,
        play_calls: Vec<bool>,
    }

    #[derive(Clone)]
    struct ScriptedSurface {
        state: Arc<Mutex<SurfaceState>>,
    }

    impl ScriptedSurface {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(SurfaceState {
                    looping: true,
                    ..SurfaceState::default()
                })),
            }
        }

        fn with<R>(&self, f: impl FnOnce(&mut SurfaceState) -> R) -> R {
            f(&mut self.state.lock().unwrap())
        }
    }

    impl MediaSurface for ScriptedSurface {
        fn request_play(&mut self, muted: bool) -> Result<(), PlaybackError> {
            self.with(|state| {
                state.play_calls.push(muted);
                if muted {
                    state.muted = true;
                    Ok(())
                } else if state.fail_unmuted_with_other {
                    Err(PlaybackError::Other("decode error".to_string()))
                } else if state.allow_unmuted {
                    state.muted = false;
                    Ok(())
                } else {
                    Err(PlaybackError::NotAllowed)
                }
            })
        }

        fn is_muted(&self) -> bool {
            self.with(|state| state.muted)
        }

        fn is_looping(&self) -> bool {
            self.with(|state| state.looping)
        }

        fn rewind(&mut self) {
            self.with(|state| state.rewinds += 1);
        }

        fn set_gate_visible(&mut self, visible: bool) {
            self.with(|state| state.gate_visible = visible);
        }
    }

    struct Rig {
        controller: UnlockController,
        surface: ScriptedSurface,
        consent: MemoryConsent,
        clock: ManualClock,
    }

    fn rig_with_consent(granted: bool) -> Rig {
        let surface = ScriptedSurface::new();
        let consent = MemoryConsent::new(granted);
        let clock = ManualClock::new();
        let controller = UnlockController::new(
            surface.clone(),
            consent.clone(),
            clock.clone(),
            UnlockConfig::default(),
        );
        Rig {
            controller,
            surface,
            consent,
            clock,
        }
    }

    fn rig() -> Rig {
        rig_with_consent(false)
    }

    #[test]
    fn blocked_autoplay_falls_back_to_muted_and_awaits() {
        let mut r = rig();
        r.controller.ensure_playing();

        assert_eq!(r.surface.with(|s| s.play_calls.clone()), vec![false, true]);
        assert_eq!(r.controller.phase(), UnlockPhase::PlayingMuted);
        assert!(r.controller.awaiting_gesture());
        assert!(r.surface.with(|s| s.gate_visible));
    }

    #[test]
    fn a_gesture_unlocks_and_persists_consent() {
        let mut r = rig();
        r.controller.ensure_playing();
        r.surface.with(|s| s.allow_unmuted = true);

        r.controller.on_signal(MediaSignal::Gesture);

        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);
        assert!(!r.controller.awaiting_gesture());
        assert!(!r.surface.with(|s| s.gate_visible));
        assert!(r.consent.is_granted());
        assert!(r.controller.next_deadline().is_none());
    }

    #[test]
    fn gestures_outside_the_awaiting_state_are_ignored() {
        let mut r = rig();
        r.controller.on_signal(MediaSignal::Gesture);
        assert!(r.surface.with(|s| s.play_calls.is_empty()));
    }

    #[test]
    fn recovery_polls_until_the_platform_allows_unmuted() {
        let mut r = rig();
        r.controller.ensure_playing();
        assert_eq!(r.surface.with(|s| s.play_calls.len()), 2);

        // First poll: still blocked, timer re-armed.
        r.clock.advance(Duration::from_millis(250));
        r.controller.advance();
        assert_eq!(r.surface.with(|s| s.play_calls.len()), 3);
        assert!(r.controller.awaiting_gesture());
        assert!(r.controller.next_deadline().is_some());

        // Permission appears (programmatic grant); the next poll confirms.
        r.surface.with(|s| s.allow_unmuted = true);
        r.clock.advance(Duration::from_millis(250));
        r.controller.advance();
        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);
        assert!(r.controller.next_deadline().is_none());
    }

    #[test]
    fn prior_consent_skips_straight_to_unmuted() {
        let mut r = rig_with_consent(true);
        r.surface.with(|s| s.allow_unmuted = true);
        r.controller.ensure_playing();

        assert_eq!(r.surface.with(|s| s.play_calls.clone()), vec![false]);
        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);
    }

    #[test]
    fn external_pause_reenters_and_replays() {
        let mut r = rig_with_consent(true);
        r.surface.with(|s| s.allow_unmuted = true);
        r.controller.ensure_playing();
        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);

        r.controller.on_signal(MediaSignal::Pause);
        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);
        assert_eq!(r.surface.with(|s| s.play_calls.len()), 2);
    }

    #[test]
    fn ended_media_rewinds_when_not_looping() {
        let mut r = rig_with_consent(true);
        r.surface.with(|s| {
            s.allow_unmuted = true;
            s.looping = false;
        });
        r.controller.ensure_playing();
        r.controller.on_signal(MediaSignal::Ended);

        assert_eq!(r.surface.with(|s| s.rewinds), 1);
        assert_eq!(r.surface.with(|s| s.play_calls.len()), 2);
    }

    #[test]
    fn volume_change_to_unmuted_confirms_immediately() {
        let mut r = rig();
        r.controller.ensure_playing();
        assert!(r.controller.awaiting_gesture());

        // The user unmutes through the platform controls.
        r.surface.with(|s| s.muted = false);
        r.controller.on_signal(MediaSignal::VolumeChanged);

        assert_eq!(r.controller.phase(), UnlockPhase::Confirmed);
        assert!(!r.surface.with(|s| s.gate_visible));
        assert!(r.consent.is_granted());
    }

    #[test]
    fn other_errors_keep_the_poll_loop_alive() {
        let mut r = rig();
        r.controller.ensure_playing();
        r.surface.with(|s| s.fail_unmuted_with_other = true);

        r.clock.advance(Duration::from_millis(250));
        r.controller.advance();

        assert!(r.controller.awaiting_gesture());
        assert!(r.controller.next_deadline().is_some());
    }

    #[test]
    fn stall_and_visibility_reinvoke_playback() {
        let mut r = rig_with_consent(true);
        r.surface.with(|s| s.allow_unmuted = true);
        r.controller.ensure_playing();
        let calls = r.surface.with(|s| s.play_calls.len());

        r.controller.on_signal(MediaSignal::Stalled);
        r.controller.on_signal(MediaSignal::VisibilityRegained);
        assert_eq!(r.surface.with(|s| s.play_calls.len()), calls + 2);
    }

    #[test]
    fn metrics_count_retries() {
        let metrics = Arc::new(Mutex::new(SessionMetrics::new()));
        let surface = ScriptedSurface::new();
        let clock = ManualClock::new();
        let mut controller = UnlockController::new(
            surface,
            MemoryConsent::default(),
            clock.clone(),
            UnlockConfig {
                metrics: Some(metrics.clone()),
                ..UnlockConfig::default()
            },
        );

        controller.ensure_playing();
        clock.advance(Duration::from_millis(250));
        controller.advance();
        controller.on_signal(MediaSignal::Gesture);

        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.media_retries, 2);
    }
}
