use std::time::{Duration, Instant};

use crate::audio::{AudioCue, AudioPort};
use crate::clock::{Scheduler, TimerHandle};
use crate::stage::{HistoryEntry, Stage, Surface, WindowId};

use super::windows::WindowManager;
use super::{SessionState, TimerToken};

/// Line spammed into the history while the cinematic runs.
pub const SPAM_LINE: &str = "YOU DIDN'T SAY THE MAGIC WORD!";

/// Stacking depth for the home-key overlay raised at the end.
pub const HOME_KEY_DEPTH: u32 = 64_000;

/// Lifecycle of the lockdown cinematic. Transitions are strictly forward;
/// once `Triggered` there is no path back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockdownState {
    Idle,
    AccessDenialCounting,
    Triggered,
    Animating,
    Revealed,
    Complete,
}

/// Scheduled checkpoints of the cinematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockdownStep {
    /// Append the `...and...` line.
    AndThen,
    /// Play the lockdown siren.
    Siren,
    /// Start the error-spam interval.
    SpamStart,
    /// Begin the environment slide transition.
    SlideStart,
    /// The slide finished; the scene is mid-animation.
    SlideDone,
    /// Cancel spam, start the reveal video, swap the scene.
    Reveal,
    /// Raise the home-key overlay.
    HomeKey,
}

/// Offsets of every step, measured from the trigger instant. Tests inject
/// compressed tables; production uses the defaults.
#[derive(Debug, Clone)]
pub struct LockdownTimings {
    pub and_then: Duration,
    pub siren: Duration,
    pub spam_start: Duration,
    pub spam_interval: Duration,
    pub slide_start: Duration,
    pub slide_duration: Duration,
    pub reveal_delay: Duration,
    pub home_key_delay: Duration,
}

impl Default for LockdownTimings {
    fn default() -> Self {
        Self {
            and_then: Duration::from_millis(200),
            siren: Duration::from_millis(1000),
            spam_start: Duration::from_millis(1000),
            spam_interval: Duration::from_millis(50),
            slide_start: Duration::from_millis(4000),
            slide_duration: Duration::from_millis(2000),
            reveal_delay: Duration::from_millis(2000),
            home_key_delay: Duration::from_millis(10000),
        }
    }
}

impl LockdownTimings {
    fn slide_done(&self) -> Duration {
        self.slide_start + self.slide_duration
    }

    fn reveal(&self) -> Duration {
        self.slide_done() + self.reveal_delay
    }

    fn home_key(&self) -> Duration {
        self.reveal() + self.home_key_delay
    }
}

/// One-shot timed state machine for the lockdown cinematic.
///
/// `trigger` performs the synchronous T+0 work (input lockout happens in
/// the same turn as the threshold check, so no further input can race the
/// cinematic) and schedules every later step on the session's timer queue.
/// Individual steps degrade to no-ops when their scene hook is absent; the
/// sequence itself always runs to completion.
pub struct LockdownSequencer {
    state: LockdownState,
    timings: LockdownTimings,
    window: Option<WindowId>,
    spam: Option<TimerHandle>,
}

impl LockdownSequencer {
    pub fn new(timings: LockdownTimings) -> Self {
        Self {
            state: LockdownState::Idle,
            timings,
            window: None,
            spam: None,
        }
    }

    pub fn state(&self) -> LockdownState {
        self.state
    }

    /// Record that a denial was counted. Only moves `Idle` forward; later
    /// states are never rewound.
    pub fn note_denial(&mut self) {
        if self.state == LockdownState::Idle {
            self.state = LockdownState::AccessDenialCounting;
        }
    }

    /// Fire the cinematic. Idempotent: a second trigger is ignored.
    pub fn trigger(
        &mut self,
        now: Instant,
        window: WindowId,
        state: &mut SessionState,
        windows: &mut WindowManager,
        stage: &mut dyn Stage,
        timers: &mut Scheduler<TimerToken>,
    ) {
        if self.state > LockdownState::AccessDenialCounting {
            return;
        }

        state.locked_down = true;
        stage.set_inputs_enabled(false);
        stage.set_prompt_visible(&window, false);
        windows.deactivate_all(stage);
        self.window = Some(window);
        self.state = LockdownState::Triggered;

        let t = &self.timings;
        timers.schedule(now + t.and_then, TimerToken::Lockdown(LockdownStep::AndThen));
        timers.schedule(now + t.siren, TimerToken::Lockdown(LockdownStep::Siren));
        timers.schedule(
            now + t.spam_start,
            TimerToken::Lockdown(LockdownStep::SpamStart),
        );
        timers.schedule(
            now + t.slide_start,
            TimerToken::Lockdown(LockdownStep::SlideStart),
        );
        timers.schedule(
            now + t.slide_done(),
            TimerToken::Lockdown(LockdownStep::SlideDone),
        );
        timers.schedule(now + t.reveal(), TimerToken::Lockdown(LockdownStep::Reveal));
        timers.schedule(
            now + t.home_key(),
            TimerToken::Lockdown(LockdownStep::HomeKey),
        );
    }

    /// Handle a due checkpoint.
    pub fn on_step(
        &mut self,
        step: LockdownStep,
        now: Instant,
        stage: &mut dyn Stage,
        audio: &mut dyn AudioPort,
        timers: &mut Scheduler<TimerToken>,
    ) {
        match step {
            LockdownStep::AndThen => {
                self.append(stage, HistoryEntry::Text("...and...".to_string()));
            }
            LockdownStep::Siren => {
                audio.play(AudioCue::LockDown);
            }
            LockdownStep::SpamStart => {
                if self.spam.is_none() {
                    self.spam = Some(timers.schedule_repeating(
                        now + self.timings.spam_interval,
                        self.timings.spam_interval,
                        TimerToken::ErrorSpam,
                    ));
                }
            }
            LockdownStep::SlideStart => {
                stage.begin_environment_slide(self.timings.slide_duration);
            }
            LockdownStep::SlideDone => {
                self.state = LockdownState::Animating;
            }
            LockdownStep::Reveal => {
                self.cancel_spam(timers);
                stage.start_reveal_video();
                stage.set_surface_visible(Surface::Desktop, false);
                stage.swap_backdrop();
                stage.set_surface_visible(Surface::RevealWindow, true);
                self.state = LockdownState::Revealed;
            }
            LockdownStep::HomeKey => {
                stage.raise_surface(Surface::HomeKey, HOME_KEY_DEPTH);
                self.state = LockdownState::Complete;
            }
        }
    }

    /// Append one spam line. Driven by the repeating timer until the
    /// reveal cancels it.
    pub fn on_spam_tick(&mut self, stage: &mut dyn Stage) {
        self.append(stage, HistoryEntry::Text(SPAM_LINE.to_string()));
    }

    /// Stop the spam interval. Safe to call repeatedly; the handle is
    /// taken on first use.
    pub fn cancel_spam(&mut self, timers: &mut Scheduler<TimerToken>) {
        if let Some(handle) = self.spam.take() {
            timers.cancel(handle);
        }
    }

    fn append(&mut self, stage: &mut dyn Stage, entry: HistoryEntry) {
        if let Some(window) = &self.window {
            stage.append_history(window, entry);
            stage.scroll_to_bottom(window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::stage::NullStage;

    fn sequencer() -> (
        LockdownSequencer,
        SessionState,
        WindowManager,
        NullStage,
        Scheduler<TimerToken>,
        ManualClock,
    ) {
        let mut windows = WindowManager::new();
        windows
            .register("main-terminal", super::super::windows::WindowKind::Console)
            .unwrap();
        (
            LockdownSequencer::new(LockdownTimings::default()),
            SessionState::default(),
            windows,
            NullStage,
            Scheduler::new(),
            ManualClock::new(),
        )
    }

    #[test]
    fn trigger_locks_the_session_and_schedules_every_step() {
        let (mut lockdown, mut state, mut windows, mut stage, mut timers, clock) = sequencer();
        lockdown.note_denial();
        lockdown.trigger(
            clock.now(),
            "main-terminal".to_string(),
            &mut state,
            &mut windows,
            &mut stage,
            &mut timers,
        );

        assert!(state.locked_down);
        assert_eq!(lockdown.state(), LockdownState::Triggered);
        assert_eq!(timers.len(), 7);
        assert!(windows.active().is_none());
    }

    #[test]
    fn second_trigger_is_ignored() {
        let (mut lockdown, mut state, mut windows, mut stage, mut timers, clock) = sequencer();
        lockdown.trigger(
            clock.now(),
            "main-terminal".to_string(),
            &mut state,
            &mut windows,
            &mut stage,
            &mut timers,
        );
        let scheduled = timers.len();
        lockdown.trigger(
            clock.now(),
            "main-terminal".to_string(),
            &mut state,
            &mut windows,
            &mut stage,
            &mut timers,
        );
        assert_eq!(timers.len(), scheduled);
    }

    #[test]
    fn spam_cancel_is_idempotent() {
        let (mut lockdown, _state, _windows, mut stage, mut timers, clock) = sequencer();
        lockdown.window = Some("main-terminal".to_string());
        lockdown.on_step(
            LockdownStep::SpamStart,
            clock.now(),
            &mut stage,
            &mut NullAudioForTest,
            &mut timers,
        );
        assert_eq!(timers.len(), 1);
        lockdown.cancel_spam(&mut timers);
        lockdown.cancel_spam(&mut timers);
        assert!(timers.is_empty());
    }

    #[test]
    fn spam_start_never_arms_twice() {
        let (mut lockdown, _state, _windows, mut stage, mut timers, clock) = sequencer();
        lockdown.on_step(
            LockdownStep::SpamStart,
            clock.now(),
            &mut stage,
            &mut NullAudioForTest,
            &mut timers,
        );
        lockdown.on_step(
            LockdownStep::SpamStart,
            clock.now(),
            &mut stage,
            &mut NullAudioForTest,
            &mut timers,
        );
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn states_only_move_forward() {
        let (mut lockdown, _state, _windows, mut stage, mut timers, clock) = sequencer();
        lockdown.window = Some("main-terminal".to_string());
        lockdown.on_step(
            LockdownStep::Reveal,
            clock.now(),
            &mut stage,
            &mut NullAudioForTest,
            &mut timers,
        );
        assert_eq!(lockdown.state(), LockdownState::Revealed);
        lockdown.note_denial();
        assert_eq!(lockdown.state(), LockdownState::Revealed);
    }

    struct NullAudioForTest;

    impl AudioPort for NullAudioForTest {
        fn play(&mut self, _cue: AudioCue) {}
        fn stop(&mut self, _cue: AudioCue) {}
    }
}
