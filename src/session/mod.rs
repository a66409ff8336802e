//! Terminal session engine.
//!
//! [`ConsoleSession`] owns the interpreter state and orchestrates the rest
//! of the core: it echoes submitted lines, resolves and executes commands,
//! tracks window focus, and drains the timer queue that drives the lockdown
//! cinematic and other delayed effects. The embedding layer feeds it input
//! events and calls [`ConsoleSession::advance`] from its event loop.

pub mod lockdown;
pub mod windows;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::audio::{AudioCue, AudioPort};
use crate::clock::{Clock, Scheduler};
use crate::commands::{CommandContext, CommandRegistry, CommandSpec, install_builtin_commands};
use crate::error::{ConsoleError, Result};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, SessionMetrics};
use crate::stage::{HistoryEntry, Stage, Surface, WindowId};

use self::lockdown::{LockdownSequencer, LockdownState, LockdownStep, LockdownTimings};
use self::windows::{WindowKind, WindowManager};

/// Tokens drained from the session timer queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerToken {
    /// A lockdown cinematic checkpoint.
    Lockdown(LockdownStep),
    /// One spam line while the cinematic runs.
    ErrorSpam,
    /// Delayed `System Halt!` line for the `system` command.
    SystemHalt { window: WindowId },
    /// Delayed overlay reveal for the `display` command.
    RevealOverlay { surface: Surface },
}

/// Mutable session facts. One instance per session; every field has a
/// single writer (the engine, or the lockdown sequencer through the
/// engine's timer dispatch).
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    pub failed_access_attempts: u32,
    pub music_on: bool,
    pub locked_down: bool,
}

/// Tunable knobs. Defaults match the scripted scene; tests compress the
/// delays through [`LockdownTimings`].
pub struct SessionConfig {
    /// Denials needed before the lockdown fires.
    pub lockdown_threshold: u32,
    pub lockdown_timings: LockdownTimings,
    /// Delay before `system` prints its halt line.
    pub system_halt_delay: Duration,
    /// Delay before `display` reveals its overlay.
    pub overlay_reveal_delay: Duration,
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<SessionMetrics>>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lockdown_threshold: 3,
            lockdown_timings: LockdownTimings::default(),
            system_halt_delay: Duration::from_millis(900),
            overlay_reveal_delay: Duration::from_millis(300),
            logger: None,
            metrics: None,
        }
    }
}

const LOG_TARGET: &str = "console::session";

pub struct ConsoleSession {
    registry: CommandRegistry,
    state: SessionState,
    windows: WindowManager,
    lockdown: LockdownSequencer,
    timers: Scheduler<TimerToken>,
    stage: Box<dyn Stage>,
    audio: Box<dyn AudioPort>,
    clock: Box<dyn Clock>,
    lockdown_threshold: u32,
    system_halt_delay: Duration,
    overlay_reveal_delay: Duration,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<SessionMetrics>>>,
    started_at: Instant,
}

impl ConsoleSession {
    pub fn new(
        stage: impl Stage + 'static,
        audio: impl AudioPort + 'static,
        clock: impl Clock + 'static,
        config: SessionConfig,
    ) -> Self {
        let mut registry = CommandRegistry::new();
        install_builtin_commands(&mut registry);
        let started_at = clock.now();

        Self {
            registry,
            state: SessionState::default(),
            windows: WindowManager::new(),
            lockdown: LockdownSequencer::new(config.lockdown_timings),
            timers: Scheduler::new(),
            stage: Box::new(stage),
            audio: Box::new(audio),
            clock: Box::new(clock),
            lockdown_threshold: config.lockdown_threshold,
            system_halt_delay: config.system_halt_delay,
            overlay_reveal_delay: config.overlay_reveal_delay,
            logger: config.logger,
            metrics: config.metrics,
            started_at,
        }
    }

    pub fn register_window(&mut self, id: impl Into<WindowId>, kind: WindowKind) -> Result<()> {
        self.windows.register(id, kind)
    }

    /// Add a command on top of the built-in set. Duplicates are ignored.
    pub fn register_command(&mut self, spec: CommandSpec) {
        self.registry.register(spec);
    }

    pub fn activate_window(&mut self, id: &str) -> Result<()> {
        self.windows.activate(id, &mut *self.stage)
    }

    /// Outside click: clear all focus.
    pub fn deactivate_all(&mut self) {
        self.windows.deactivate_all(&mut *self.stage);
    }

    /// Title-bar drag start: raise without focusing.
    pub fn drag_raise(&mut self, id: &str) -> Result<()> {
        self.windows.raise(id, &mut *self.stage)
    }

    /// Mirror the in-progress input buffer. Discarded once the session is
    /// locked down, in the same turn the lock was set.
    pub fn input_preview(&mut self, id: &str, text: &str) {
        if self.state.locked_down {
            return;
        }
        let window = id.to_string();
        self.stage.set_input_preview(&window, text);
    }

    /// Process one submitted line from a window's input buffer.
    pub fn submit_line(&mut self, window_id: &str, line: &str) -> Result<()> {
        if self.state.locked_down {
            return Ok(());
        }

        let window: WindowId = window_id.to_string();
        let kind = self
            .windows
            .kind_of(&window)
            .ok_or_else(|| ConsoleError::UnknownWindow(window.clone()))?;

        self.with_metrics(SessionMetrics::record_line);

        // Every submission echoes, an empty line as a blank placeholder.
        let echoed = if line.is_empty() {
            " ".to_string()
        } else {
            line.to_string()
        };
        self.stage
            .append_history(&window, HistoryEntry::Entered(echoed));
        self.stage.set_input_preview(&window, "");

        // Free-text windows have no command semantics.
        if kind == WindowKind::Passive {
            self.stage.scroll_to_bottom(&window);
            return Ok(());
        }

        let Some(first) = line.split_whitespace().next().map(str::to_string) else {
            self.stage.scroll_to_bottom(&window);
            return Ok(());
        };

        let denials_before = self.state.failed_access_attempts;
        let locked_before = self.state.locked_down;

        let run = self.registry.resolve(&first).map(|spec| spec.run);
        let found = run.is_some();
        match run {
            Some(run) => {
                let now = self.clock.now();
                let mut ctx = CommandContext {
                    window: &window,
                    stage: &mut *self.stage,
                    audio: &mut *self.audio,
                    state: &mut self.state,
                    windows: &mut self.windows,
                    timers: &mut self.timers,
                    registry: &self.registry,
                    lockdown: &mut self.lockdown,
                    now,
                    lockdown_threshold: self.lockdown_threshold,
                    system_halt_delay: self.system_halt_delay,
                    overlay_reveal_delay: self.overlay_reveal_delay,
                    logger: self.logger.as_ref(),
                };
                run(&mut ctx, line);
                self.with_metrics(SessionMetrics::record_command);
            }
            None => {
                self.stage.append_history(
                    &window,
                    HistoryEntry::Text(format!("{first}: command not found")),
                );
                self.with_metrics(SessionMetrics::record_unknown_command);
            }
        }

        if self.state.failed_access_attempts > denials_before {
            self.with_metrics(SessionMetrics::record_access_denial);
        }
        if self.state.locked_down && !locked_before {
            self.log(
                LogLevel::Warn,
                "lockdown_triggered",
                [json_kv(
                    "failed_access_attempts",
                    json!(self.state.failed_access_attempts),
                )],
            );
        }

        self.stage.scroll_to_bottom(&window);
        self.log(
            LogLevel::Debug,
            "line_submitted",
            [
                json_kv("window", json!(window.as_str())),
                json_kv("command", json!(first.as_str())),
                json_kv("found", json!(found)),
            ],
        );
        Ok(())
    }

    /// Drain every due timer token. Cancellations performed while handling
    /// one token (the reveal cancelling spam) apply to the rest of the
    /// batch.
    pub fn advance(&mut self) {
        let now = self.clock.now();
        while let Some(token) = self.timers.pop_due(now) {
            self.dispatch_timer(token, now);
        }
    }

    /// Earliest pending deadline, for sizing the embedder's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn lockdown_state(&self) -> LockdownState {
        self.lockdown.state()
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let uptime = self.clock.now().duration_since(self.started_at);
        self.metrics
            .as_ref()
            .and_then(|metrics| metrics.lock().ok().map(|guard| guard.snapshot(uptime)))
    }

    fn dispatch_timer(&mut self, token: TimerToken, now: Instant) {
        match token {
            TimerToken::Lockdown(step) => {
                self.lockdown.on_step(
                    step,
                    now,
                    &mut *self.stage,
                    &mut *self.audio,
                    &mut self.timers,
                );
                self.log(
                    LogLevel::Debug,
                    "lockdown_step",
                    [json_kv("step", json!(format!("{step:?}")))],
                );
            }
            TimerToken::ErrorSpam => {
                self.lockdown.on_spam_tick(&mut *self.stage);
            }
            TimerToken::SystemHalt { window } => {
                self.audio.play(AudioCue::Beep);
                self.stage
                    .append_history(&window, HistoryEntry::Text("System Halt!".to_string()));
                self.stage.scroll_to_bottom(&window);
                self.stage.set_prompt_visible(&window, true);
            }
            TimerToken::RevealOverlay { surface } => {
                let depth = self.windows.next_depth();
                self.stage.raise_surface(surface, depth);
                self.stage.set_surface_visible(surface, true);
                self.windows.deactivate_all(&mut *self.stage);
            }
        }
    }

    fn with_metrics(&self, record: impl FnOnce(&mut SessionMetrics)) {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
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
