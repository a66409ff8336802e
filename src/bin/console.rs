//! Interactive demo: the full console scene in a raw-mode terminal.
//!
//! Type `help` to see the command set. Three denied `access` attempts
//! trigger the lockdown cinematic; any key press afterwards acts as the
//! gesture that unlocks the reveal video's sound. Esc or Ctrl+C exits.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use ingen_console::{
    ConsoleSession, DriverResult, FileConsentStore, FileSink, LockdownState, Logger, MediaSignal,
    MediaSurface, NullAudio, PaneSpec, PlaybackError, Rect, SessionConfig, SessionMetrics,
    SharedTermStage, Size, Stage, Surface, SystemClock, TermStage, TerminalGuard, UnlockConfig,
    UnlockController, WindowKind,
};

const MAIN_TERMINAL: &str = "main-terminal";
const CHESS_TERMINAL: &str = "chess-terminal";
const TICK: Duration = Duration::from_millis(200);

/// Simulated video element. Unmuted playback is refused until the first
/// key press, mirroring a browser's gesture requirement; the gate
/// indicator is drawn through the shared stage.
struct DemoMedia {
    stage: SharedTermStage,
    gesture_seen: Arc<Mutex<bool>>,
    muted: bool,
}

impl MediaSurface for DemoMedia {
    fn request_play(&mut self, muted: bool) -> Result<(), PlaybackError> {
        if muted {
            self.muted = true;
            return Ok(());
        }
        let allowed = self
            .gesture_seen
            .lock()
            .map(|seen| *seen)
            .unwrap_or(false);
        if allowed {
            self.muted = false;
            Ok(())
        } else {
            Err(PlaybackError::NotAllowed)
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_gate_visible(&mut self, visible: bool) {
        if let Ok(mut stage) = self.stage.lock() {
            stage.set_surface_visible(Surface::SoundGate, visible);
        }
    }
}

fn main() -> DriverResult<()> {
    let mut stdout = io::stdout();
    let (cols, rows) = terminal::size()?;
    let size = Size::new(cols.max(48), rows.max(16));

    let mut term = TermStage::new(size);
    term.add_pane(PaneSpec {
        id: MAIN_TERMINAL.to_string(),
        rect: Rect::new(1, 0, size.width.saturating_sub(18), size.height.saturating_sub(5)),
        console: true,
    });
    // The chess window has an input buffer and live echo, but no command
    // semantics (WindowKind::Passive on the session side).
    term.add_pane(PaneSpec {
        id: CHESS_TERMINAL.to_string(),
        rect: Rect::new(
            size.width / 3,
            size.height / 3,
            size.width / 2,
            size.height / 2,
        ),
        console: true,
    });
    let stage = term.into_shared();

    let logger = std::env::var("CONSOLE_LOG")
        .ok()
        .and_then(|path| FileSink::new(path, 1_000_000).ok())
        .map(Logger::new);
    let metrics = Arc::new(Mutex::new(SessionMetrics::new()));

    let config = SessionConfig {
        logger: logger.clone(),
        metrics: Some(metrics.clone()),
        ..SessionConfig::default()
    };
    let mut session = ConsoleSession::new(stage.clone(), NullAudio, SystemClock, config);
    session.register_window(MAIN_TERMINAL, WindowKind::Console)?;
    session.register_window(CHESS_TERMINAL, WindowKind::Passive)?;
    session.activate_window(MAIN_TERMINAL)?;

    let gesture_seen = Arc::new(Mutex::new(false));
    let media = DemoMedia {
        stage: stage.clone(),
        gesture_seen: gesture_seen.clone(),
        muted: true,
    };
    let consent = FileConsentStore::new(std::env::temp_dir().join("ingen-console-audio-consent"));
    let mut unlock = UnlockController::new(
        media,
        consent,
        SystemClock,
        UnlockConfig {
            logger,
            metrics: Some(metrics),
            ..UnlockConfig::default()
        },
    );

    let guard = TerminalGuard::enter(&mut stdout)?;
    let result = run(
        &mut stdout,
        &stage,
        &mut session,
        &mut unlock,
        &gesture_seen,
    );
    drop(guard);
    result
}

fn run(
    stdout: &mut impl Write,
    stage: &SharedTermStage,
    session: &mut ConsoleSession,
    unlock: &mut UnlockController,
    gesture_seen: &Arc<Mutex<bool>>,
) -> DriverResult<()> {
    let mut buffer = String::new();
    let mut active = MAIN_TERMINAL.to_string();
    let mut reveal_seen = false;

    loop {
        if let Ok(mut guard) = stage.lock() {
            guard.render(stdout)?;
        }

        if event::poll(poll_timeout(session, unlock))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Ok(mut seen) = gesture_seen.lock() {
                        *seen = true;
                    }
                    unlock.on_signal(MediaSignal::Gesture);

                    match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            break;
                        }
                        KeyCode::Tab => {
                            active = if active == MAIN_TERMINAL {
                                CHESS_TERMINAL.to_string()
                            } else {
                                MAIN_TERMINAL.to_string()
                            };
                            session.activate_window(&active)?;
                            buffer.clear();
                            session.input_preview(&active, "");
                        }
                        KeyCode::Enter => {
                            let line = std::mem::take(&mut buffer);
                            session.submit_line(&active, &line)?;
                        }
                        KeyCode::Backspace => {
                            buffer.pop();
                            session.input_preview(&active, &buffer);
                        }
                        // Arrow keys are swallowed, as the page suppresses
                        // default scrolling.
                        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {}
                        KeyCode::Char(ch)
                            if !key.modifiers.contains(KeyModifiers::CONTROL)
                                && !key.modifiers.contains(KeyModifiers::ALT) =>
                        {
                            buffer.push(ch);
                            session.input_preview(&active, &buffer);
                        }
                        _ => {}
                    }
                }
                Event::FocusGained => unlock.on_signal(MediaSignal::VisibilityRegained),
                _ => {}
            }
        }

        session.advance();
        if !reveal_seen && session.lockdown_state() >= LockdownState::Revealed {
            reveal_seen = true;
            unlock.ensure_playing();
        }
        unlock.advance();
    }

    Ok(())
}

fn poll_timeout(session: &ConsoleSession, unlock: &UnlockController) -> Duration {
    let now = Instant::now();
    [session.next_deadline(), unlock.next_deadline()]
        .into_iter()
        .flatten()
        .min()
        .map(|deadline| deadline.saturating_duration_since(now).min(TICK))
        .unwrap_or(TICK)
}
