//! Headless engine for an in-fiction security console.
//!
//! The core is a command interpreter with a windowed faux desktop, a
//! one-shot timed lockdown cinematic, and an independent controller that
//! escalates a reveal video from muted to unmuted playback under autoplay
//! policy. Presentation, audio, and media surfaces are injected ports, so
//! the same engine runs under the bundled ANSI terminal stage, a GUI, or
//! the test fakes.

pub mod audio;
pub mod clock;
pub mod commands;
pub mod cursor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod session;
pub mod stage;
pub mod width;

pub use audio::{AudioCue, AudioPort, NullAudio};
pub use clock::{Clock, ManualClock, Scheduler, SystemClock, TimerHandle};
pub use commands::{
    ACCESS_KEYWORD, CommandContext, CommandFn, CommandRegistry, CommandSpec, escape_markup,
    install_builtin_commands, is_access_keyword, normalize_keyword,
};
pub use error::{ConsoleError, Result};
pub use geometry::{Rect, Size};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use media::{
    CONSENT_GRANTED, ConsentStore, FileConsentStore, MediaSignal, MediaSurface, MemoryConsent,
    PlaybackError, UnlockConfig, UnlockController, UnlockPhase,
};
pub use metrics::{MetricSnapshot, SessionMetrics};
pub use session::lockdown::{
    HOME_KEY_DEPTH, LockdownSequencer, LockdownState, LockdownStep, LockdownTimings, SPAM_LINE,
};
pub use session::windows::{WindowKind, WindowManager};
pub use session::{ConsoleSession, SessionConfig, SessionState, TimerToken};
pub use stage::{
    DriverError, DriverResult, HistoryEntry, NullStage, PaneSpec, SharedTermStage, Stage, Surface,
    TermStage, TerminalGuard, WindowId,
};
pub use width::display_width;
