use thiserror::Error;

/// Unified result type for the console engine.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Infrastructure failures surfaced by the engine.
///
/// User-facing command failures (unknown command, bad arguments) are not
/// errors at this level; they render into the window history and the
/// session keeps running.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("window `{0}` is not registered")]
    UnknownWindow(String),
    #[error("window `{0}` is already registered")]
    DuplicateWindow(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
