use std::io::{self, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::error::ConsoleError;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("engine error: {0}")]
    Engine(#[from] ConsoleError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Raw-mode scope guard for a full-screen console run.
///
/// Construction enables raw mode and switches to the alternate screen;
/// dropping the guard restores the terminal even when the event loop bails
/// with an error.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter(stdout: &mut impl Write) -> DriverResult<Self> {
        terminal::enable_raw_mode().map_err(|err| DriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
