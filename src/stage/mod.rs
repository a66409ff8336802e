//! Presentation port.
//!
//! The engine writes to the scene exclusively through the [`Stage`] trait.
//! Every hook has a no-op default body, so an implementation only wires the
//! surfaces its scene actually has and a missing element silently skips the
//! individual step instead of aborting a command or the lockdown cinematic.

mod driver;
mod term;

pub use self::driver::{DriverError, DriverResult, TerminalGuard};
pub use self::term::{PaneSpec, SharedTermStage, TermStage};

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Identifier for a terminal window surface.
pub type WindowId = String;

/// One rendered item in a window's history pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    /// Echo of a submitted line, rendered as `> line`.
    Entered(String),
    /// Plain text; may span multiple lines.
    Text(String),
    /// Inline image placeholder, referenced by asset name.
    Image { name: String },
    /// Fixed status table with a caption row.
    Table {
        title: String,
        rows: Vec<(String, String)>,
    },
}

/// Named scene surfaces outside the terminal windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// The sliding environment panel dismissed during lockdown.
    Environment,
    /// The faux desktop hidden at the reveal.
    Desktop,
    /// The window revealed at the end of the lockdown cinematic.
    RevealWindow,
    /// Decorative image panel raised by `display zebraGirl.jpg`.
    ZebraGirl,
    /// Overlay raised ten seconds after the reveal.
    HomeKey,
    /// "Sound locked" indicator owned by the media surface.
    SoundGate,
}

pub trait Stage {
    /// Append an entry to a window's history pane.
    fn append_history(&mut self, _window: &WindowId, _entry: HistoryEntry) {}

    /// Keep a window's history scrolled to the latest entry.
    fn scroll_to_bottom(&mut self, _window: &WindowId) {}

    /// Mirror the in-progress input buffer (live character echo).
    fn set_input_preview(&mut self, _window: &WindowId, _text: &str) {}

    /// Show or hide a window's prompt indicator.
    fn set_prompt_visible(&mut self, _window: &WindowId, _visible: bool) {}

    /// Enable or disable every input buffer at once.
    fn set_inputs_enabled(&mut self, _enabled: bool) {}

    /// Apply or clear a window's focus visuals.
    fn set_window_focused(&mut self, _window: &WindowId, _focused: bool) {}

    /// Place a window at the given stacking depth.
    fn set_window_depth(&mut self, _window: &WindowId, _depth: u32) {}

    /// Start the environment slide-off transition.
    fn begin_environment_slide(&mut self, _duration: Duration) {}

    /// Show or hide a named surface.
    fn set_surface_visible(&mut self, _surface: Surface, _visible: bool) {}

    /// Raise a named surface to the given stacking depth.
    fn raise_surface(&mut self, _surface: Surface, _depth: u32) {}

    /// Swap the backdrop image behind the reveal window.
    fn swap_backdrop(&mut self) {}

    /// Kick the reveal video from the presentation side.
    fn start_reveal_video(&mut self) {}
}

/// No-op stage for headless runs and benches.
#[derive(Debug, Default)]
pub struct NullStage;

impl Stage for NullStage {}

/// Shared stages let the embedding layer keep a handle for rendering or
/// inspection while the session owns the port.
impl<S: Stage> Stage for Arc<Mutex<S>> {
    fn append_history(&mut self, window: &WindowId, entry: HistoryEntry) {
        if let Ok(mut guard) = self.lock() {
            guard.append_history(window, entry);
        }
    }

    fn scroll_to_bottom(&mut self, window: &WindowId) {
        if let Ok(mut guard) = self.lock() {
            guard.scroll_to_bottom(window);
        }
    }

    fn set_input_preview(&mut self, window: &WindowId, text: &str) {
        if let Ok(mut guard) = self.lock() {
            guard.set_input_preview(window, text);
        }
    }

    fn set_prompt_visible(&mut self, window: &WindowId, visible: bool) {
        if let Ok(mut guard) = self.lock() {
            guard.set_prompt_visible(window, visible);
        }
    }

    fn set_inputs_enabled(&mut self, enabled: bool) {
        if let Ok(mut guard) = self.lock() {
            guard.set_inputs_enabled(enabled);
        }
    }

    fn set_window_focused(&mut self, window: &WindowId, focused: bool) {
        if let Ok(mut guard) = self.lock() {
            guard.set_window_focused(window, focused);
        }
    }

    fn set_window_depth(&mut self, window: &WindowId, depth: u32) {
        if let Ok(mut guard) = self.lock() {
            guard.set_window_depth(window, depth);
        }
    }

    fn begin_environment_slide(&mut self, duration: Duration) {
        if let Ok(mut guard) = self.lock() {
            guard.begin_environment_slide(duration);
        }
    }

    fn set_surface_visible(&mut self, surface: Surface, visible: bool) {
        if let Ok(mut guard) = self.lock() {
            guard.set_surface_visible(surface, visible);
        }
    }

    fn raise_surface(&mut self, surface: Surface, depth: u32) {
        if let Ok(mut guard) = self.lock() {
            guard.raise_surface(surface, depth);
        }
    }

    fn swap_backdrop(&mut self) {
        if let Ok(mut guard) = self.lock() {
            guard.swap_backdrop();
        }
    }

    fn start_reveal_video(&mut self) {
        if let Ok(mut guard) = self.lock() {
            guard.start_reveal_video();
        }
    }
}
