use crate::error::{ConsoleError, Result};
use crate::stage::{Stage, WindowId};

/// Whether a window routes submitted lines into the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Full terminal: echo, resolve, execute.
    Console,
    /// Free-text surface (the chess panel): echo only.
    Passive,
}

#[derive(Debug, Clone)]
struct WindowRecord {
    id: WindowId,
    kind: WindowKind,
    depth: u32,
    focused: bool,
}

/// Tracks which window is active and owns the global stacking counter.
///
/// Activation is exclusive: activating one window clears focus from every
/// other window first. Both activation and drag-raise assign the next
/// value of a monotonic depth counter, so the most recently raised window
/// always has the strictly highest depth and no two windows ever share one.
#[derive(Debug, Default)]
pub struct WindowManager {
    windows: Vec<WindowRecord>,
    next_depth: u32,
    active: Option<WindowId>,
}

impl WindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<WindowId>, kind: WindowKind) -> Result<()> {
        let id = id.into();
        if self.find(&id).is_some() {
            return Err(ConsoleError::DuplicateWindow(id));
        }
        self.next_depth += 1;
        self.windows.push(WindowRecord {
            id,
            kind,
            depth: self.next_depth,
            focused: false,
        });
        Ok(())
    }

    /// Focus a window: clear everyone else's focus visuals, mark the
    /// target active, and raise it above all other windows.
    pub fn activate(&mut self, id: &str, stage: &mut dyn Stage) -> Result<()> {
        if self.find(id).is_none() {
            return Err(ConsoleError::UnknownWindow(id.to_string()));
        }

        for record in &mut self.windows {
            if record.focused && record.id != id {
                record.focused = false;
                stage.set_window_focused(&record.id, false);
            }
        }

        self.next_depth += 1;
        let depth = self.next_depth;
        if let Some(record) = self.windows.iter_mut().find(|record| record.id == id) {
            record.focused = true;
            record.depth = depth;
            stage.set_window_depth(&record.id, depth);
            stage.set_window_focused(&record.id, true);
            self.active = Some(record.id.clone());
        }
        Ok(())
    }

    /// Clear every window's focus state (outside click, lockdown).
    pub fn deactivate_all(&mut self, stage: &mut dyn Stage) {
        for record in &mut self.windows {
            if record.focused {
                record.focused = false;
                stage.set_window_focused(&record.id, false);
            }
        }
        self.active = None;
    }

    /// Raise a window without changing focus (title-bar drag start).
    pub fn raise(&mut self, id: &str, stage: &mut dyn Stage) -> Result<()> {
        self.next_depth += 1;
        let depth = self.next_depth;
        let record = self
            .windows
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| ConsoleError::UnknownWindow(id.to_string()))?;
        record.depth = depth;
        stage.set_window_depth(&record.id, depth);
        Ok(())
    }

    /// Claim the next stacking depth for a non-window surface raised above
    /// the desktop (e.g. a revealed image panel).
    pub fn next_depth(&mut self) -> u32 {
        self.next_depth += 1;
        self.next_depth
    }

    pub fn active(&self) -> Option<&WindowId> {
        self.active.as_ref()
    }

    pub fn kind_of(&self, id: &str) -> Option<WindowKind> {
        self.find(id).map(|record| record.kind)
    }

    pub fn depth_of(&self, id: &str) -> Option<u32> {
        self.find(id).map(|record| record.depth)
    }

    pub fn is_focused(&self, id: &str) -> bool {
        self.find(id).map(|record| record.focused).unwrap_or(false)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &WindowId> {
        self.windows.iter().map(|record| &record.id)
    }

    fn find(&self, id: &str) -> Option<&WindowRecord> {
        self.windows.iter().find(|record| record.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::NullStage;

    fn manager() -> (WindowManager, NullStage) {
        let mut windows = WindowManager::new();
        windows.register("main-terminal", WindowKind::Console).unwrap();
        windows.register("chess-terminal", WindowKind::Passive).unwrap();
        (windows, NullStage)
    }

    #[test]
    fn registration_assigns_unique_depths() {
        let (windows, _) = manager();
        let a = windows.depth_of("main-terminal").unwrap();
        let b = windows.depth_of("chess-terminal").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (mut windows, _) = manager();
        let err = windows
            .register("main-terminal", WindowKind::Console)
            .unwrap_err();
        assert!(matches!(err, ConsoleError::DuplicateWindow(_)));
    }

    #[test]
    fn activation_is_exclusive_and_raises() {
        let (mut windows, mut stage) = manager();
        windows.activate("main-terminal", &mut stage).unwrap();
        windows.activate("chess-terminal", &mut stage).unwrap();

        assert!(!windows.is_focused("main-terminal"));
        assert!(windows.is_focused("chess-terminal"));
        assert_eq!(windows.active().map(String::as_str), Some("chess-terminal"));

        let raised = windows.depth_of("chess-terminal").unwrap();
        let other = windows.depth_of("main-terminal").unwrap();
        assert!(raised > other);
    }

    #[test]
    fn drag_raise_keeps_focus_unchanged() {
        let (mut windows, mut stage) = manager();
        windows.activate("main-terminal", &mut stage).unwrap();
        windows.raise("chess-terminal", &mut stage).unwrap();

        assert!(windows.is_focused("main-terminal"));
        assert!(!windows.is_focused("chess-terminal"));
        let dragged = windows.depth_of("chess-terminal").unwrap();
        let focused = windows.depth_of("main-terminal").unwrap();
        assert!(dragged > focused);
    }

    #[test]
    fn deactivate_all_clears_focus() {
        let (mut windows, mut stage) = manager();
        windows.activate("main-terminal", &mut stage).unwrap();
        windows.deactivate_all(&mut stage);
        assert!(windows.active().is_none());
        assert!(!windows.is_focused("main-terminal"));
    }

    #[test]
    fn unknown_windows_error() {
        let (mut windows, mut stage) = manager();
        assert!(matches!(
            windows.activate("curr-chess-input", &mut stage),
            Err(ConsoleError::UnknownWindow(_))
        ));
        assert!(matches!(
            windows.raise("curr-chess-input", &mut stage),
            Err(ConsoleError::UnknownWindow(_))
        ));
    }
}
