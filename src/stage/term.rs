//! Reference terminal implementation of the presentation port.
//!
//! Window panes are painted into a character grid in stacking order
//! (painter's algorithm), so the most recently raised window wins any
//! overlap. Frames are content-hashed and a repaint with an unchanged hash
//! is skipped entirely.
//!
//! This stage is intentionally symbolic about the cinematic: images and
//! video render as labelled boxes, and the environment slide snaps at its
//! start (the configured duration only drives the timed sequencing, which
//! lives in the engine, not here).

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cursor;
use crate::error::Result;
use crate::geometry::{Rect, Size};
use crate::width::{display_width, sanitize_text, truncate_display};

use super::{HistoryEntry, Stage, Surface, WindowId};

/// Lines of history retained per pane. The lockdown spam loop appends
/// forever; the pane only ever renders its tail.
const HISTORY_CAP: usize = 500;

const TABLE_LABEL_WIDTH: usize = 18;

/// Placement and flavour of one window pane.
#[derive(Debug, Clone)]
pub struct PaneSpec {
    pub id: WindowId,
    pub rect: Rect,
    /// Console panes render a prompt line; passive panes do not.
    pub console: bool,
}

#[derive(Debug)]
struct Pane {
    spec: PaneSpec,
    lines: Vec<String>,
    preview: String,
    prompt_visible: bool,
    focused: bool,
    depth: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct SurfaceState {
    visible: bool,
    depth: u32,
}

/// Handle shape used when the embedder needs to keep rendering after the
/// session takes ownership of the stage.
pub type SharedTermStage = Arc<Mutex<TermStage>>;

pub struct TermStage {
    size: Size,
    panes: Vec<Pane>,
    surfaces: HashMap<Surface, SurfaceState>,
    inputs_enabled: bool,
    backdrop_swapped: bool,
    reveal_started: bool,
    last_frame: Option<blake3::Hash>,
}

impl TermStage {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            panes: Vec::new(),
            surfaces: HashMap::new(),
            inputs_enabled: true,
            backdrop_swapped: false,
            reveal_started: false,
            last_frame: None,
        }
    }

    pub fn add_pane(&mut self, spec: PaneSpec) {
        let depth = self.panes.len() as u32 + 1;
        self.panes.push(Pane {
            spec,
            lines: Vec::new(),
            preview: String::new(),
            prompt_visible: true,
            focused: false,
            depth,
        });
    }

    pub fn into_shared(self) -> SharedTermStage {
        Arc::new(Mutex::new(self))
    }

    /// Paint the current scene. Skips the write when nothing changed since
    /// the previous frame.
    pub fn render(&mut self, out: &mut impl Write) -> Result<()> {
        let frame = self.compose();
        let hash = blake3::hash(frame.as_bytes());
        if self.last_frame == Some(hash) {
            return Ok(());
        }
        self.last_frame = Some(hash);

        for (row, line) in frame.lines().enumerate() {
            write!(out, "{}", cursor::move_to(row as u16 + 1, 1))?;
            write!(out, "{line}{}", cursor::clear_to_line_end())?;
        }
        out.flush()?;
        Ok(())
    }

    fn compose(&self) -> String {
        let width = self.size.width as usize;
        let height = self.size.height as usize;
        let fill = if self.backdrop_swapped { '·' } else { ' ' };
        let mut grid = vec![vec![fill; width]; height];

        let desktop_visible = self
            .surfaces
            .get(&Surface::Desktop)
            .map(|state| state.visible)
            .unwrap_or(true);
        if desktop_visible {
            let mut order: Vec<usize> = (0..self.panes.len()).collect();
            order.sort_by_key(|&idx| self.panes[idx].depth);
            for idx in order {
                self.paint_pane(&mut grid, &self.panes[idx]);
            }
        }

        let mut overlays: Vec<(&Surface, &SurfaceState)> = self
            .surfaces
            .iter()
            .filter(|(surface, state)| state.visible && Self::overlay_label(surface).is_some())
            .collect();
        overlays.sort_by_key(|(_, state)| state.depth);
        for (offset, (surface, _)) in overlays.iter().enumerate() {
            if let Some(label) = Self::overlay_label(surface) {
                self.paint_overlay(&mut grid, label, offset);
            }
        }

        let mut frame = String::with_capacity((width + 1) * height);
        for row in grid {
            frame.extend(row);
            frame.push('\n');
        }
        frame
    }

    fn paint_pane(&self, grid: &mut [Vec<char>], pane: &Pane) {
        let rect = pane.spec.rect;
        if rect.width < 4 || rect.height < 2 {
            return;
        }

        let marker = if pane.focused { '▣' } else { '□' };
        let title = truncate_display(
            &format!("{marker} {}", pane.spec.id),
            rect.width as usize,
        );
        self.put_line(grid, rect.x, rect.y, rect.width, &title, '─');

        // Content rows show the history tail; console panes keep the last
        // row for the prompt.
        let prompt_rows = usize::from(pane.spec.console);
        let content_rows = (rect.height.saturating_sub(1) as usize).saturating_sub(prompt_rows);
        let tail_start = pane.lines.len().saturating_sub(content_rows);
        for (row, line) in pane.lines[tail_start..].iter().enumerate() {
            self.put_line(
                grid,
                rect.x,
                rect.y + 1 + row as u16,
                rect.width,
                line,
                ' ',
            );
        }

        if pane.spec.console {
            let prompt = if pane.prompt_visible && self.inputs_enabled {
                let caret = if pane.focused { '█' } else { ' ' };
                format!("> {}{caret}", pane.preview)
            } else {
                String::new()
            };
            self.put_line(
                grid,
                rect.x,
                rect.y + rect.height.saturating_sub(1),
                rect.width,
                &prompt,
                ' ',
            );
        }
    }

    fn paint_overlay(&self, grid: &mut [Vec<char>], label: &str, offset: usize) {
        let width = self.size.width as usize;
        let height = self.size.height as usize;
        let text = truncate_display(label, width);
        let text_width = display_width(&text);
        let col = width.saturating_sub(text_width) / 2;
        let row = (height / 2 + offset).min(height.saturating_sub(1));
        for (idx, ch) in text.chars().enumerate() {
            if let Some(cell) = grid.get_mut(row).and_then(|cells| cells.get_mut(col + idx)) {
                *cell = ch;
            }
        }
    }

    fn put_line(&self, grid: &mut [Vec<char>], x: u16, y: u16, width: u16, text: &str, pad: char) {
        let Some(cells) = grid.get_mut(y as usize) else {
            return;
        };
        let text = truncate_display(text, width as usize);
        let mut chars = text.chars();
        for col in 0..width as usize {
            let Some(cell) = cells.get_mut(x as usize + col) else {
                break;
            };
            *cell = chars.next().unwrap_or(pad);
        }
    }

    fn overlay_label(surface: &Surface) -> Option<&'static str> {
        match surface {
            Surface::ZebraGirl => Some("[ zebraGirl.jpg ]"),
            Surface::RevealWindow => Some("[ ♛ the king ]"),
            Surface::HomeKey => Some("[ home ]"),
            Surface::SoundGate => Some("SOUND LOCKED · TAP TO ENABLE"),
            Surface::Environment | Surface::Desktop => None,
        }
    }

    fn pane_mut(&mut self, window: &WindowId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| &pane.spec.id == window)
    }

    fn surface_mut(&mut self, surface: Surface) -> &mut SurfaceState {
        self.surfaces.entry(surface).or_default()
    }
}

impl Stage for TermStage {
    fn append_history(&mut self, window: &WindowId, entry: HistoryEntry) {
        let lines = entry_lines(&entry);
        if let Some(pane) = self.pane_mut(window) {
            pane.lines.extend(lines);
            if pane.lines.len() > HISTORY_CAP {
                let excess = pane.lines.len() - HISTORY_CAP;
                pane.lines.drain(..excess);
            }
        }
    }

    fn scroll_to_bottom(&mut self, _window: &WindowId) {
        // Panes always render their history tail.
    }

    fn set_input_preview(&mut self, window: &WindowId, text: &str) {
        let text = sanitize_text(text);
        if let Some(pane) = self.pane_mut(window) {
            pane.preview = text;
        }
    }

    fn set_prompt_visible(&mut self, window: &WindowId, visible: bool) {
        if let Some(pane) = self.pane_mut(window) {
            pane.prompt_visible = visible;
        }
    }

    fn set_inputs_enabled(&mut self, enabled: bool) {
        self.inputs_enabled = enabled;
    }

    fn set_window_focused(&mut self, window: &WindowId, focused: bool) {
        if let Some(pane) = self.pane_mut(window) {
            pane.focused = focused;
        }
    }

    fn set_window_depth(&mut self, window: &WindowId, depth: u32) {
        if let Some(pane) = self.pane_mut(window) {
            pane.depth = depth;
        }
    }

    fn begin_environment_slide(&mut self, _duration: Duration) {
        // The reference stage snaps; timed progression is the engine's job.
        self.surface_mut(Surface::Environment).visible = false;
    }

    fn set_surface_visible(&mut self, surface: Surface, visible: bool) {
        self.surface_mut(surface).visible = visible;
    }

    fn raise_surface(&mut self, surface: Surface, depth: u32) {
        let state = self.surface_mut(surface);
        state.visible = true;
        state.depth = depth;
    }

    fn swap_backdrop(&mut self) {
        self.backdrop_swapped = true;
    }

    fn start_reveal_video(&mut self) {
        self.reveal_started = true;
    }
}

fn entry_lines(entry: &HistoryEntry) -> Vec<String> {
    match entry {
        HistoryEntry::Entered(text) => vec![format!("> {}", sanitize_text(text))],
        HistoryEntry::Text(text) => sanitize_text(text).lines().map(str::to_string).collect(),
        HistoryEntry::Image { name } => vec![format!("[ image: {name} ]")],
        HistoryEntry::Table { title, rows } => {
            let mut lines = Vec::with_capacity(rows.len() + 1);
            lines.push(title.clone());
            for (label, status) in rows {
                let pad = TABLE_LABEL_WIDTH.saturating_sub(display_width(label));
                lines.push(format!("{label}{}{status}", " ".repeat(pad.max(1))));
            }
            lines
        }
    }
}
