use std::time::{Duration, Instant};

use crate::audio::AudioPort;
use crate::clock::Scheduler;
use crate::logging::Logger;
use crate::session::lockdown::LockdownSequencer;
use crate::session::windows::WindowManager;
use crate::session::{SessionState, TimerToken};
use crate::stage::{HistoryEntry, Stage, WindowId};

/// Canonical name of the command with the tolerant alias.
pub const ACCESS_KEYWORD: &str = "access";

/// Normalize a raw keyword: trim, lowercase, and fold the tolerated
/// `aaccess` misspelling onto `access`.
pub fn normalize_keyword(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if is_access_keyword(&lower) {
        ACCESS_KEYWORD.to_string()
    } else {
        lower
    }
}

/// The in-fiction typo acceptance: `access` with exactly one optional
/// leading `a`, case-insensitively. Not a general fuzzy match.
pub fn is_access_keyword(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.eq_ignore_ascii_case("access") || trimmed.eq_ignore_ascii_case("aaccess")
}

/// Escape markup-significant characters before interpolating user text
/// into rendered output.
pub fn escape_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Handler signature. The full submitted line is passed through so each
/// command does its own argument splitting.
pub type CommandFn = fn(&mut CommandContext<'_>, &str);

/// Immutable command definition. Identity is the normalized name.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub summary: String,
    pub man_page: String,
    pub run: CommandFn,
}

impl CommandSpec {
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        man_page: impl Into<String>,
        run: CommandFn,
    ) -> Self {
        Self {
            name: normalize_keyword(&name.into()),
            summary: summary.into(),
            man_page: man_page.into(),
            run,
        }
    }
}

/// Registration-ordered command table. Duplicate registration is a silent
/// no-op (first registration wins), keeping setup idempotent and the
/// `help` listing deterministic.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: CommandSpec) {
        if spec.name.is_empty() || self.get(&spec.name).is_some() {
            return;
        }
        self.entries.push(spec);
    }

    /// Resolve a raw typed token to a command, applying the alias rule.
    pub fn resolve(&self, raw: &str) -> Option<&CommandSpec> {
        let name = normalize_keyword(raw);
        self.get(&name)
    }

    /// Look up an already-normalized name.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.iter().find(|spec| spec.name == name)
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a command handler may touch, borrowed from the session for
/// the duration of one execution. Each field has a single owner on the
/// session side; the context only reborrows.
pub struct CommandContext<'a> {
    /// Originating console window; output is routed here.
    pub window: &'a WindowId,
    pub stage: &'a mut dyn Stage,
    pub audio: &'a mut dyn AudioPort,
    pub state: &'a mut SessionState,
    pub windows: &'a mut WindowManager,
    pub timers: &'a mut Scheduler<TimerToken>,
    pub registry: &'a CommandRegistry,
    pub lockdown: &'a mut LockdownSequencer,
    pub now: Instant,
    pub lockdown_threshold: u32,
    pub system_halt_delay: Duration,
    pub overlay_reveal_delay: Duration,
    pub logger: Option<&'a Logger>,
}

impl CommandContext<'_> {
    /// Append a plain text line to the originating window's history.
    pub fn out_text(&mut self, line: impl Into<String>) {
        self.stage
            .append_history(self.window, HistoryEntry::Text(line.into()));
    }

    /// Append an arbitrary history entry.
    pub fn out_entry(&mut self, entry: HistoryEntry) {
        self.stage.append_history(self.window, entry);
    }
}
