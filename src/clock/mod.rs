//! Monotonic clock abstraction and a cancellable timer queue.
//!
//! All timed choreography in the crate (lockdown steps, error spam, system
//! halt, media recovery polling) is expressed as scheduled tokens drained by
//! the owning component's event loop. Nothing sleeps; tests drive a
//! [`ManualClock`] forward and observe the same ordering the wall clock
//! would produce.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-advanced clock for deterministic tests. Clones share the same
/// underlying instant, so a test can keep one handle while the component
/// under test owns another.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Opaque handle for cancelling a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct TimerEntry<T> {
    handle: TimerHandle,
    deadline: Instant,
    period: Option<Duration>,
    seq: u64,
    token: T,
}

/// Ordered timer queue. Entries fire in `(deadline, insertion order)`
/// order; repeating entries re-queue themselves one period at a time so a
/// large clock jump replays every missed tick, and cancellation between
/// pops takes effect immediately.
pub struct Scheduler<T> {
    entries: Vec<TimerEntry<T>>,
    next_handle: u64,
    next_seq: u64,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
            next_seq: 0,
        }
    }

    /// Schedule a one-shot token.
    pub fn schedule(&mut self, deadline: Instant, token: T) -> TimerHandle {
        self.push(deadline, None, token)
    }

    /// Schedule a repeating token. A zero period is clamped to one
    /// millisecond so the queue always makes progress.
    pub fn schedule_repeating(
        &mut self,
        first: Instant,
        every: Duration,
        token: T,
    ) -> TimerHandle {
        let every = every.max(Duration::from_millis(1));
        self.push(first, Some(every), token)
    }

    fn push(&mut self, deadline: Instant, period: Option<Duration>, token: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TimerEntry {
            handle,
            deadline,
            period,
            seq,
            token,
        });
        handle
    }

    /// Remove an entry. Returns false when the handle already fired or was
    /// cancelled, making repeated cancellation harmless.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    /// Earliest pending deadline, for sizing poll timeouts.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    /// Pop the next due token, if any. Callers loop over this so that work
    /// performed while handling one token (including cancellations) is
    /// visible to the rest of the batch.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= now)
            .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
            .map(|(idx, _)| idx)?;

        match self.entries[idx].period {
            Some(period) => {
                let entry = &mut self.entries[idx];
                entry.deadline += period;
                entry.seq = self.next_seq;
                self.next_seq += 1;
                Some(entry.token.clone())
            }
            None => Some(self.entries.swap_remove(idx).token),
        }
    }

    /// Drain every token due at `now` in firing order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(token) = self.pop_due(now) {
            due.push(token);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_tokens_fire_in_deadline_order() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut timers = Scheduler::new();
        timers.schedule(start + Duration::from_millis(200), "b");
        timers.schedule(start + Duration::from_millis(100), "a");
        timers.schedule(start + Duration::from_millis(200), "c");

        clock.advance(Duration::from_millis(250));
        assert_eq!(timers.drain_due(clock.now()), vec!["a", "b", "c"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn tokens_wait_for_their_deadline() {
        let clock = ManualClock::new();
        let mut timers = Scheduler::new();
        timers.schedule(clock.now() + Duration::from_millis(100), "late");

        clock.advance(Duration::from_millis(50));
        assert!(timers.pop_due(clock.now()).is_none());
        clock.advance(Duration::from_millis(50));
        assert_eq!(timers.pop_due(clock.now()), Some("late"));
    }

    #[test]
    fn repeating_entries_replay_missed_ticks() {
        let clock = ManualClock::new();
        let mut timers = Scheduler::new();
        timers.schedule_repeating(
            clock.now() + Duration::from_millis(50),
            Duration::from_millis(50),
            "tick",
        );

        clock.advance(Duration::from_millis(220));
        assert_eq!(timers.drain_due(clock.now()).len(), 4);
        // The entry is still queued for the next period.
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let clock = ManualClock::new();
        let mut timers = Scheduler::new();
        let handle = timers.schedule(clock.now() + Duration::from_millis(10), "x");
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        clock.advance(Duration::from_millis(20));
        assert!(timers.pop_due(clock.now()).is_none());
    }

    #[test]
    fn cancelling_a_repeating_entry_stops_the_stream() {
        let clock = ManualClock::new();
        let mut timers = Scheduler::new();
        let handle = timers.schedule_repeating(
            clock.now() + Duration::from_millis(10),
            Duration::from_millis(10),
            "tick",
        );

        clock.advance(Duration::from_millis(10));
        assert_eq!(timers.pop_due(clock.now()), Some("tick"));
        timers.cancel(handle);
        clock.advance(Duration::from_millis(100));
        assert!(timers.pop_due(clock.now()).is_none());
    }

    #[test]
    fn next_deadline_reports_the_earliest_entry() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut timers = Scheduler::new();
        assert!(timers.next_deadline().is_none());
        timers.schedule(start + Duration::from_millis(300), "far");
        timers.schedule(start + Duration::from_millis(100), "near");
        assert_eq!(timers.next_deadline(), Some(start + Duration::from_millis(100)));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let before = other.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(other.now(), before + Duration::from_secs(5));
    }
}
