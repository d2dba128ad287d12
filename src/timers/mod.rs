//! Pausable delayed execution
//!
//! Provides:
//! - One-shot delayed actions on a virtual millisecond clock
//! - Pause/resume that freezes every pending action with its remaining delay
//! - Unconditional cancellation on reset
//!
//! The host advances the clock (from real time, a frame loop, or a test);
//! nothing fires on its own. While paused the clock still moves but no
//! action fires and no remaining delay shrinks.

use std::fmt;

use tracing::debug;

/// Identifier of a scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A one-shot action waiting to fire
#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    /// Clock time the action fires at (meaningless while paused)
    fire_at: u64,
    /// Delay still owed, recorded on pause
    remaining: u64,
    payload: T,
}

/// Single indirection layer for every delayed follow-up action
pub struct Scheduler<T> {
    now: u64,
    next_id: u64,
    paused: bool,
    timers: Vec<Timer<T>>,
}

impl<T> fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("paused", &self.paused)
            .field("pending", &self.timers.len())
            .finish()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at time zero
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 0,
            paused: false,
            timers: Vec::new(),
        }
    }

    /// Current clock time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of actions waiting to fire
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Schedule `payload` to fire after `delay_ms` of unpaused time
    pub fn schedule(&mut self, delay_ms: u64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            fire_at: self.now + delay_ms,
            remaining: delay_ms,
            payload,
        });
        id
    }

    /// Remove a single pending action
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Drop every pending action, paused or not
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        if count > 0 {
            debug!("Cancelled {} scheduled actions", count);
        }
        count
    }

    /// Time left before an action fires, ignoring any future pause
    pub fn time_remaining(&self, id: TimerId) -> Option<u64> {
        self.timers.iter().find(|t| t.id == id).map(|t| {
            if self.paused {
                t.remaining
            } else {
                t.fire_at.saturating_sub(self.now)
            }
        })
    }

    /// Freeze every pending action. Returns false if already paused.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        let now = self.now;
        for timer in &mut self.timers {
            timer.remaining = timer.fire_at.saturating_sub(now);
        }
        self.paused = true;
        debug!("Scheduler paused with {} pending", self.timers.len());
        true
    }

    /// Reissue every frozen action with its remaining delay. Returns false
    /// if the scheduler was not paused.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        let now = self.now;
        for timer in &mut self.timers {
            timer.fire_at = now + timer.remaining;
        }
        self.paused = false;
        debug!("Scheduler resumed with {} pending", self.timers.len());
        true
    }

    /// Pop the earliest action due at or before `deadline`, moving the clock
    /// to its fire time. Ties fire in scheduling order. Returns `None` while
    /// paused.
    pub fn pop_due(&mut self, deadline: u64) -> Option<(TimerId, T)> {
        if self.paused {
            return None;
        }
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.fire_at <= deadline)
            .min_by_key(|(_, t)| (t.fire_at, t.id))
            .map(|(i, _)| i)?;
        let timer = self.timers.remove(index);
        self.now = self.now.max(timer.fire_at);
        Some((timer.id, timer.payload))
    }

    /// Move the clock forward to `deadline` without firing anything
    pub fn settle(&mut self, deadline: u64) {
        self.now = self.now.max(deadline);
    }

    /// Advance the clock by `ms` and return every action that came due,
    /// in firing order
    pub fn advance(&mut self, ms: u64) -> Vec<(TimerId, T)> {
        let deadline = self.now + ms;
        let mut fired = Vec::new();
        while let Some(entry) = self.pop_due(deadline) {
            fired.push(entry);
        }
        self.settle(deadline);
        fired
    }

    /// Clock time of the next action to fire, if any and not paused
    pub fn next_fire_at(&self) -> Option<u64> {
        if self.paused {
            return None;
        }
        self.timers.iter().map(|t| t.fire_at).min()
    }
}
