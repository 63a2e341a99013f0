//! Deferred work keyed by fire-at tick.
//!
//! Entries fire in `(tick, insertion order)` order. Cancelling is either
//! removing the entry by its [`TaskId`] or, for work that is hard to track
//! down, letting the task check liveness itself when it runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Handle to a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// A queue of tasks waiting for a tick.
#[derive(Debug)]
pub struct TaskQueue<T> {
    entries: BTreeMap<(u64, u64), T>,
    /// seq -> fire-at tick, for cancellation by id.
    index: HashMap<u64, u64>,
    next_seq: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` for tick `at`.
    pub fn schedule(&mut self, at: u64, task: T) -> TaskId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((at, seq), task);
        self.index.insert(seq, at);
        tracing::trace!(id = %TaskId(seq), at, "task scheduled");
        TaskId(seq)
    }

    /// Schedules `task` `delay` ticks after `now`. A zero delay still waits
    /// for the next tick: nothing runs re-entrantly inside the transition
    /// that scheduled it.
    pub fn schedule_in(&mut self, now: u64, delay: u64, task: T) -> TaskId {
        self.schedule(now.saturating_add(delay.max(1)), task)
    }

    /// Removes a pending task, returning it if it had not fired yet.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let at = self.index.remove(&id.0)?;
        self.entries.remove(&(at, id.0))
    }

    /// Removes every pending task matching `predicate`. Returns how many
    /// were removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let doomed: Vec<(u64, u64)> = self
            .entries
            .iter()
            .filter(|(_, task)| predicate(task))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.entries.remove(key);
            self.index.remove(&key.1);
        }
        doomed.len()
    }

    /// Takes every task due at or before `tick`, in firing order.
    pub fn drain_due(&mut self, tick: u64) -> Vec<T> {
        let later = self.entries.split_off(&(tick.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.entries, later);
        due.into_iter()
            .map(|((_, seq), task)| {
                self.index.remove(&seq);
                task
            })
            .collect()
    }

    /// Tick of the earliest pending task.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops everything still pending.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
