//! Minimum-interval gates ("has enough time passed since the last action").
//!
//! One [`CooldownTracker`] is one cooldown domain: the engine keeps a
//! tracker keyed by `PlayerId` for rate-limited tools and another keyed by
//! `(PlayerId, course)` for prize re-delivery.
//!
//! # Exactness
//!
//! A denied attempt never touches the stored timestamp. Only an allowed
//! action refreshes it, so hammering a tool during its cooldown can't
//! push the window further out.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Whether the subject skips the gate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bypass {
    #[default]
    None,
    /// Privileged subjects are always allowed and leave no timestamp.
    Privileged,
}

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Allowed,
    Denied { remaining: Duration },
}

impl Cooldown {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Tracks the last permitted action per subject within one domain.
#[derive(Debug)]
pub struct CooldownTracker<K> {
    domain: &'static str,
    last_action: HashMap<K, Instant>,
}

impl<K> CooldownTracker<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Creates an empty tracker. `domain` only labels log lines.
    pub fn new(domain: &'static str) -> Self {
        Self {
            domain,
            last_action: HashMap::new(),
        }
    }

    /// Checks the gate at `now`.
    ///
    /// The first check for a subject always passes and records `now`.
    /// Later checks pass once `window` has fully elapsed since the last
    /// permitted action, refreshing the timestamp; otherwise they report the
    /// remaining wait and leave the timestamp as it was.
    pub fn check(&mut self, subject: &K, window: Duration, bypass: Bypass, now: Instant) -> Cooldown {
        if bypass == Bypass::Privileged {
            return Cooldown::Allowed;
        }

        if let Some(last) = self.last_action.get(subject) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < window {
                let remaining = window - elapsed;
                tracing::debug!(
                    domain = self.domain,
                    ?subject,
                    remaining_ms = remaining.as_millis() as u64,
                    "cooldown denied"
                );
                return Cooldown::Denied { remaining };
            }
        }

        self.last_action.insert(subject.clone(), now);
        Cooldown::Allowed
    }

    /// [`check`](Self::check) against the current instant, as a bool.
    pub fn allow(&mut self, subject: &K, window: Duration, bypass: Bypass) -> bool {
        self.check(subject, window, bypass, Instant::now()).is_allowed()
    }

    /// Remaining wait without recording anything.
    pub fn remaining(&self, subject: &K, window: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_action.get(subject)?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < window).then(|| window - elapsed)
    }

    pub fn contains(&self, subject: &K) -> bool {
        self.last_action.contains_key(subject)
    }

    /// Stores a permitted action that happened at `at`, e.g. one loaded
    /// from persisted state.
    pub fn record(&mut self, subject: K, at: Instant) {
        self.last_action.insert(subject, at);
    }

    /// Forgets a subject, e.g. when the player disconnects.
    pub fn clear(&mut self, subject: &K) -> bool {
        self.last_action.remove(subject).is_some()
    }

    /// Drops every subject matching `predicate`.
    pub fn clear_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        self.last_action.retain(|subject, _| !predicate(subject));
    }

    pub fn len(&self) -> usize {
        self.last_action.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_action.is_empty()
    }
}
