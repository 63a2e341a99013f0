//! What a successful transition did.

use std::time::Duration;

/// Whether a join or leave is shown to the player and others.
///
/// Decided once by the caller; restarts and reconnects use `Silent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    #[default]
    Announced,
    Silent,
}

impl JoinPolicy {
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Progress was saved and will resume on the next join.
    Saved,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Advanced(usize),
    /// The final checkpoint; the finish is still ahead.
    AllCheckpoints,
    /// The final checkpoint, finishing the course right away.
    Finished,
    /// A repeated or out-of-order trigger.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathOutcome {
    Respawned { deaths: u32 },
    /// The death limit was already reached; the player was removed.
    Ejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Finished { elapsed: Duration, deaths: u32 },
    /// Not every checkpoint was reached; treated as a death.
    Incomplete,
    /// No session to finish.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartKind {
    /// Leave, delete saved progress, join again.
    Full,
    /// Reset progress in place.
    Soft,
}
