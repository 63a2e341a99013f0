//! Error types for the engine layer.

use std::fmt;

use parkforge_session::SessionError;

/// A course limit that ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// The course allows this many deaths.
    Deaths(u32),
    /// The course must be finished within this many seconds.
    Time(u64),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deaths(max) => write!(f, "max deaths ({max})"),
            Self::Time(secs) => write!(f, "max time ({secs}s)"),
        }
    }
}

/// Errors returned by engine transitions.
///
/// Every one of these has already been reported to the player as a
/// [`Notice`](crate::Notice) by the time the caller sees it, and the
/// player's session is as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// No course with this name is registered.
    #[error("course {0} not found")]
    CourseNotFound(String),

    /// An eligibility check (level, occupancy, host permission) refused
    /// the join.
    #[error("join denied: {0}")]
    JoinDenied(String),

    /// The action isn't available on this course or in this mode.
    #[error("action denied: {0}")]
    ActionDenied(String),

    /// A course limit was breached; the player has been removed.
    #[error("limit exceeded: {0}")]
    LimitExceeded(Limit),

    #[error(transparent)]
    Session(#[from] SessionError),
}
