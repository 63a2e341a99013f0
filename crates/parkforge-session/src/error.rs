//! Error types for the session layer.

use std::time::Duration;

use parkforge_course::PlayerId;

/// Errors that can occur while mutating live sessions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The player has no active session.
    #[error("player {0} is not on a course")]
    NotPlaying(PlayerId),

    /// The player is already playing this course.
    #[error("player {0} is already playing {1}")]
    AlreadyPlaying(PlayerId, String),

    /// The requested checkpoint is outside `0..=max`.
    #[error("invalid checkpoint {requested} (course has {max})")]
    InvalidCheckpoint { requested: usize, max: usize },

    /// A cooldown gate denied the action.
    #[error("cooldown active, {}s remaining", remaining.as_secs())]
    CooldownActive { remaining: Duration },
}
