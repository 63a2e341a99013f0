//! Error types for the course layer.

/// Errors that can occur while loading or validating courses.
#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    /// The course JSON could not be parsed.
    #[cfg(feature = "json")]
    #[error("course decode failed: {0}")]
    Decode(serde_json::Error),

    /// The course parsed but breaks a structural rule, e.g. checkpoints
    /// that are not numbered `1..=N`.
    #[error("invalid course: {0}")]
    InvalidCourse(String),

    /// Two courses share a name (names compare case-insensitively).
    #[error("course {0} is already registered")]
    Duplicate(String),
}
