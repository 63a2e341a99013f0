//! Unified error type for Parkforge.

use parkforge_course::CourseError;
use parkforge_engine::EngineError;
use parkforge_session::SessionError;

/// Top-level error wrapping every crate-specific error.
///
/// The `#[from]` impls let `?` lift sub-crate errors, so code built on the
/// facade deals with one error type.
#[derive(Debug, thiserror::Error)]
pub enum ParkforgeError {
    /// Course loading or validation failed.
    #[error(transparent)]
    Course(#[from] CourseError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A transition was rejected.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine config could not be parsed.
    #[cfg(feature = "json")]
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),

    /// The runtime task has stopped; no more commands are accepted.
    #[error("course runtime is not running")]
    RuntimeClosed,
}
