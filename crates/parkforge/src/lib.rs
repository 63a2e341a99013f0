//! # Parkforge
//!
//! Parkour course progression for game servers.
//!
//! Parkforge tracks players through checkpointed courses: joining, dying,
//! respawning, finishing, timing and rewarding. The host game supplies the
//! world (teleports, inventories, chat) by implementing
//! [`Host`](parkforge_engine::Host); Parkforge decides what happens.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parkforge::prelude::*;
//!
//! # async fn run() -> Result<(), ParkforgeError> {
//! let courses = CourseCatalog::from_json(r#"[{
//!     "name": "tower",
//!     "start": { "world": "world", "x": 0.0, "y": 64.0, "z": 0.0 },
//!     "checkpoints": []
//! }]"#)?;
//! let engine = ProgressionEngine::new(
//!     EngineConfig::default(),
//!     courses,
//!     MemoryProfileStore::new(),
//!     MemoryLeaderboard::new(),
//!     RecordingHost::new(),
//! );
//! let (runtime, _task) = CourseRuntime::spawn(engine, TickConfig::default());
//!
//! runtime.join(PlayerId(1), "tower").await?;
//! runtime.finish(PlayerId(1)).await?;
//! runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod runtime;

pub use error::ParkforgeError;
pub use runtime::{CourseRuntime, DEFAULT_CHANNEL_SIZE, RuntimeHandle};

pub use parkforge_course as course;
pub use parkforge_engine as engine;
pub use parkforge_session as session;
pub use parkforge_tick as tick;

pub mod prelude {
    pub use crate::{CourseRuntime, ParkforgeError, RuntimeHandle};
    pub use parkforge_course::{Course, CourseCatalog, CourseRegistry, Location, ParkourMode, PlayerId};
    pub use parkforge_engine::{
        CheckpointOutcome, CourseEvent, DeathOutcome, EngineConfig, FinishOutcome, Host,
        JoinPolicy, Leaderboard, LeaveOutcome, MemoryLeaderboard, Notice, ParkourTool,
        ProgressionEngine, RecordingHost, RestartKind,
    };
    pub use parkforge_session::{JoinKind, MemoryProfileStore, ProfileStore, SessionView};
    pub use parkforge_tick::TickConfig;
}
