//! Course progression for Parkforge.
//!
//! The [`ProgressionEngine`] owns every live session and runs the per-player
//! state machine: join, checkpoint, die, finish, leave, restart. It talks to
//! the outside world only through four seams:
//!
//! - [`CourseRegistry`](parkforge_course::CourseRegistry): course lookup
//! - [`ProfileStore`](parkforge_session::ProfileStore): persisted players
//! - [`Leaderboard`]: finish times
//! - [`Host`]: teleports, notices, sounds, inventories
//!
//! # Key types
//!
//! - [`ProgressionEngine`]: the transitions
//! - [`EngineConfig`]: everything server owners can tune
//! - [`CourseEvent`] / [`EventBus`]: lifecycle notifications
//! - [`Notice`]: player-facing messages, rendered by the host
//! - [`RecordingHost`] / [`MemoryLeaderboard`]: in-memory implementations
//!   for tests and demos
//!
//! Deferred work (post-finish rewards, linked-course joins) runs from
//! [`ProgressionEngine::on_tick`], so the engine stays single-owner and
//! never spawns.

mod config;
mod deferred;
mod engine;
mod error;
mod events;
mod host;
mod leaderboard;
mod mode;
mod notice;
mod outcome;
mod reward;
mod timer;

pub use config::{
    DieConfig, EngineConfig, FinishConfig, JoinConfig, LeaveConfig, ModesConfig, OnCourseConfig,
    RankUnlock, RanksConfig, RestartConfig, TimerConfig,
};
pub use deferred::{Continuation, FinishRecord};
pub use engine::ProgressionEngine;
pub use error::{EngineError, Limit};
pub use events::{CourseEvent, EventBus};
pub use host::{BroadcastScope, Channel, Host, HostCall, ParkourTool, RecordingHost, ScoreboardUpdate, Sound};
pub use leaderboard::{Leaderboard, MemoryLeaderboard, TimeEntry, TimeResult};
pub use mode::ModeHooks;
pub use notice::Notice;
pub use outcome::{
    CheckpointOutcome, DeathOutcome, FinishOutcome, JoinPolicy, LeaveOutcome, RestartKind,
};
pub use reward::level_reward;
pub use timer::LiveTime;
