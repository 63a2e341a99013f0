//! Live course sessions for Parkforge.
//!
//! This crate owns the mutable side of a player's attempt at a course:
//!
//! 1. **Session**: checkpoint, deaths, timer, and deletion flag for one
//!    player on one course ([`Session`])
//! 2. **Session tracking**: who is playing what ([`SessionManager`])
//! 3. **Cooldowns**: minimum-interval gates ([`CooldownTracker`])
//! 4. **Profiles**: the persisted per-player record the engine reads and
//!    writes through the [`ProfileStore`] trait
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine Layer (above)  ← drives transitions on sessions
//!     ↕
//! Session Layer (this crate)  ← holds live progress and player records
//!     ↕
//! Course Layer (below)  ← provides PlayerId, Course, Location
//! ```
//!
//! All instants are `tokio::time::Instant`, so tests can pause and advance
//! the clock instead of sleeping.

mod clock;
mod cooldown;
mod error;
mod manager;
mod session;
mod store;

pub use clock::{format_clock, format_duration};
pub use cooldown::{Bypass, Cooldown, CooldownTracker};
pub use error::SessionError;
pub use manager::{JoinKind, SessionManager};
pub use session::{CoursePhase, Session, SessionView};
pub use store::{MemoryProfileStore, Profile, ProfileStore, SavedPlayerState, SavedSession};
