//! Session types: one player's live attempt at one course.
//!
//! A session tracks:
//! - WHERE the player is (current checkpoint, optional freedom location)
//! - HOW it's going (deaths, elapsed time)
//! - WHETHER it may be resumed later (`marked_for_deletion`)
//!
//! The checkpoint index is private so the invariant
//! `0 <= current_checkpoint <= checkpoint_count` holds at every observable
//! instant: every write goes through a method that checks it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parkforge_course::{Course, Location, PlayerId};
use tokio::time::Instant;

use crate::{SavedSession, SessionError};

// ---------------------------------------------------------------------------
// CoursePhase
// ---------------------------------------------------------------------------

/// Where a player is in the progression state machine.
///
/// ```text
/// NotPlaying → Joined → Checkpointing* → AllCheckpoints → Finished
///                 │            │                │
///                 └────────────┴────────────────┴──→ NotPlaying (leave / limit)
/// ```
///
/// The phase is derived from the session rather than stored, so it can
/// never disagree with the checkpoint counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoursePhase {
    NotPlaying,
    Joined,
    Checkpointing,
    AllCheckpoints,
    Finished,
}

impl CoursePhase {
    /// Returns `true` while a session is live and not yet finished.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Joined | Self::Checkpointing | Self::AllCheckpoints)
    }
}

impl fmt::Display for CoursePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPlaying => write!(f, "NotPlaying"),
            Self::Joined => write!(f, "Joined"),
            Self::Checkpointing => write!(f, "Checkpointing"),
            Self::AllCheckpoints => write!(f, "AllCheckpoints"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A player's live, in-progress attempt at a course.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    course: Arc<Course>,
    current_checkpoint: usize,
    deaths: u32,

    /// Manual respawn point, used instead of the checkpoint when set.
    freedom_location: Option<Location>,

    /// When the running timer segment began. `None` until the timer is armed.
    start_timestamp: Option<Instant>,
    /// Set exactly once, when the player finishes.
    finish_timestamp: Option<Instant>,
    /// Time accumulated by earlier attempts this session was resumed from.
    carried: Duration,

    start_timer_enabled: bool,
    marked_for_deletion: bool,
}

impl Session {
    /// A fresh session at checkpoint 0 with the timer not yet armed.
    pub fn new(player_id: PlayerId, course: Arc<Course>) -> Self {
        Self {
            player_id,
            course,
            current_checkpoint: 0,
            deaths: 0,
            freedom_location: None,
            start_timestamp: None,
            finish_timestamp: None,
            carried: Duration::ZERO,
            start_timer_enabled: false,
            marked_for_deletion: false,
        }
    }

    /// Rebuilds a session from a persisted snapshot.
    ///
    /// Returns `None` if the snapshot belongs to another course or points
    /// past the course's last checkpoint (the course was edited since).
    pub fn resume(
        player_id: PlayerId,
        course: Arc<Course>,
        saved: &SavedSession,
        now: Instant,
    ) -> Option<Self> {
        if !saved.course.eq_ignore_ascii_case(&course.name)
            || saved.checkpoint > course.checkpoint_count()
        {
            return None;
        }
        Some(Self {
            player_id,
            course,
            current_checkpoint: saved.checkpoint,
            deaths: saved.deaths,
            freedom_location: saved.freedom_location.clone(),
            start_timestamp: saved.timer_started.then_some(now),
            finish_timestamp: None,
            carried: Duration::from_millis(saved.elapsed_ms),
            start_timer_enabled: saved.timer_started,
            marked_for_deletion: false,
        })
    }

    /// Captures what is needed to resume this session later.
    pub fn snapshot(&self, now: Instant) -> SavedSession {
        SavedSession {
            course: self.course.name.clone(),
            checkpoint: self.current_checkpoint,
            deaths: self.deaths,
            freedom_location: self.freedom_location.clone(),
            elapsed_ms: self.elapsed(now).as_millis() as u64,
            timer_started: self.start_timer_enabled,
        }
    }

    // -- Course -------------------------------------------------------------

    pub fn course(&self) -> &Arc<Course> {
        &self.course
    }

    pub fn course_name(&self) -> &str {
        &self.course.name
    }

    // -- Checkpoints --------------------------------------------------------

    pub fn current_checkpoint(&self) -> usize {
        self.current_checkpoint
    }

    pub fn checkpoint_count(&self) -> usize {
        self.course.checkpoint_count()
    }

    pub fn has_achieved_all_checkpoints(&self) -> bool {
        self.current_checkpoint >= self.course.checkpoint_count()
    }

    /// Advances one checkpoint and returns the new index.
    ///
    /// # Errors
    /// [`SessionError::InvalidCheckpoint`] if already at the last checkpoint.
    pub fn increase_checkpoint(&mut self) -> Result<usize, SessionError> {
        self.set_checkpoint(self.current_checkpoint + 1)?;
        Ok(self.current_checkpoint)
    }

    /// Jumps to `index`, which may be lower than the current checkpoint.
    ///
    /// # Errors
    /// [`SessionError::InvalidCheckpoint`] if `index` exceeds the checkpoint count.
    pub fn set_checkpoint(&mut self, index: usize) -> Result<(), SessionError> {
        let max = self.course.checkpoint_count();
        if index > max {
            return Err(SessionError::InvalidCheckpoint {
                requested: index,
                max,
            });
        }
        self.current_checkpoint = index;
        Ok(())
    }

    // -- Deaths -------------------------------------------------------------

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Increments the death counter and returns the new total.
    pub fn increase_death(&mut self) -> u32 {
        self.deaths = self.deaths.saturating_add(1);
        self.deaths
    }

    /// Deaths left before the course limit ejects the player.
    pub fn remaining_deaths(&self) -> Option<u32> {
        self.course
            .settings
            .max_deaths
            .map(|max| max.saturating_sub(self.deaths))
    }

    /// `true` once the death counter has reached the course's limit.
    pub fn is_at_death_limit(&self) -> bool {
        self.course
            .settings
            .max_deaths
            .is_some_and(|max| self.deaths >= max)
    }

    // -- Position -----------------------------------------------------------

    pub fn freedom_location(&self) -> Option<&Location> {
        self.freedom_location.as_ref()
    }

    pub fn set_freedom_location(&mut self, location: Option<Location>) {
        self.freedom_location = location;
    }

    /// Where the player goes after dying: the freedom location when set,
    /// otherwise the current checkpoint.
    pub fn respawn_location(&self) -> &Location {
        self.freedom_location
            .as_ref()
            .or_else(|| self.course.location_of(self.current_checkpoint))
            .unwrap_or(&self.course.start)
    }

    // -- Timer --------------------------------------------------------------

    pub fn is_timer_started(&self) -> bool {
        self.start_timer_enabled
    }

    /// Arms the timer. Idempotent: a running timer keeps its start.
    pub fn start_timer(&mut self, now: Instant) {
        if !self.start_timer_enabled {
            self.start_timer_enabled = true;
            self.start_timestamp = Some(now);
        }
    }

    /// Restarts the clock from zero, dropping any carried time.
    pub fn reset_timer(&mut self, now: Instant) {
        self.carried = Duration::ZERO;
        if self.start_timer_enabled {
            self.start_timestamp = Some(now);
        }
    }

    /// Back to checkpoint 0 with no deaths and a fresh clock.
    /// The freedom location is left alone.
    pub fn reset_progress(&mut self, now: Instant) {
        self.current_checkpoint = 0;
        self.deaths = 0;
        self.reset_timer(now);
    }

    /// Total time on the course, frozen once finished.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let end = self.finish_timestamp.unwrap_or(now);
        let running = self
            .start_timestamp
            .map(|start| end.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        self.carried + running
    }

    /// Seconds left before the course time limit, or `None` without a limit.
    pub fn remaining_secs(&self, now: Instant) -> Option<i64> {
        self.course
            .settings
            .max_time_secs
            .map(|max| max as i64 - self.elapsed(now).as_secs() as i64)
    }

    /// What the live timer displays: the countdown when the course has a
    /// time limit, the elapsed seconds otherwise.
    pub fn live_seconds(&self, now: Instant) -> i64 {
        self.remaining_secs(now)
            .unwrap_or_else(|| self.elapsed(now).as_secs() as i64)
    }

    /// Records the finish instant. Returns `false` if already finished;
    /// the first finish time is never overwritten.
    pub fn mark_finished(&mut self, now: Instant) -> bool {
        if self.finish_timestamp.is_some() {
            return false;
        }
        self.finish_timestamp = Some(now);
        true
    }

    /// The final time, once finished.
    pub fn finished_elapsed(&self) -> Option<Duration> {
        self.finish_timestamp.map(|at| self.elapsed(at))
    }

    pub fn is_finished(&self) -> bool {
        self.finish_timestamp.is_some()
    }

    // -- Deletion -----------------------------------------------------------

    /// Flags the session so it is deleted instead of persisted on leave.
    pub fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    // -- Views --------------------------------------------------------------

    pub fn phase(&self) -> CoursePhase {
        if self.is_finished() {
            CoursePhase::Finished
        } else if self.has_achieved_all_checkpoints() {
            CoursePhase::AllCheckpoints
        } else if self.current_checkpoint > 0 {
            CoursePhase::Checkpointing
        } else {
            CoursePhase::Joined
        }
    }

    /// A detached, cloneable summary for callers outside the engine.
    pub fn view(&self, now: Instant) -> SessionView {
        SessionView {
            player_id: self.player_id,
            course: self.course.name.clone(),
            checkpoint: self.current_checkpoint,
            checkpoint_count: self.course.checkpoint_count(),
            deaths: self.deaths,
            elapsed: self.elapsed(now),
            phase: self.phase(),
        }
    }
}

/// Read-only snapshot of a session, safe to send across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub player_id: PlayerId,
    pub course: String,
    pub checkpoint: usize,
    pub checkpoint_count: usize,
    pub deaths: u32,
    pub elapsed: Duration,
    pub phase: CoursePhase,
}
