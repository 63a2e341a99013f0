//! The session manager: who is playing which course right now.
//!
//! A player holds at most one [`Session`]. Joining another course replaces
//! the old one; the engine is expected to have run its leave sequence first
//! if it wants the old course cleaned up properly.
//!
//! Like the rest of the engine state this is a plain `HashMap` owned by the
//! tick task, not a concurrent map.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parkforge_course::{Course, PlayerId};
use tokio::time::Instant;

use crate::{CoursePhase, SavedSession, Session, SessionError};

/// How a join produced its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Progress was restored from a saved session.
    Resumed,
    Fresh,
}

/// Registry of live sessions, keyed by player.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or resumes) a session for `player` on `course`.
    ///
    /// `saved` is only honoured when the course is resumable and the
    /// snapshot still fits the course; anything else starts fresh.
    ///
    /// # Errors
    /// [`SessionError::AlreadyPlaying`] if the player is already on this
    /// course. A session on a different course is replaced.
    pub fn join(
        &mut self,
        player: PlayerId,
        course: Arc<Course>,
        saved: Option<SavedSession>,
        now: Instant,
    ) -> Result<(&mut Session, JoinKind), SessionError> {
        if let Some(existing) = self.sessions.get(&player) {
            if existing.course_name().eq_ignore_ascii_case(&course.name) {
                return Err(SessionError::AlreadyPlaying(player, course.name.clone()));
            }
            tracing::debug!(
                %player,
                from = existing.course_name(),
                to = %course.name,
                "replacing session on another course"
            );
        }

        let resumed = saved
            .filter(|_| course.settings.resumable)
            .and_then(|saved| Session::resume(player, Arc::clone(&course), &saved, now));

        let (session, kind) = match resumed {
            Some(session) => (session, JoinKind::Resumed),
            None => (Session::new(player, course), JoinKind::Fresh),
        };

        tracing::info!(
            %player,
            course = session.course_name(),
            ?kind,
            checkpoint = session.current_checkpoint(),
            "session started"
        );

        let slot = match self.sessions.entry(player) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        };
        Ok((slot, kind))
    }

    pub fn get(&self, player: PlayerId) -> Option<&Session> {
        self.sessions.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut Session> {
        self.sessions.get_mut(&player)
    }

    /// Like [`get_mut`](Self::get_mut) but fails with `NotPlaying`.
    pub fn require_mut(&mut self, player: PlayerId) -> Result<&mut Session, SessionError> {
        self.sessions
            .get_mut(&player)
            .ok_or(SessionError::NotPlaying(player))
    }

    /// Removes and returns the player's session.
    pub fn remove(&mut self, player: PlayerId) -> Option<Session> {
        let removed = self.sessions.remove(&player);
        if let Some(session) = &removed {
            tracing::debug!(%player, course = session.course_name(), "session removed");
        }
        removed
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    /// The player's phase, `NotPlaying` when they have no session.
    pub fn phase(&self, player: PlayerId) -> CoursePhase {
        self.sessions
            .get(&player)
            .map_or(CoursePhase::NotPlaying, Session::phase)
    }

    /// Snapshot of active player ids, sorted. Safe to iterate while the
    /// sessions themselves are mutated or removed.
    pub fn active_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.sessions.keys().copied().collect();
        players.sort();
        players
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of players currently on `course`.
    pub fn players_on(&self, course: &str) -> usize {
        self.sessions
            .values()
            .filter(|s| s.course_name().eq_ignore_ascii_case(course))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes every session, ordered by player id.
    pub fn drain(&mut self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.drain().map(|(_, s)| s).collect();
        sessions.sort_by_key(|s| s.player_id);
        sessions
    }
}
