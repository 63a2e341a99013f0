//! The player profile store: per-player records that outlive a session.
//!
//! Parkforge doesn't own persistence. It reads and writes player records
//! through the [`ProfileStore`] trait, and the host decides whether that
//! means YAML files, a database, or the in-memory [`MemoryProfileStore`].

use std::collections::{BTreeSet, HashMap};
use std::time::SystemTime;

use parkforge_course::{ItemStack, Location, PlayerId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Player state captured on join and restored on leave or finish.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedPlayerState {
    pub health: f64,
    pub food_level: u32,
    pub xp_level: u32,
    pub inventory: Vec<ItemStack>,
    pub armor: Vec<ItemStack>,
}

/// A resumable session as persisted between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub course: String,
    pub checkpoint: usize,
    pub deaths: u32,
    pub freedom_location: Option<Location>,
    pub elapsed_ms: u64,
    pub timer_started: bool,
}

/// Everything Parkforge remembers about a player between sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Captured on join, cleared once restored.
    pub saved_state: Option<SavedPlayerState>,
    /// Where the player stood before joining, when join locations are enabled.
    pub join_location: Option<Location>,
    pub last_played_course: Option<String>,
    pub last_completed_course: Option<String>,
    /// Course to rejoin on reconnect.
    pub existing_session_course: Option<String>,
    pub completed_courses: BTreeSet<String>,
    pub parkoins: f64,
    pub level: u32,
    pub rank: Option<String>,
    /// Wall-clock time of the last prize per course.
    pub last_rewarded: HashMap<String, SystemTime>,
}

impl Profile {
    pub fn has_completed(&self, course: &str) -> bool {
        self.completed_courses.contains(&course.to_lowercase())
    }

    pub fn add_completed(&mut self, course: &str) {
        self.completed_courses.insert(course.to_lowercase());
    }
}

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

/// Reads and writes player profiles and resumable sessions.
///
/// All calls are synchronous: the engine runs on a single tick thread and
/// never awaits the store. A store backed by slow I/O should cache in
/// memory and flush in the background.
pub trait ProfileStore {
    /// Whether a profile exists for this player. Deferred work checks this
    /// before acting, so a reset player is left alone.
    fn has_profile(&self, player: PlayerId) -> bool;

    /// The player's profile, or a default one if none is stored yet.
    fn profile(&self, player: PlayerId) -> Profile;

    fn save_profile(&mut self, player: PlayerId, profile: Profile);

    /// Removes the profile entirely.
    fn delete_profile(&mut self, player: PlayerId);

    /// A resumable session for this player on this course, if one was saved.
    fn saved_session(&self, player: PlayerId, course: &str) -> Option<SavedSession>;

    fn save_session(&mut self, player: PlayerId, session: SavedSession);

    /// Deletes the saved session. Returns `true` if one existed.
    fn delete_session(&mut self, player: PlayerId, course: &str) -> bool;

    /// Deletes every saved session for the player.
    fn delete_sessions(&mut self, player: PlayerId);

    /// Read-modify-write helper.
    fn update_profile<F>(&mut self, player: PlayerId, update: F)
    where
        F: FnOnce(&mut Profile),
        Self: Sized,
    {
        let mut profile = self.profile(player);
        update(&mut profile);
        self.save_profile(player, profile);
    }
}

/// A [`ProfileStore`] that keeps everything in memory.
///
/// Suitable for tests, demos, and hosts that persist on shutdown by
/// serializing [`Profile`] and [`SavedSession`] themselves.
#[derive(Debug, Default, Clone)]
pub struct MemoryProfileStore {
    profiles: HashMap<PlayerId, Profile>,
    sessions: HashMap<(PlayerId, String), SavedSession>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved sessions across all players.
    pub fn saved_session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn has_profile(&self, player: PlayerId) -> bool {
        self.profiles.contains_key(&player)
    }

    fn profile(&self, player: PlayerId) -> Profile {
        self.profiles.get(&player).cloned().unwrap_or_default()
    }

    fn save_profile(&mut self, player: PlayerId, profile: Profile) {
        self.profiles.insert(player, profile);
    }

    fn delete_profile(&mut self, player: PlayerId) {
        self.profiles.remove(&player);
    }

    fn saved_session(&self, player: PlayerId, course: &str) -> Option<SavedSession> {
        self.sessions.get(&(player, course.to_lowercase())).cloned()
    }

    fn save_session(&mut self, player: PlayerId, session: SavedSession) {
        self.sessions
            .insert((player, session.course.to_lowercase()), session);
    }

    fn delete_session(&mut self, player: PlayerId, course: &str) -> bool {
        self.sessions
            .remove(&(player, course.to_lowercase()))
            .is_some()
    }

    fn delete_sessions(&mut self, player: PlayerId) {
        self.sessions.retain(|(owner, _), _| *owner != player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(course: &str) -> SavedSession {
        SavedSession {
            course: course.into(),
            checkpoint: 1,
            deaths: 0,
            freedom_location: None,
            elapsed_ms: 1_000,
            timer_started: true,
        }
    }

    #[test]
    fn test_profile_defaults_when_missing() {
        let store = MemoryProfileStore::new();
        assert!(!store.has_profile(PlayerId(1)));
        assert_eq!(store.profile(PlayerId(1)), Profile::default());
    }

    #[test]
    fn test_update_profile_creates_entry() {
        let mut store = MemoryProfileStore::new();
        store.update_profile(PlayerId(1), |p| p.level = 4);
        assert!(store.has_profile(PlayerId(1)));
        assert_eq!(store.profile(PlayerId(1)).level, 4);
    }

    #[test]
    fn test_saved_session_lookup_ignores_case() {
        let mut store = MemoryProfileStore::new();
        store.save_session(PlayerId(1), saved("Tower"));
        assert!(store.saved_session(PlayerId(1), "tower").is_some());
        assert!(store.delete_session(PlayerId(1), "TOWER"));
        assert!(!store.delete_session(PlayerId(1), "tower"));
    }

    #[test]
    fn test_delete_sessions_only_touches_owner() {
        let mut store = MemoryProfileStore::new();
        store.save_session(PlayerId(1), saved("a"));
        store.save_session(PlayerId(1), saved("b"));
        store.save_session(PlayerId(2), saved("a"));
        store.delete_sessions(PlayerId(1));
        assert_eq!(store.saved_session_count(), 1);
        assert!(store.saved_session(PlayerId(2), "a").is_some());
    }

    #[test]
    fn test_completed_courses_are_case_insensitive() {
        let mut profile = Profile::default();
        profile.add_completed("Tower");
        assert!(profile.has_completed("tower"));
    }
}
