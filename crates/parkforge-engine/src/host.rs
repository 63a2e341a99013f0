//! The host boundary: everything the engine asks the game world to do.
//!
//! Teleports, inventories, sounds, titles and scoreboards are all opaque,
//! fire-and-forget calls on [`Host`]. The engine never waits on them and
//! never inspects their result, except for the few queries (`location`,
//! `capture_state`, `can_join`) it needs to make a decision.

use std::collections::{HashMap, HashSet};

use parkforge_course::{Course, ItemStack, Location, PlayerId};
use parkforge_session::SavedPlayerState;
use serde::{Deserialize, Serialize};

use crate::Notice;

/// Where a notice is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Chat,
    Title,
    Subtitle,
    ActionBar,
}

/// Who hears a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastScope {
    /// Broadcasting is off.
    #[default]
    None,
    /// Only the originating player.
    Player,
    /// Everyone on a course.
    Parkour,
    /// Everyone in the originating player's world.
    World,
    /// Everyone on the server.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    JoinCourse,
    CheckpointAchieved,
    PlayerDeath,
    CourseFailed,
    CourseFinished,
    SecondIncrement,
    SecondDecrement,
    ReloadRocket,
}

/// Items the engine hands out while a player is on a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParkourTool {
    /// Return to the last checkpoint (counts as a death).
    LastCheckpoint,
    Restart,
    Leave,
    /// Freedom mode: save the current position as a checkpoint.
    Freedom,
    /// Rockets mode: launch in the direction you face.
    Rockets,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreboardUpdate {
    Show {
        course: String,
        checkpoints: usize,
        max_deaths: Option<u32>,
    },
    Checkpoint { current: usize, total: usize },
    Deaths { deaths: u32, remaining: Option<u32> },
    Timer { seconds: i64 },
    Remove,
}

/// Side effects and queries the engine needs from the game world.
///
/// Only the calls the engine can't do without are required; everything
/// else defaults to a no-op so a host can start small.
pub trait Host {
    fn is_online(&self, _player: PlayerId) -> bool {
        true
    }

    /// Privileged players bypass tool cooldowns.
    fn is_privileged(&self, _player: PlayerId) -> bool {
        false
    }

    /// Host-side eligibility (permissions, parties, economy fees).
    /// `Err` carries the reason shown to the player.
    fn can_join(&self, _player: PlayerId, _course: &Course) -> Result<(), String> {
        Ok(())
    }

    fn location(&self, player: PlayerId) -> Option<Location>;

    fn teleport(&mut self, player: PlayerId, to: &Location);

    fn notify(&mut self, player: PlayerId, channel: Channel, notice: Notice);

    fn broadcast(&mut self, _scope: BroadcastScope, _origin: PlayerId, _notice: Notice) {}

    fn play_sound(&mut self, _player: PlayerId, _sound: Sound) {}

    fn scoreboard(&mut self, _player: PlayerId, _update: ScoreboardUpdate) {}

    /// Snapshot health, food, XP and inventory, then clear the inventory.
    fn capture_state(&mut self, player: PlayerId) -> SavedPlayerState;

    fn restore_state(&mut self, player: PlayerId, state: &SavedPlayerState);

    /// Full health, no fire, no fall damage: ready to (re)start.
    fn prepare_player(&mut self, _player: PlayerId) {}

    fn set_xp_level(&mut self, _player: PlayerId, _level: u32) {}

    fn set_food_level(&mut self, _player: PlayerId, _level: u32) {}

    fn set_walk_speed(&mut self, _player: PlayerId, _speed: f32) {}

    fn apply_effects(&mut self, _player: PlayerId, _effects: &[String]) {}

    fn give_item(&mut self, _player: PlayerId, _item: &ItemStack) {}

    fn give_xp(&mut self, _player: PlayerId, _xp: u32) {}

    fn give_tool(&mut self, _player: PlayerId, _tool: ParkourTool) {}

    /// Apply velocity along the player's facing direction.
    fn launch(&mut self, _player: PlayerId, _force: f64) {}

    /// Pay out an economy plugin prize for the course.
    fn give_economy_prize(&mut self, _player: PlayerId, _course: &str) {}

    /// Sends the player to a lobby (`None` = default lobby). Returns
    /// `false` if that lobby doesn't exist.
    fn join_lobby(&mut self, _player: PlayerId, _lobby: Option<&str>) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// RecordingHost
// ---------------------------------------------------------------------------

/// One recorded call on a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Teleport(PlayerId, Location),
    Notify(PlayerId, Channel, Notice),
    Broadcast(BroadcastScope, PlayerId, Notice),
    Sound(PlayerId, Sound),
    Scoreboard(PlayerId, ScoreboardUpdate),
    Capture(PlayerId),
    Restore(PlayerId, SavedPlayerState),
    Prepare(PlayerId),
    XpLevel(PlayerId, u32),
    FoodLevel(PlayerId, u32),
    WalkSpeed(PlayerId, f32),
    Effects(PlayerId, Vec<String>),
    Item(PlayerId, ItemStack),
    Xp(PlayerId, u32),
    Tool(PlayerId, ParkourTool),
    Launch(PlayerId, f64),
    EconomyPrize(PlayerId, String),
    Lobby(PlayerId, Option<String>),
}

/// An in-memory [`Host`] that records every side effect.
///
/// Players are online unless marked offline. Locations default to the
/// last teleport destination.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    offline: HashSet<PlayerId>,
    privileged: HashSet<PlayerId>,
    denied: HashMap<PlayerId, String>,
    locations: HashMap<PlayerId, Location>,
    lobbies: Option<HashSet<String>>,
    /// What `capture_state` returns.
    pub state: SavedPlayerState,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&mut self, player: PlayerId, online: bool) {
        if online {
            self.offline.remove(&player);
        } else {
            self.offline.insert(player);
        }
    }

    pub fn set_privileged(&mut self, player: PlayerId) {
        self.privileged.insert(player);
    }

    /// Makes `can_join` refuse this player.
    pub fn deny(&mut self, player: PlayerId, reason: impl Into<String>) {
        self.denied.insert(player, reason.into());
    }

    pub fn place(&mut self, player: PlayerId, location: Location) {
        self.locations.insert(player, location);
    }

    /// Restricts `join_lobby` to these named lobbies.
    pub fn with_lobbies<I, S>(mut self, lobbies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lobbies = Some(lobbies.into_iter().map(Into::into).collect());
        self
    }

    /// Notices sent to `player`, in order.
    pub fn notices(&self, player: PlayerId) -> Vec<&Notice> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Notify(p, _, notice) if *p == player => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn has_notice(&self, player: PlayerId, predicate: impl Fn(&Notice) -> bool) -> bool {
        self.notices(player).into_iter().any(predicate)
    }

    pub fn teleports(&self, player: PlayerId) -> Vec<&Location> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Teleport(p, to) if *p == player => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Host for RecordingHost {
    fn is_online(&self, player: PlayerId) -> bool {
        !self.offline.contains(&player)
    }

    fn is_privileged(&self, player: PlayerId) -> bool {
        self.privileged.contains(&player)
    }

    fn can_join(&self, player: PlayerId, _course: &Course) -> Result<(), String> {
        match self.denied.get(&player) {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn location(&self, player: PlayerId) -> Option<Location> {
        self.locations.get(&player).cloned()
    }

    fn teleport(&mut self, player: PlayerId, to: &Location) {
        self.locations.insert(player, to.clone());
        self.calls.push(HostCall::Teleport(player, to.clone()));
    }

    fn notify(&mut self, player: PlayerId, channel: Channel, notice: Notice) {
        self.calls.push(HostCall::Notify(player, channel, notice));
    }

    fn broadcast(&mut self, scope: BroadcastScope, origin: PlayerId, notice: Notice) {
        self.calls.push(HostCall::Broadcast(scope, origin, notice));
    }

    fn play_sound(&mut self, player: PlayerId, sound: Sound) {
        self.calls.push(HostCall::Sound(player, sound));
    }

    fn scoreboard(&mut self, player: PlayerId, update: ScoreboardUpdate) {
        self.calls.push(HostCall::Scoreboard(player, update));
    }

    fn capture_state(&mut self, player: PlayerId) -> SavedPlayerState {
        self.calls.push(HostCall::Capture(player));
        self.state.clone()
    }

    fn restore_state(&mut self, player: PlayerId, state: &SavedPlayerState) {
        self.calls.push(HostCall::Restore(player, state.clone()));
    }

    fn prepare_player(&mut self, player: PlayerId) {
        self.calls.push(HostCall::Prepare(player));
    }

    fn set_xp_level(&mut self, player: PlayerId, level: u32) {
        self.calls.push(HostCall::XpLevel(player, level));
    }

    fn set_food_level(&mut self, player: PlayerId, level: u32) {
        self.calls.push(HostCall::FoodLevel(player, level));
    }

    fn set_walk_speed(&mut self, player: PlayerId, speed: f32) {
        self.calls.push(HostCall::WalkSpeed(player, speed));
    }

    fn apply_effects(&mut self, player: PlayerId, effects: &[String]) {
        self.calls.push(HostCall::Effects(player, effects.to_vec()));
    }

    fn give_item(&mut self, player: PlayerId, item: &ItemStack) {
        self.calls.push(HostCall::Item(player, item.clone()));
    }

    fn give_xp(&mut self, player: PlayerId, xp: u32) {
        self.calls.push(HostCall::Xp(player, xp));
    }

    fn give_tool(&mut self, player: PlayerId, tool: ParkourTool) {
        self.calls.push(HostCall::Tool(player, tool));
    }

    fn launch(&mut self, player: PlayerId, force: f64) {
        self.calls.push(HostCall::Launch(player, force));
    }

    fn give_economy_prize(&mut self, player: PlayerId, course: &str) {
        self.calls.push(HostCall::EconomyPrize(player, course.to_string()));
    }

    fn join_lobby(&mut self, player: PlayerId, lobby: Option<&str>) -> bool {
        let exists = match (&self.lobbies, lobby) {
            (Some(known), Some(name)) => known.contains(name),
            _ => true,
        };
        if exists {
            self.calls.push(HostCall::Lobby(player, lobby.map(str::to_string)));
        }
        exists
    }
}
