//! The immutable course definition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CourseError, ItemStack, Location};

// ---------------------------------------------------------------------------
// ParkourMode
// ---------------------------------------------------------------------------

/// A behavioral modifier applied for the duration of a session.
///
/// The mode only tags the course here. What each mode actually does on
/// entry and exit lives with the engine, which owns the side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkourMode {
    #[default]
    None,
    /// Players may store their own respawn point.
    Freedom,
    /// Walk speed is raised while on the course.
    Speedy,
    /// Players carry a rocket tool that launches them.
    Rockets,
    /// Potion effects are applied on join and after every respawn.
    Potion,
    /// Food is held low so players cannot sprint.
    #[serde(rename = "NORUN")]
    NoRun,
}

impl fmt::Display for ParkourMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Freedom => "FREEDOM",
            Self::Speedy => "SPEEDY",
            Self::Rockets => "ROCKETS",
            Self::Potion => "POTION",
            Self::NoRun => "NORUN",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// A positional waypoint and its sequence index within a course.
///
/// Index 0 is the course start and is stored separately as
/// [`Course::start`]; the checkpoints list holds indices `1..=N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub index: usize,
    pub location: Location,
}

// ---------------------------------------------------------------------------
// Settings and rewards
// ---------------------------------------------------------------------------

/// Limits and routing rules for a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSettings {
    /// Deaths allowed before the player is ejected. `None` = unlimited.
    pub max_deaths: Option<u32>,
    /// Time limit in seconds. When set, the live timer counts down.
    pub max_time_secs: Option<u64>,
    /// Whether leaving keeps progress for a later resume.
    pub resumable: bool,
    /// Whether players may set their own respawn point.
    pub manual_checkpoints: bool,
    /// Minimum parkour level required to join.
    pub min_level: Option<u32>,
    /// Maximum concurrent players. `None` = unlimited.
    pub max_players: Option<usize>,
    /// Course the player is sent to after finishing.
    pub linked_course: Option<String>,
    /// Lobby the player is sent to after finishing.
    pub linked_lobby: Option<String>,
    /// Finish times are only broadcast once a course is marked ready.
    pub ready: bool,
    /// Effects applied in [`ParkourMode::Potion`].
    pub potion_effects: Vec<String>,
    /// Optional message shown when potion effects are applied on join.
    pub potion_join_message: Option<String>,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            max_deaths: None,
            max_time_secs: None,
            resumable: true,
            manual_checkpoints: false,
            min_level: None,
            max_players: None,
            linked_course: None,
            linked_lobby: None,
            ready: true,
            potion_effects: Vec::new(),
            potion_join_message: None,
        }
    }
}

/// Course-specific reward policy. Anything left unset falls back to the
/// engine's global defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseRewards {
    /// Only reward the first completion.
    pub reward_once: bool,
    /// Minimum time between two prizes for the same player, in seconds.
    pub reward_delay_secs: Option<u64>,
    /// Item prize overriding the global default.
    pub prize: Option<ItemStack>,
    /// XP prize; 0 falls back to the global default.
    pub xp: u32,
    /// Currency credited to the player's profile.
    pub parkoins: f64,
    /// Raise the player's level to at least this value.
    pub level: Option<u32>,
    /// Add this many levels to the player's current level.
    pub level_increase: Option<u32>,
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// An ordered sequence of checkpoints plus completion rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Unique name, used for lookup. Compared case-insensitively.
    pub name: String,
    /// Human-readable name shown to players.
    #[serde(default)]
    pub display_name: String,
    /// Checkpoint 0.
    pub start: Location,
    /// Checkpoints `1..=N`, in order.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Movement rule set the host applies on the course.
    #[serde(default)]
    pub kit: String,
    #[serde(default)]
    pub mode: ParkourMode,
    #[serde(default)]
    pub settings: CourseSettings,
    #[serde(default)]
    pub rewards: CourseRewards,
}

impl Course {
    /// Creates a course with default settings and no checkpoints beyond the start.
    pub fn new(name: impl Into<String>, start: Location) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            start,
            checkpoints: Vec::new(),
            kit: "default".to_string(),
            mode: ParkourMode::None,
            settings: CourseSettings::default(),
            rewards: CourseRewards::default(),
        }
    }

    /// Appends a checkpoint with the next index.
    pub fn with_checkpoint(mut self, location: Location) -> Self {
        let index = self.checkpoints.len() + 1;
        self.checkpoints.push(Checkpoint { index, location });
        self
    }

    /// Number of checkpoints a player must reach, not counting the start.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Where a player at `index` respawns. Index 0 is the start; an index
    /// past the end yields `None`.
    pub fn location_of(&self, index: usize) -> Option<&Location> {
        match index {
            0 => Some(&self.start),
            i => self.checkpoints.get(i - 1).map(|c| &c.location),
        }
    }

    /// Name shown to players, falling back to the lookup name.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn has_max_deaths(&self) -> bool {
        self.settings.max_deaths.is_some()
    }

    pub fn has_max_time(&self) -> bool {
        self.settings.max_time_secs.is_some()
    }

    /// Checks structural rules: a non-empty name and checkpoints numbered
    /// `1..=N` without gaps.
    pub fn validate(&self) -> Result<(), CourseError> {
        if self.name.trim().is_empty() {
            return Err(CourseError::InvalidCourse("course name is empty".into()));
        }
        for (position, checkpoint) in self.checkpoints.iter().enumerate() {
            if checkpoint.index != position + 1 {
                return Err(CourseError::InvalidCourse(format!(
                    "course {}: checkpoint at position {} has index {}, expected {}",
                    self.name,
                    position + 1,
                    checkpoint.index,
                    position + 1
                )));
            }
        }
        Ok(())
    }
}
