//! Engine configuration.
//!
//! Grouped the way server owners think about it: what happens on join, on
//! the course, on death, on finish, on leave and on restart, plus mode
//! tuning, ranks and the live timer. Every section has defaults, so a
//! config file only needs the keys it changes.

use parkforge_course::ItemStack;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::BroadcastScope;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub on_join: JoinConfig,
    pub on_course: OnCourseConfig,
    pub on_die: DieConfig,
    pub on_finish: FinishConfig,
    pub on_leave: LeaveConfig,
    pub on_restart: RestartConfig,
    pub modes: ModesConfig,
    pub ranks: RanksConfig,
    pub timer: TimerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Teleport to the course start on join.
    pub teleport_player: bool,
    /// Don't start the clock on join; wait for the start trigger.
    pub treat_first_checkpoint_as_start: bool,
    /// Remember where the player joined from and send them back there.
    pub teleport_to_join_location: bool,
    /// Food level set on join (ignored in NORUN mode).
    pub fill_food: Option<u32>,
    pub broadcast: BroadcastScope,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            teleport_player: true,
            treat_first_checkpoint_as_start: false,
            teleport_to_join_location: false,
            fill_food: Some(20),
            broadcast: BroadcastScope::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnCourseConfig {
    /// Reaching the last checkpoint finishes the course.
    pub treat_last_checkpoint_as_finish: bool,
    /// Push the live timer to the action bar.
    pub display_live_time: bool,
    /// Minimum seconds between tool uses.
    pub tool_cooldown_secs: u64,
}

impl Default for OnCourseConfig {
    fn default() -> Self {
        Self {
            treat_last_checkpoint_as_finish: false,
            display_live_time: true,
            tool_cooldown_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DieConfig {
    /// Dying before the first checkpoint restarts the clock.
    pub reset_progress_with_no_checkpoint: bool,
    /// Show the death count in the XP bar while on a course.
    pub set_xp_bar_to_death_count: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishConfig {
    /// Finishing without every checkpoint counts as a death.
    pub enforce_completion: bool,
    pub enable_prizes: bool,
    /// Prize when the course has none of its own.
    pub default_prize: Option<ItemStack>,
    /// XP when the course gives none of its own.
    pub default_xp: u32,
    pub teleport_away: bool,
    /// Ticks between the finish and the reward/teleport sequence.
    pub teleport_delay_ticks: u64,
    pub display_stats: bool,
    pub broadcast: BroadcastScope,
    pub display_new_records: bool,
    /// Tell players on join that they already completed the course.
    pub completed_join_message: bool,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            enforce_completion: true,
            enable_prizes: true,
            default_prize: Some(ItemStack::new("COOKIE", 1)),
            default_xp: 0,
            teleport_away: true,
            teleport_delay_ticks: 0,
            display_stats: true,
            broadcast: BroadcastScope::World,
            display_new_records: true,
            completed_join_message: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveConfig {
    pub teleport_away: bool,
    /// Leaving throws progress away instead of saving it for later.
    pub destroy_progress: bool,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self {
            teleport_away: true,
            destroy_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Restart as leave + delete + join instead of resetting in place.
    pub full_restart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModesConfig {
    pub speedy_speed: f32,
    pub speedy_reset_speed: f32,
    pub rockets_launch_force: f64,
    pub rockets_invert: bool,
    pub rockets_cooldown_secs: u64,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            speedy_speed: 0.7,
            speedy_reset_speed: 0.2,
            rockets_launch_force: 1.5,
            rockets_invert: false,
            rockets_cooldown_secs: 1,
        }
    }
}

impl ModesConfig {
    /// Launch force with the inversion applied.
    pub fn rocket_force(&self) -> f64 {
        if self.rockets_invert {
            -self.rockets_launch_force
        } else {
            self.rockets_launch_force
        }
    }
}

/// A rank awarded once the player reaches `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankUnlock {
    pub level: u32,
    pub rank: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RanksConfig {
    pub maximum_level: u32,
    pub unlocks: Vec<RankUnlock>,
}

impl Default for RanksConfig {
    fn default() -> Self {
        Self {
            maximum_level: 99_999_999,
            unlocks: Vec::new(),
        }
    }
}

impl RanksConfig {
    /// The highest rank whose unlock level is at or below `level`.
    pub fn unlocked_rank(&self, level: u32) -> Option<&str> {
        self.unlocks
            .iter()
            .filter(|unlock| unlock.level <= level)
            .max_by_key(|unlock| unlock.level)
            .map(|unlock| unlock.rank.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub enabled: bool,
    /// Ticks between live timer updates (20 = once a second at 20 Hz).
    pub interval_ticks: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ticks: 20,
        }
    }
}

impl EngineConfig {
    /// Fixes out-of-range values. [`ProgressionEngine::new`](crate::ProgressionEngine::new)
    /// calls this for you.
    pub fn validated(mut self) -> Self {
        if self.timer.interval_ticks == 0 {
            warn!("timer.interval_ticks is 0, using 1");
            self.timer.interval_ticks = 1;
        }
        if self.ranks.maximum_level == 0 {
            warn!("ranks.maximum_level is 0, using 1");
            self.ranks.maximum_level = 1;
        }
        for speed in [
            &mut self.modes.speedy_speed,
            &mut self.modes.speedy_reset_speed,
        ] {
            if !speed.is_finite() {
                *speed = 0.2;
            }
            *speed = speed.clamp(-1.0, 1.0);
        }
        if !self.modes.rockets_launch_force.is_finite() {
            self.modes.rockets_launch_force = 1.5;
        }
        self.ranks.unlocks.sort_by_key(|unlock| unlock.level);
        self
    }

    /// Parses a JSON config. Missing sections and keys take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_conventions() {
        let config = EngineConfig::default();
        assert!(config.on_finish.enforce_completion);
        assert!(config.on_join.teleport_player);
        assert!(!config.on_restart.full_restart);
        assert_eq!(config.timer.interval_ticks, 20);
    }

    #[test]
    fn test_validated_clamps_bad_values() {
        let mut config = EngineConfig::default();
        config.timer.interval_ticks = 0;
        config.modes.speedy_speed = 4.0;
        config.ranks.maximum_level = 0;
        let config = config.validated();
        assert_eq!(config.timer.interval_ticks, 1);
        assert_eq!(config.modes.speedy_speed, 1.0);
        assert_eq!(config.ranks.maximum_level, 1);
    }

    #[test]
    fn test_unlocked_rank_picks_highest_reached() {
        let ranks = RanksConfig {
            maximum_level: 100,
            unlocks: vec![
                RankUnlock { level: 10, rank: "Pro".into() },
                RankUnlock { level: 1, rank: "Rookie".into() },
                RankUnlock { level: 50, rank: "Master".into() },
            ],
        };
        assert_eq!(ranks.unlocked_rank(0), None);
        assert_eq!(ranks.unlocked_rank(10), Some("Pro"));
        assert_eq!(ranks.unlocked_rank(49), Some("Pro"));
        assert_eq!(ranks.unlocked_rank(75), Some("Master"));
    }

    #[test]
    fn test_rocket_force_inverts() {
        let modes = ModesConfig {
            rockets_invert: true,
            ..Default::default()
        };
        assert_eq!(modes.rocket_force(), -1.5);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json_fills_missing_sections() {
        let json = r#"{
            "on_finish": { "enforce_completion": false, "broadcast": "GLOBAL" },
            "timer": { "interval_ticks": 0 }
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert!(!config.on_finish.enforce_completion);
        assert_eq!(config.on_finish.broadcast, BroadcastScope::Global);
        assert!(config.on_finish.enable_prizes, "unset keys keep defaults");
        assert_eq!(config.timer.interval_ticks, 1);
        assert_eq!(config.on_leave, LeaveConfig::default());
    }
}
