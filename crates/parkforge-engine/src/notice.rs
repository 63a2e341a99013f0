//! Player-facing messages.
//!
//! The engine never builds strings for the host. It hands over a typed
//! [`Notice`] and the host decides how to render it (translation files,
//! colours, placeholders). The `Display` impl is an English fallback that
//! the demo and tests use.

use std::fmt;
use std::time::Duration;

use parkforge_course::PlayerId;
use parkforge_session::{format_clock, format_duration};

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    // -- Rejections ---------------------------------------------------------
    CourseNotFound(String),
    JoinDenied(String),
    NotOnCourse,
    AlreadyPlaying(String),
    InvalidCheckpoint { requested: usize, max: usize },
    Cooldown { remaining: Duration },
    ManualCheckpointUnavailable,
    /// Finished without touching every checkpoint.
    Cheating { checkpoints: usize },

    // -- Join / leave -------------------------------------------------------
    Joined { course: String },
    /// Subtitle shown on join when the course has limits.
    JoinLimits {
        lives: Option<u32>,
        max_time_secs: Option<u64>,
    },
    Resumed { course: String },
    AlreadyCompleted { course: String },
    JoinBroadcast { player: PlayerId, course: String },
    Left { course: String },
    Restarting,
    TimerStarted,

    // -- Progress -----------------------------------------------------------
    Checkpoint { current: usize, total: usize },
    AllCheckpoints { total: usize },
    ManualCheckpointSet,
    LifeCount { remaining: u32 },
    Died { checkpoint: usize, time_reset: bool },
    MaxDeaths { max: u32 },
    MaxTime { max_secs: u64 },
    LiveTimer { seconds: i64, urgent: bool },

    // -- Modes --------------------------------------------------------------
    FreedomJoin,
    RocketsJoin,
    /// Course-defined text shown when potion effects are applied.
    PotionJoin(String),

    // -- Finish and rewards -------------------------------------------------
    Finished { course: String },
    FinishStats { elapsed: Duration, deaths: u32 },
    FinishBroadcast {
        player: PlayerId,
        course: String,
        elapsed: Duration,
        deaths: u32,
    },
    CourseRecord { elapsed: Duration },
    BestTime { elapsed: Duration },
    PrizeCooldown { remaining: Duration },
    RewardParkoins { amount: f64, total: f64 },
    RewardLevel { level: u32, course: String },
    RewardRank { rank: String },
    JoinLocation,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CourseNotFound(name) => write!(f, "Course '{name}' does not exist"),
            Self::JoinDenied(reason) => write!(f, "You can't join: {reason}"),
            Self::NotOnCourse => f.write_str("You are not on a course"),
            Self::AlreadyPlaying(course) => write!(f, "You are already playing {course}"),
            Self::InvalidCheckpoint { requested, max } => {
                write!(f, "Invalid checkpoint {requested}, the course has {max}")
            }
            Self::Cooldown { remaining } => {
                write!(f, "Please wait {}s", remaining.as_secs().max(1))
            }
            Self::ManualCheckpointUnavailable => {
                f.write_str("You are currently unable to set a manual checkpoint")
            }
            Self::Cheating { checkpoints } => {
                write!(f, "You didn't reach all {checkpoints} checkpoints")
            }
            Self::Joined { course } => write!(f, "Joining {course}"),
            Self::JoinLimits {
                lives,
                max_time_secs,
            } => match (lives, max_time_secs) {
                (Some(lives), Some(secs)) => {
                    write!(f, "You have {lives} lives and {}", format_clock(*secs as i64))
                }
                (Some(lives), None) => write!(f, "You have {lives} lives"),
                (None, Some(secs)) => write!(f, "You have {}", format_clock(*secs as i64)),
                (None, None) => Ok(()),
            },
            Self::Resumed { course } => write!(f, "Continuing {course}"),
            Self::AlreadyCompleted { course } => write!(f, "You have already completed {course}"),
            Self::JoinBroadcast { player, course } => write!(f, "{player} joined {course}"),
            Self::Left { course } => write!(f, "You left {course}"),
            Self::Restarting => f.write_str("Restarting course"),
            Self::TimerStarted => f.write_str("Timer started"),
            Self::Checkpoint { current, total } => write!(f, "Checkpoint set to {current}/{total}"),
            Self::AllCheckpoints { total } => {
                write!(f, "All {total} checkpoints achieved, head to the finish")
            }
            Self::ManualCheckpointSet => f.write_str("Checkpoint saved"),
            Self::LifeCount { remaining } => write!(f, "{remaining} lives remaining"),
            Self::Died {
                checkpoint,
                time_reset,
            } => match (checkpoint, time_reset) {
                (0, true) => f.write_str("You died, going back to the start. Time reset"),
                (0, false) => f.write_str("You died, going back to the start"),
                (checkpoint, _) => write!(f, "You died, going back to checkpoint {checkpoint}"),
            },
            Self::MaxDeaths { max } => write!(f, "You reached the maximum of {max} deaths"),
            Self::MaxTime { max_secs } => {
                write!(f, "You ran out of time ({})", format_clock(*max_secs as i64))
            }
            Self::LiveTimer { seconds, urgent } => {
                let clock = format_clock(*seconds);
                if *urgent {
                    write!(f, "!{clock}")
                } else {
                    f.write_str(&clock)
                }
            }
            Self::FreedomJoin => f.write_str("Freedom mode: save and return to your own checkpoints"),
            Self::RocketsJoin => f.write_str("Rockets mode: use your rocket to launch"),
            Self::PotionJoin(text) => f.write_str(text),
            Self::Finished { course } => write!(f, "Finished {course}"),
            Self::FinishStats { elapsed, deaths } => {
                write!(f, "{} with {deaths} deaths", format_duration(*elapsed))
            }
            Self::FinishBroadcast {
                player,
                course,
                elapsed,
                deaths,
            } => write!(
                f,
                "{player} finished {course} in {} with {deaths} deaths",
                format_duration(*elapsed)
            ),
            Self::CourseRecord { elapsed } => {
                write!(f, "New course record: {}", format_duration(*elapsed))
            }
            Self::BestTime { elapsed } => write!(f, "New personal best: {}", format_duration(*elapsed)),
            Self::PrizeCooldown { remaining } => write!(
                f,
                "You have to wait {} before receiving this prize again",
                format_clock(remaining.as_secs() as i64)
            ),
            Self::RewardParkoins { amount, total } => {
                write!(f, "{amount} Parkoins rewarded, you now have {total}")
            }
            Self::RewardLevel { level, course } => {
                write!(f, "Your parkour level is now {level} for completing {course}")
            }
            Self::RewardRank { rank } => write!(f, "Your parkour rank is now {rank}"),
            Self::JoinLocation => f.write_str("You have been returned to where you joined"),
        }
    }
}
