//! Work the engine schedules for a later tick.
//!
//! A continuation is plain data. It holds the player id and whatever it
//! needs to finish its job, and it re-checks that the player is still
//! around before touching anything.

use std::sync::Arc;
use std::time::Duration;

use parkforge_course::{Course, CourseRegistry, PlayerId};
use parkforge_session::ProfileStore;
use tracing::debug;

use crate::{Host, JoinPolicy, Leaderboard, ProgressionEngine};

/// A finish waiting for its rewards, teleport and leaderboard submission.
#[derive(Debug, Clone)]
pub struct FinishRecord {
    pub player: PlayerId,
    pub course: Arc<Course>,
    pub elapsed: Duration,
    pub deaths: u32,
}

#[derive(Debug, Clone)]
pub enum Continuation {
    FinishRewards(FinishRecord),
    /// Join a linked course after finishing the previous one.
    JoinCourse { player: PlayerId, course: String },
}

impl Continuation {
    pub(crate) fn finish_rewards(
        player: PlayerId,
        course: Arc<Course>,
        elapsed: Duration,
        deaths: u32,
    ) -> Self {
        Self::FinishRewards(FinishRecord {
            player,
            course,
            elapsed,
            deaths,
        })
    }

    pub fn player(&self) -> PlayerId {
        match self {
            Self::FinishRewards(record) => record.player,
            Self::JoinCourse { player, .. } => *player,
        }
    }
}

impl<R, S, L, H> ProgressionEngine<R, S, L, H>
where
    R: CourseRegistry,
    S: ProfileStore,
    L: Leaderboard,
    H: Host,
{
    pub(crate) fn run_continuation(&mut self, task: Continuation) {
        match task {
            Continuation::FinishRewards(record) => self.finish_rewards(record),
            Continuation::JoinCourse { player, course } => {
                if !self.host.is_online(player) {
                    debug!(%player, %course, "player offline, linked join skipped");
                    return;
                }
                // The join already told the player why it failed.
                if let Err(err) = self.join(player, &course, JoinPolicy::Announced) {
                    debug!(%player, %course, %err, "linked course join failed");
                }
            }
        }
    }
}
