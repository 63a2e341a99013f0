//! The live course timer.
//!
//! Once per `timer.interval_ticks` every player with a running clock gets a
//! tick sound, the action bar time and a scoreboard update. On courses with
//! a time limit the clock counts down, and reaching zero removes the player.

use parkforge_course::CourseRegistry;
use parkforge_session::{ProfileStore, Session};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    Channel, Host, JoinPolicy, Leaderboard, Notice, ProgressionEngine, ScoreboardUpdate, Sound,
};

/// One reading of a session's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveTime {
    /// Seconds left on a countdown, seconds elapsed otherwise.
    pub seconds: i64,
    pub countdown: bool,
}

impl LiveTime {
    pub fn of(session: &Session, now: Instant) -> Self {
        Self {
            seconds: session.live_seconds(now),
            countdown: session.course().has_max_time(),
        }
    }

    /// The last five seconds and the ten-second mark are highlighted.
    pub fn is_urgent(&self) -> bool {
        self.countdown && (self.seconds <= 5 || self.seconds == 10)
    }

    pub fn is_expired(&self) -> bool {
        self.countdown && self.seconds <= 0
    }
}

impl<R, S, L, H> ProgressionEngine<R, S, L, H>
where
    R: CourseRegistry,
    S: ProfileStore,
    L: Leaderboard,
    H: Host,
{
    pub(crate) fn run_live_timer(&mut self) {
        let now = Instant::now();
        for player in self.sessions.active_players() {
            let Some(session) = self.sessions.get(player) else {
                continue;
            };
            if !session.is_timer_started() || !self.host.is_online(player) {
                continue;
            }
            let time = LiveTime::of(session, now);
            let max_secs = session.course().settings.max_time_secs.unwrap_or_default();

            let sound = if time.countdown {
                Sound::SecondDecrement
            } else {
                Sound::SecondIncrement
            };
            self.host.play_sound(player, sound);
            if self.config.on_course.display_live_time {
                self.host.notify(
                    player,
                    Channel::ActionBar,
                    Notice::LiveTimer {
                        seconds: time.seconds,
                        urgent: time.is_urgent(),
                    },
                );
            }
            self.host.scoreboard(
                player,
                ScoreboardUpdate::Timer {
                    seconds: time.seconds,
                },
            );

            if time.is_expired() {
                info!(%player, max_secs, "course time limit reached");
                self.host
                    .notify(player, Channel::Chat, Notice::MaxTime { max_secs });
                if let Err(err) = self.leave_with(player, JoinPolicy::Announced, true) {
                    warn!(%player, %err, "could not remove player after time limit");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parkforge_course::{Course, Location, PlayerId};

    use super::*;

    fn session(max_time_secs: Option<u64>) -> Session {
        let mut course = Course::new("a", Location::new("w", 0.0, 0.0, 0.0));
        course.settings.max_time_secs = max_time_secs;
        Session::new(PlayerId(1), Arc::new(course))
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_up_without_limit() {
        let mut s = session(None);
        s.start_timer(Instant::now());
        tokio::time::advance(Duration::from_secs(12)).await;

        let time = LiveTime::of(&s, Instant::now());
        assert_eq!(time, LiveTime { seconds: 12, countdown: false });
        assert!(!time.is_urgent());
        assert!(!time.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_with_limit() {
        let mut s = session(Some(30));
        s.start_timer(Instant::now());
        tokio::time::advance(Duration::from_secs(20)).await;

        let time = LiveTime::of(&s, Instant::now());
        assert_eq!(time.seconds, 10);
        assert!(time.countdown);
        assert!(time.is_urgent(), "ten seconds left is highlighted");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!LiveTime::of(&s, Instant::now()).is_urgent());

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(LiveTime::of(&s, Instant::now()).is_expired());
    }

    #[test]
    fn test_urgency_needs_a_countdown() {
        let time = LiveTime { seconds: 3, countdown: false };
        assert!(!time.is_urgent());
        let time = LiveTime { seconds: 3, countdown: true };
        assert!(time.is_urgent());
    }
}
