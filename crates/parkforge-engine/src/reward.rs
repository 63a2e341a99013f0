//! What happens after a finish: prizes, levels, the trip home and the
//! leaderboard.

use std::time::{Duration, SystemTime};

use parkforge_course::{Course, CourseRegistry, CourseRewards, PlayerId};
use parkforge_session::{Bypass, Cooldown, ProfileStore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::deferred::{Continuation, FinishRecord};
use crate::{
    Channel, CourseEvent, Host, Leaderboard, Notice, ProgressionEngine, ScoreboardUpdate,
    TimeResult,
};

/// The parkour level a player ends up on after finishing a course.
///
/// A course `level` raises players below it up to it; a `level_increase`
/// adds to the current level instead and wins if both are set. The result
/// never exceeds `maximum`.
pub fn level_reward(current: u32, rewards: &CourseRewards, maximum: u32) -> u32 {
    let mut level = current;
    if let Some(target) = rewards.level.filter(|target| *target > current) {
        level = target;
    }
    if let Some(increase) = rewards.level_increase.filter(|inc| *inc > 0) {
        level = current.saturating_add(increase);
    }
    level.min(maximum)
}

impl<R, S, L, H> ProgressionEngine<R, S, L, H>
where
    R: CourseRegistry,
    S: ProfileStore,
    L: Leaderboard,
    H: Host,
{
    pub(crate) fn finish_rewards(&mut self, record: FinishRecord) {
        let player = record.player;
        if !self.host.is_online(player) || !self.store.has_profile(player) {
            debug!(%player, course = %record.course.name, "player gone, finish rewards skipped");
            return;
        }

        // Already on another course: its session owns the inventory,
        // scoreboard and position now.
        let playing = self.sessions.is_active(player);
        if playing {
            debug!(%player, course = %record.course.name, "player rejoined, finish routing skipped");
        } else {
            self.restore_saved_state(player);
        }
        self.reward_prize(&record);
        if !playing {
            self.host.scoreboard(player, ScoreboardUpdate::Remove);
            if self.config.on_finish.teleport_away {
                self.route_after_finish(player, &record.course);
            }
        }
        self.submit_time(&record);
    }

    fn reward_prize(&mut self, record: &FinishRecord) {
        if !self.config.on_finish.enable_prizes {
            return;
        }
        let player = record.player;
        let course = &record.course;

        if course.rewards.reward_once && self.leaderboard.has_player_time(player, &course.name) {
            debug!(%player, course = %course.name, "course rewards once, no prize");
            self.events.emit(CourseEvent::NoPrize {
                player,
                course: course.name.clone(),
            });
            return;
        }

        if let Some(delay) = course.rewards.reward_delay_secs.filter(|d| *d > 0) {
            let key = (player, course.name.to_lowercase());
            let now = Instant::now();
            if !self.prize_cooldowns.contains(&key) {
                self.seed_prize_cooldown(&key, now);
            }
            let check = self.prize_cooldowns.check(
                &key,
                Duration::from_secs(delay),
                Bypass::None,
                now,
            );
            if let Cooldown::Denied { remaining } = check {
                self.host
                    .notify(player, Channel::Chat, Notice::PrizeCooldown { remaining });
                return;
            }
            self.store.update_profile(player, |profile| {
                profile.last_rewarded.insert(key.1, SystemTime::now());
            });
        }

        let prize = course
            .rewards
            .prize
            .as_ref()
            .or(self.config.on_finish.default_prize.as_ref());
        if let Some(item) = prize.filter(|item| item.is_giveable()) {
            self.host.give_item(player, item);
        }

        let xp = match course.rewards.xp {
            0 => self.config.on_finish.default_xp,
            xp => xp,
        };
        if xp > 0 {
            self.host.give_xp(player, xp);
        }

        self.reward_level(player, course);

        let parkoins = course.rewards.parkoins;
        if parkoins > 0.0 {
            let mut profile = self.store.profile(player);
            profile.parkoins += parkoins;
            let total = profile.parkoins;
            self.store.save_profile(player, profile);
            self.host.notify(
                player,
                Channel::Chat,
                Notice::RewardParkoins {
                    amount: parkoins,
                    total,
                },
            );
        }

        self.host.give_economy_prize(player, &course.name);
        self.events.emit(CourseEvent::Prize {
            player,
            course: course.name.clone(),
        });
    }

    /// Carries the last prize time over from the profile store, so a
    /// restarted engine keeps enforcing the reward delay.
    fn seed_prize_cooldown(&mut self, key: &(PlayerId, String), now: Instant) {
        let Some(rewarded_at) = self.store.profile(key.0).last_rewarded.get(&key.1).copied() else {
            return;
        };
        // A timestamp from the future counts as just now.
        let since = SystemTime::now()
            .duration_since(rewarded_at)
            .unwrap_or_default();
        if let Some(at) = now.checked_sub(since) {
            self.prize_cooldowns.record(key.clone(), at);
        }
    }

    fn reward_level(&mut self, player: PlayerId, course: &Course) {
        let mut profile = self.store.profile(player);
        let current = profile.level;
        let level = level_reward(current, &course.rewards, self.config.ranks.maximum_level);
        if level <= current {
            return;
        }

        if let Some(rank) = self.config.ranks.unlocked_rank(level) {
            if profile.rank.as_deref() != Some(rank) {
                profile.rank = Some(rank.to_string());
                self.host.notify(
                    player,
                    Channel::Chat,
                    Notice::RewardRank {
                        rank: rank.to_string(),
                    },
                );
                self.events.emit(CourseEvent::RankChanged {
                    player,
                    course: course.name.clone(),
                    rank: rank.to_string(),
                });
            }
        }

        profile.level = level;
        self.store.save_profile(player, profile);
        self.host.notify(
            player,
            Channel::Chat,
            Notice::RewardLevel {
                level,
                course: course.display_name().to_string(),
            },
        );
        self.events.emit(CourseEvent::LevelChanged {
            player,
            course: course.name.clone(),
            level,
        });
        info!(%player, course = %course.name, from = current, to = level, "parkour level raised");
    }

    /// Linked course, then linked lobby, then the join location, then the
    /// default lobby.
    fn route_after_finish(&mut self, player: PlayerId, course: &Course) {
        if let Some(linked) = &course.settings.linked_course {
            if self.courses.course_exists(linked) {
                self.deferred.schedule_in(
                    self.current_tick,
                    0,
                    Continuation::JoinCourse {
                        player,
                        course: linked.clone(),
                    },
                );
                return;
            }
            warn!(%player, course = %course.name, %linked, "linked course does not exist");
        }

        if let Some(lobby) = course.settings.linked_lobby.as_deref() {
            if self.host.join_lobby(player, Some(lobby)) {
                return;
            }
            warn!(%player, course = %course.name, %lobby, "linked lobby does not exist");
        } else if self.config.on_join.teleport_to_join_location {
            if let Some(at) = self.store.profile(player).join_location {
                self.host.teleport(player, &at);
                self.host.notify(player, Channel::Chat, Notice::JoinLocation);
                return;
            }
        }

        self.host.join_lobby(player, None);
    }

    fn submit_time(&mut self, record: &FinishRecord) {
        let FinishRecord {
            player,
            course,
            elapsed,
            deaths,
        } = record;

        let result = self.leaderboard.time_result(*player, &course.name, *elapsed);
        self.leaderboard.insert_or_update_time(
            &course.name,
            *player,
            *elapsed,
            *deaths,
            result.is_record(),
        );
        if !result.is_record() {
            return;
        }

        self.events.emit(CourseEvent::CourseRecord {
            player: *player,
            course: course.name.clone(),
            elapsed: *elapsed,
            result,
        });
        if self.config.on_finish.display_new_records {
            let notice = match result {
                TimeResult::GlobalBest => Notice::CourseRecord { elapsed: *elapsed },
                _ => Notice::BestTime { elapsed: *elapsed },
            };
            self.host.notify(*player, Channel::Title, notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewards(level: Option<u32>, level_increase: Option<u32>) -> CourseRewards {
        CourseRewards {
            level,
            level_increase,
            ..Default::default()
        }
    }

    #[test]
    fn test_level_raises_up_to_course_level() {
        assert_eq!(level_reward(2, &rewards(Some(5), None), 100), 5);
        assert_eq!(level_reward(7, &rewards(Some(5), None), 100), 7);
    }

    #[test]
    fn test_level_increase_wins_over_level() {
        assert_eq!(level_reward(2, &rewards(Some(5), Some(1)), 100), 3);
    }

    #[test]
    fn test_level_capped_at_maximum() {
        assert_eq!(level_reward(98, &rewards(None, Some(5)), 100), 100);
        assert_eq!(level_reward(u32::MAX, &rewards(None, Some(5)), 100), 100);
    }

    #[test]
    fn test_no_level_rewards_keeps_level() {
        assert_eq!(level_reward(4, &CourseRewards::default(), 100), 4);
    }
}
