//! The progression engine: every transition a player can make on a course.
//!
//! ```text
//! NotPlaying ──join──→ Joined ──checkpoint──→ Checkpointing ──last──→ AllCheckpoints ──finish──→ Finished
//!      ↑                  │ ↺ die                 │ ↺ die                  │
//!      └──────────────────┴───── leave / death limit / time limit ───────┘
//! ```
//!
//! The engine is a plain struct owned by one task. It never locks and never
//! awaits; side effects go straight to the [`Host`], and anything that has
//! to happen later is pushed onto a tick-keyed queue and run from
//! [`on_tick`](ProgressionEngine::on_tick).
//!
//! A failed transition notifies the player, returns `Err`, and leaves the
//! session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use parkforge_course::{Course, CourseRegistry, ParkourMode, PlayerId};
use parkforge_session::{
    Bypass, Cooldown, CooldownTracker, JoinKind, ProfileStore, SessionError, SessionManager,
    SessionView,
};
use parkforge_tick::TaskQueue;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::deferred::Continuation;
use crate::{
    Channel, CheckpointOutcome, CourseEvent, DeathOutcome, EngineConfig, EngineError, EventBus,
    FinishOutcome, Host, JoinPolicy, Leaderboard, LeaveOutcome, Limit, ModeHooks, Notice,
    ParkourTool, RestartKind, ScoreboardUpdate, Sound,
};

/// Tools every player gets on join, whatever the mode.
const COURSE_TOOLS: [ParkourTool; 3] = [
    ParkourTool::LastCheckpoint,
    ParkourTool::Leave,
    ParkourTool::Restart,
];

/// Owns all live sessions and drives them through the course lifecycle.
///
/// Generic over its four collaborators so hosts plug in their own course
/// registry, profile store, leaderboard and world.
pub struct ProgressionEngine<R, S, L, H> {
    pub(crate) config: EngineConfig,
    pub(crate) courses: R,
    pub(crate) store: S,
    pub(crate) leaderboard: L,
    pub(crate) host: H,
    pub(crate) sessions: SessionManager,
    pub(crate) events: EventBus,
    /// Tool and rocket rate limiting, one window per player.
    pub(crate) action_cooldowns: CooldownTracker<PlayerId>,
    /// Prize re-delivery, keyed by player and lowercase course name.
    pub(crate) prize_cooldowns: CooldownTracker<(PlayerId, String)>,
    pub(crate) deferred: TaskQueue<Continuation>,
    pub(crate) current_tick: u64,
}

impl<R, S, L, H> ProgressionEngine<R, S, L, H>
where
    R: CourseRegistry,
    S: ProfileStore,
    L: Leaderboard,
    H: Host,
{
    pub fn new(config: EngineConfig, courses: R, store: S, leaderboard: L, host: H) -> Self {
        Self {
            config: config.validated(),
            courses,
            store,
            leaderboard,
            host,
            sessions: SessionManager::new(),
            events: EventBus::default(),
            action_cooldowns: CooldownTracker::new("action"),
            prize_cooldowns: CooldownTracker::new("prize"),
            deferred: TaskQueue::new(),
            current_tick: 0,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn courses(&self) -> &R {
        &self.courses
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn leaderboard(&self) -> &L {
        &self.leaderboard
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CourseEvent> {
        self.events.subscribe()
    }

    pub fn is_playing(&self, player: PlayerId) -> bool {
        self.sessions.is_active(player)
    }

    pub fn session_view(&self, player: PlayerId) -> Option<SessionView> {
        self.sessions.get(player).map(|s| s.view(Instant::now()))
    }

    /// Deferred continuations not yet run.
    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    // -- Join -----------------------------------------------------------------

    /// Joins `player` to the named course, resuming saved progress when the
    /// course allows it.
    ///
    /// # Errors
    /// - [`EngineError::CourseNotFound`] for an unknown course
    /// - [`EngineError::JoinDenied`] when an eligibility check refuses
    /// - [`SessionError::AlreadyPlaying`] when already on this course
    pub fn join(
        &mut self,
        player: PlayerId,
        course_name: &str,
        policy: JoinPolicy,
    ) -> Result<JoinKind, EngineError> {
        let Some(course) = self.courses.find_course(course_name) else {
            self.reject(player, Notice::CourseNotFound(course_name.to_string()));
            return Err(EngineError::CourseNotFound(course_name.to_string()));
        };
        self.check_eligibility(player, &course)?;
        self.join_course(player, course, policy)
    }

    fn check_eligibility(&mut self, player: PlayerId, course: &Course) -> Result<(), EngineError> {
        let denial = if !course.settings.ready && !self.host.is_privileged(player) {
            Some("the course is not ready".to_string())
        } else if let Some(min) = course
            .settings
            .min_level
            .filter(|min| self.store.profile(player).level < *min)
        {
            Some(format!("requires parkour level {min}"))
        } else if course
            .settings
            .max_players
            .is_some_and(|max| self.sessions.players_on(&course.name) >= max)
        {
            Some("the course is full".to_string())
        } else {
            self.host.can_join(player, course).err()
        };

        match denial {
            Some(reason) => {
                self.reject(player, Notice::JoinDenied(reason.clone()));
                Err(EngineError::JoinDenied(reason))
            }
            None => Ok(()),
        }
    }

    /// The join sequence proper, without lookup or eligibility checks.
    pub(crate) fn join_course(
        &mut self,
        player: PlayerId,
        course: Arc<Course>,
        policy: JoinPolicy,
    ) -> Result<JoinKind, EngineError> {
        if let Some(current) = self.sessions.get(player) {
            if current.course_name().eq_ignore_ascii_case(&course.name) {
                self.reject(player, Notice::AlreadyPlaying(course.display_name().to_string()));
                return Err(SessionError::AlreadyPlaying(player, course.name.clone()).into());
            }
            self.leave_with(player, JoinPolicy::Silent, false)?;
        }

        let now = Instant::now();
        let mut profile = self.store.profile(player);
        if !policy.is_silent() && self.config.on_join.teleport_to_join_location {
            profile.join_location = self.host.location(player);
        }
        if profile.saved_state.is_none() {
            profile.saved_state = Some(self.host.capture_state(player));
        }
        profile.last_played_course = Some(course.name.clone());
        profile.existing_session_course = Some(course.name.clone());
        let already_completed = profile.has_completed(&course.name);
        self.store.save_profile(player, profile);

        self.host.prepare_player(player);
        if self.config.on_die.set_xp_bar_to_death_count {
            self.host.set_xp_level(player, 0);
        }
        if !course.mode.controls_food() {
            if let Some(food) = self.config.on_join.fill_food {
                self.host.set_food_level(player, food);
            }
        }
        for tool in COURSE_TOOLS {
            self.host.give_tool(player, tool);
        }
        if self.config.on_join.teleport_player {
            self.host.teleport(player, &course.start);
        }
        self.host.play_sound(player, Sound::JoinCourse);

        let saved = self.store.saved_session(player, &course.name);
        let (session, kind) = self
            .sessions
            .join(player, Arc::clone(&course), saved, now)?;

        if kind == JoinKind::Resumed {
            self.host.teleport(player, session.respawn_location());
            self.host.notify(
                player,
                Channel::Chat,
                Notice::Resumed {
                    course: course.display_name().to_string(),
                },
            );
        }
        if !self.config.on_join.treat_first_checkpoint_as_start {
            session.start_timer(now);
        }

        if !policy.is_silent() {
            self.announce_join(player, &course, already_completed);
        }

        course
            .mode
            .on_enter(player, &course, &self.config.modes, &mut self.host);
        self.host.scoreboard(
            player,
            ScoreboardUpdate::Show {
                course: course.display_name().to_string(),
                checkpoints: course.checkpoint_count(),
                max_deaths: course.settings.max_deaths,
            },
        );

        self.events.emit(CourseEvent::Joined {
            player,
            course: course.name.clone(),
            kind,
            policy,
        });
        info!(%player, course = %course.name, ?kind, ?policy, "player joined course");
        Ok(kind)
    }

    fn announce_join(&mut self, player: PlayerId, course: &Course, already_completed: bool) {
        let display = course.display_name().to_string();
        self.host.notify(
            player,
            Channel::Title,
            Notice::Joined {
                course: display.clone(),
            },
        );
        if course.has_max_deaths() || course.has_max_time() {
            self.host.notify(
                player,
                Channel::Subtitle,
                Notice::JoinLimits {
                    lives: course.settings.max_deaths,
                    max_time_secs: course.settings.max_time_secs,
                },
            );
        }
        if already_completed && self.config.on_finish.completed_join_message {
            self.host.notify(
                player,
                Channel::Chat,
                Notice::AlreadyCompleted {
                    course: display.clone(),
                },
            );
        }
        let scope = self.config.on_join.broadcast;
        if scope != crate::BroadcastScope::None {
            self.host
                .broadcast(scope, player, Notice::JoinBroadcast { player, course: display });
        }
    }

    // -- Leave ----------------------------------------------------------------

    /// Leaves the current course, saving progress for later unless the
    /// course or config says otherwise.
    ///
    /// # Errors
    /// [`SessionError::NotPlaying`] if the player has no session.
    pub fn leave(&mut self, player: PlayerId) -> Result<LeaveOutcome, EngineError> {
        self.leave_with(player, JoinPolicy::Announced, false)
    }

    /// Leave with an explicit policy. `force_delete` discards progress
    /// whatever the course settings.
    pub fn leave_with(
        &mut self,
        player: PlayerId,
        policy: JoinPolicy,
        force_delete: bool,
    ) -> Result<LeaveOutcome, EngineError> {
        let Some(mut session) = self.sessions.remove(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };
        let course = Arc::clone(session.course());

        // Out of time counts even if the live timer hasn't caught it yet.
        let out_of_time = session
            .remaining_secs(Instant::now())
            .is_some_and(|left| left <= 0);
        if force_delete
            || out_of_time
            || self.config.on_leave.destroy_progress
            || !course.settings.resumable
        {
            session.mark_for_deletion();
        }

        course.mode.on_exit(player, &self.config.modes, &mut self.host);

        let outcome = if session.is_marked_for_deletion() {
            self.store.delete_session(player, &course.name);
            LeaveOutcome::Deleted
        } else {
            self.store
                .save_session(player, session.snapshot(Instant::now()));
            LeaveOutcome::Saved
        };

        self.host.prepare_player(player);
        self.restore_saved_state(player);
        let mut profile = self.store.profile(player);
        profile.existing_session_course = None;
        let join_location = profile.join_location.clone();
        self.store.save_profile(player, profile);

        if !policy.is_silent() {
            self.host.play_sound(player, Sound::CourseFailed);
            self.host.notify(
                player,
                Channel::Subtitle,
                Notice::Left {
                    course: course.display_name().to_string(),
                },
            );
            if self.config.on_leave.teleport_away {
                match join_location.filter(|_| self.config.on_join.teleport_to_join_location) {
                    Some(at) => self.host.teleport(player, &at),
                    None => {
                        self.host.join_lobby(player, None);
                    }
                }
            }
        }
        self.host.scoreboard(player, ScoreboardUpdate::Remove);

        self.events.emit(CourseEvent::Left {
            player,
            course: course.name.clone(),
            deaths: session.deaths(),
            deleted: outcome == LeaveOutcome::Deleted,
            policy,
        });
        info!(%player, course = %course.name, ?outcome, ?policy, "player left course");
        Ok(outcome)
    }

    /// Hands the pre-join snapshot back to the host and forgets it.
    pub(crate) fn restore_saved_state(&mut self, player: PlayerId) {
        let mut profile = self.store.profile(player);
        if let Some(state) = profile.saved_state.take() {
            self.host.restore_state(player, &state);
            self.store.save_profile(player, profile);
        }
    }

    // -- Checkpoints ----------------------------------------------------------

    /// An in-world checkpoint trigger. Only the next checkpoint counts;
    /// repeats and skips are ignored.
    ///
    /// # Errors
    /// [`SessionError::NotPlaying`] if the player has no session.
    pub fn achieve_checkpoint(
        &mut self,
        player: PlayerId,
        checkpoint: usize,
    ) -> Result<CheckpointOutcome, EngineError> {
        let Some(session) = self.sessions.get(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };

        let current = session.current_checkpoint();
        if session.has_achieved_all_checkpoints() || checkpoint != current + 1 {
            debug!(%player, current, checkpoint, "checkpoint trigger ignored");
            return Ok(CheckpointOutcome::Ignored);
        }
        self.apply_checkpoint(player, checkpoint)
    }

    /// Administrative checkpoint set: any index up to the checkpoint count,
    /// forwards or backwards.
    ///
    /// # Errors
    /// [`SessionError::InvalidCheckpoint`] past the last checkpoint,
    /// [`SessionError::NotPlaying`] without a session.
    pub fn set_checkpoint(
        &mut self,
        player: PlayerId,
        checkpoint: usize,
    ) -> Result<CheckpointOutcome, EngineError> {
        let Some(session) = self.sessions.get(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };

        let max = session.checkpoint_count();
        if checkpoint > max {
            self.reject(
                player,
                Notice::InvalidCheckpoint {
                    requested: checkpoint,
                    max,
                },
            );
            return Err(SessionError::InvalidCheckpoint {
                requested: checkpoint,
                max,
            }
            .into());
        }
        self.apply_checkpoint(player, checkpoint)
    }

    fn apply_checkpoint(
        &mut self,
        player: PlayerId,
        checkpoint: usize,
    ) -> Result<CheckpointOutcome, EngineError> {
        let session = self.sessions.require_mut(player)?;
        session.set_checkpoint(checkpoint)?;
        let all = session.has_achieved_all_checkpoints();
        let course = Arc::clone(session.course());
        let total = course.checkpoint_count();

        if all && self.config.on_course.treat_last_checkpoint_as_finish {
            info!(%player, course = %course.name, checkpoint, "last checkpoint finishes course");
            return match self.finish(player)? {
                FinishOutcome::Finished { .. } => Ok(CheckpointOutcome::Finished),
                _ => Ok(CheckpointOutcome::AllCheckpoints),
            };
        }

        self.host.play_sound(player, Sound::CheckpointAchieved);
        self.host.scoreboard(
            player,
            ScoreboardUpdate::Checkpoint {
                current: checkpoint,
                total,
            },
        );
        let notice = if all {
            Notice::AllCheckpoints { total }
        } else {
            Notice::Checkpoint {
                current: checkpoint,
                total,
            }
        };
        self.host.notify(player, Channel::Subtitle, notice);

        self.events.emit(CourseEvent::CheckpointAchieved {
            player,
            course: course.name.clone(),
            checkpoint,
        });
        if all {
            self.events.emit(CourseEvent::AllCheckpoints {
                player,
                course: course.name.clone(),
            });
        }
        info!(%player, course = %course.name, checkpoint, total, "checkpoint achieved");

        Ok(if all {
            CheckpointOutcome::AllCheckpoints
        } else {
            CheckpointOutcome::Advanced(checkpoint)
        })
    }

    /// Stores the player's current position as their respawn point.
    /// Needs a course with manual checkpoints or FREEDOM mode.
    pub fn set_manual_checkpoint(&mut self, player: PlayerId) -> Result<(), EngineError> {
        let Some(session) = self.sessions.get_mut(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };

        let course = session.course();
        if !course.settings.manual_checkpoints && course.mode != ParkourMode::Freedom {
            self.host
                .notify(player, Channel::Chat, Notice::ManualCheckpointUnavailable);
            return Err(EngineError::ActionDenied(
                "manual checkpoints are disabled on this course".into(),
            ));
        }
        let Some(at) = self.host.location(player) else {
            return Err(EngineError::ActionDenied("player location unknown".into()));
        };

        debug!(%player, location = %at, "manual checkpoint set");
        session.set_freedom_location(Some(at));
        self.host
            .notify(player, Channel::Chat, Notice::ManualCheckpointSet);
        Ok(())
    }

    // -- Death ----------------------------------------------------------------

    /// The player died on the course.
    ///
    /// A death while already at the course's death limit removes the player
    /// instead (the counter is not incremented past the limit).
    ///
    /// # Errors
    /// [`SessionError::NotPlaying`] if the player has no session.
    pub fn die(&mut self, player: PlayerId) -> Result<DeathOutcome, EngineError> {
        let Some(session) = self.sessions.get_mut(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };

        self.host.play_sound(player, Sound::PlayerDeath);

        if session.is_at_death_limit() {
            let max = session.course().settings.max_deaths.unwrap_or_default();
            info!(%player, course = %session.course_name(), max, "death limit reached");
            self.host
                .notify(player, Channel::Chat, Notice::MaxDeaths { max });
            self.leave_with(player, JoinPolicy::Announced, true)?;
            return Ok(DeathOutcome::Ejected);
        }

        let deaths = session.increase_death();
        let remaining = session.remaining_deaths();
        let checkpoint = session.current_checkpoint();
        let at_start = checkpoint == 0 && session.freedom_location().is_none();
        let time_reset = at_start && self.config.on_die.reset_progress_with_no_checkpoint;
        if time_reset {
            session.reset_timer(Instant::now());
        }
        let course = Arc::clone(session.course());

        if let Some(remaining) = remaining {
            self.host
                .notify(player, Channel::Subtitle, Notice::LifeCount { remaining });
        }
        self.host.teleport(player, session.respawn_location());
        self.host
            .scoreboard(player, ScoreboardUpdate::Deaths { deaths, remaining });
        self.host.notify(
            player,
            Channel::Chat,
            Notice::Died {
                checkpoint,
                time_reset,
            },
        );
        if self.config.on_die.set_xp_bar_to_death_count {
            self.host.set_xp_level(player, deaths);
        }
        self.host.prepare_player(player);
        course.mode.on_respawn(player, &course, &mut self.host);

        self.events.emit(CourseEvent::Died {
            player,
            course: course.name.clone(),
            deaths,
        });
        info!(%player, course = %course.name, deaths, checkpoint, "player died");
        Ok(DeathOutcome::Respawned { deaths })
    }

    // -- Finish ---------------------------------------------------------------

    /// Completes the course.
    ///
    /// Without a session this is a silent no-op, so a second finish is
    /// harmless. With completion enforced, finishing short of the last
    /// checkpoint counts as a death. Rewards, the teleport away, and the
    /// leaderboard submission run as a deferred continuation after
    /// `on_finish.teleport_delay_ticks`.
    ///
    /// # Errors
    /// [`EngineError::LimitExceeded`] if the time limit ran out before the
    /// live timer noticed; the player has been removed.
    pub fn finish(&mut self, player: PlayerId) -> Result<FinishOutcome, EngineError> {
        let Some(session) = self.sessions.get_mut(player) else {
            debug!(%player, "finish without a session ignored");
            return Ok(FinishOutcome::Ignored);
        };

        if self.config.on_finish.enforce_completion && !session.has_achieved_all_checkpoints() {
            let checkpoints = session.checkpoint_count();
            debug!(%player, current = session.current_checkpoint(), checkpoints, "incomplete finish");
            self.host
                .notify(player, Channel::Chat, Notice::Cheating { checkpoints });
            self.die(player)?;
            return Ok(FinishOutcome::Incomplete);
        }

        let now = Instant::now();
        if session.remaining_secs(now).is_some_and(|left| left <= 0) {
            let max_secs = session.course().settings.max_time_secs.unwrap_or_default();
            self.host
                .notify(player, Channel::Chat, Notice::MaxTime { max_secs });
            self.leave_with(player, JoinPolicy::Announced, true)?;
            return Err(EngineError::LimitExceeded(Limit::Time(max_secs)));
        }

        if !session.mark_finished(now) {
            return Ok(FinishOutcome::Ignored);
        }
        let elapsed = session.finished_elapsed().unwrap_or_default();
        let deaths = session.deaths();
        let course = Arc::clone(session.course());
        self.sessions.remove(player);

        self.host.play_sound(player, Sound::CourseFinished);
        self.host.prepare_player(player);
        self.announce_finish(player, &course, elapsed, deaths);
        course.mode.on_exit(player, &self.config.modes, &mut self.host);

        self.events.emit(CourseEvent::Finished {
            player,
            course: course.name.clone(),
            elapsed,
            deaths,
        });

        let mut profile = self.store.profile(player);
        if self.config.on_die.set_xp_bar_to_death_count {
            if let Some(state) = &profile.saved_state {
                self.host.set_xp_level(player, state.xp_level);
            }
        }
        profile.last_completed_course = Some(course.name.clone());
        profile.existing_session_course = None;
        profile.add_completed(&course.name);
        self.store.save_profile(player, profile);
        self.store.delete_session(player, &course.name);

        let task = self.deferred.schedule_in(
            self.current_tick,
            self.config.on_finish.teleport_delay_ticks,
            Continuation::finish_rewards(player, Arc::clone(&course), elapsed, deaths),
        );
        info!(
            %player,
            course = %course.name,
            elapsed_ms = elapsed.as_millis() as u64,
            deaths,
            %task,
            "player finished course"
        );
        Ok(FinishOutcome::Finished { elapsed, deaths })
    }

    fn announce_finish(&mut self, player: PlayerId, course: &Course, elapsed: Duration, deaths: u32) {
        if self.config.on_finish.display_stats {
            self.host.notify(
                player,
                Channel::Title,
                Notice::Finished {
                    course: course.display_name().to_string(),
                },
            );
            self.host
                .notify(player, Channel::Subtitle, Notice::FinishStats { elapsed, deaths });
        }

        // Unfinished courses don't get their times announced.
        let scope = self.config.on_finish.broadcast;
        if course.settings.ready && scope != crate::BroadcastScope::None {
            self.host.broadcast(
                scope,
                player,
                Notice::FinishBroadcast {
                    player,
                    course: course.display_name().to_string(),
                    elapsed,
                    deaths,
                },
            );
        }
    }

    // -- Restart --------------------------------------------------------------

    /// Back to the start. Full or soft according to `on_restart`.
    ///
    /// # Errors
    /// [`SessionError::NotPlaying`] if the player has no session.
    pub fn restart(&mut self, player: PlayerId) -> Result<RestartKind, EngineError> {
        let Some(session) = self.sessions.get_mut(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };

        let kind = if self.config.on_restart.full_restart {
            let course = Arc::clone(session.course());
            self.leave_with(player, JoinPolicy::Silent, false)?;
            self.store.delete_session(player, &course.name);
            self.join_course(player, Arc::clone(&course), JoinPolicy::Silent)?;
            if !self.config.on_join.teleport_player {
                self.host.teleport(player, &course.start);
            }
            RestartKind::Full
        } else {
            // Mode setup is still in place; only progress resets.
            session.reset_progress(Instant::now());
            session.set_freedom_location(None);
            let course = session.course();
            let show = ScoreboardUpdate::Show {
                course: course.display_name().to_string(),
                checkpoints: course.checkpoint_count(),
                max_deaths: course.settings.max_deaths,
            };
            self.host.prepare_player(player);
            self.host.teleport(player, session.respawn_location());
            self.host.scoreboard(player, show);
            RestartKind::Soft
        };

        self.host
            .notify(player, Channel::Subtitle, Notice::Restarting);
        info!(%player, ?kind, "player restarted course");
        Ok(kind)
    }

    // -- Timer trigger --------------------------------------------------------

    /// The start trigger for courses that don't time from the join.
    /// Returns `false` if the timer was already running.
    pub fn start_timer(&mut self, player: PlayerId) -> Result<bool, EngineError> {
        let Some(session) = self.sessions.get_mut(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };
        if session.is_timer_started() {
            return Ok(false);
        }
        session.start_timer(Instant::now());
        self.host
            .notify(player, Channel::ActionBar, Notice::TimerStarted);
        debug!(%player, "course timer started");
        Ok(true)
    }

    // -- Tools ----------------------------------------------------------------

    /// A course tool was used. Rate-limited per player; privileged players
    /// bypass the limit.
    ///
    /// # Errors
    /// [`SessionError::CooldownActive`] while the cooldown runs, plus
    /// whatever the tool's own transition returns.
    pub fn use_tool(&mut self, player: PlayerId, tool: ParkourTool) -> Result<(), EngineError> {
        let Some(session) = self.sessions.get(player) else {
            self.reject(player, Notice::NotOnCourse);
            return Err(SessionError::NotPlaying(player).into());
        };
        if tool == ParkourTool::Rockets && session.course().mode != ParkourMode::Rockets {
            return Err(EngineError::ActionDenied("rockets need a ROCKETS course".into()));
        }

        let window = match tool {
            ParkourTool::Rockets => self.config.modes.rockets_cooldown_secs,
            _ => self.config.on_course.tool_cooldown_secs,
        };
        let bypass = if self.host.is_privileged(player) {
            Bypass::Privileged
        } else {
            Bypass::None
        };
        let check = self.action_cooldowns.check(
            &player,
            Duration::from_secs(window),
            bypass,
            Instant::now(),
        );
        if let Cooldown::Denied { remaining } = check {
            self.host
                .notify(player, Channel::ActionBar, Notice::Cooldown { remaining });
            return Err(SessionError::CooldownActive { remaining }.into());
        }

        debug!(%player, ?tool, "tool used");
        match tool {
            ParkourTool::LastCheckpoint => self.die(player).map(drop),
            ParkourTool::Restart => self.restart(player).map(drop),
            ParkourTool::Leave => self.leave(player).map(drop),
            ParkourTool::Freedom => self.set_manual_checkpoint(player),
            ParkourTool::Rockets => {
                self.host
                    .launch(player, self.config.modes.rocket_force());
                self.host.play_sound(player, Sound::ReloadRocket);
                Ok(())
            }
        }
    }

    // -- Connection -----------------------------------------------------------

    /// The player went offline. Their session is saved (or discarded if
    /// marked) and dropped from memory. Returns whether they were playing.
    pub fn disconnect(&mut self, player: PlayerId) -> bool {
        self.action_cooldowns.clear(&player);
        let Some(session) = self.sessions.remove(player) else {
            return false;
        };

        let course = session.course_name().to_string();
        if session.is_marked_for_deletion() || !session.course().settings.resumable {
            self.store.delete_session(player, &course);
            self.store
                .update_profile(player, |p| p.existing_session_course = None);
        } else {
            self.store
                .save_session(player, session.snapshot(Instant::now()));
            let resume = course.clone();
            self.store
                .update_profile(player, |p| p.existing_session_course = Some(resume));
        }
        info!(%player, %course, "player disconnected mid-course");
        true
    }

    /// The player came back. Rejoins the course they were on, silently.
    pub fn reconnect(&mut self, player: PlayerId) -> Result<Option<JoinKind>, EngineError> {
        let Some(name) = self.store.profile(player).existing_session_course else {
            return Ok(None);
        };
        match self.courses.find_course(&name) {
            Some(course) => self.join_course(player, course, JoinPolicy::Silent).map(Some),
            None => {
                warn!(%player, course = %name, "course to resume no longer exists");
                self.store
                    .update_profile(player, |p| p.existing_session_course = None);
                Ok(None)
            }
        }
    }

    /// Forgets everything about a player: profile, saved sessions, times,
    /// cooldowns, pending continuations and any live session.
    pub fn reset_player(&mut self, player: PlayerId) {
        self.store.delete_profile(player);
        self.store.delete_sessions(player);
        self.leaderboard.delete_player_times(player);
        let was_playing = self.sessions.remove(player).is_some();
        self.action_cooldowns.clear(&player);
        self.prize_cooldowns.clear_where(|(owner, _)| *owner == player);
        let cancelled = self.deferred.cancel_where(|task| task.player() == player);
        info!(%player, was_playing, cancelled, "player reset");
    }

    // -- Ticks and shutdown ---------------------------------------------------

    /// Runs one scheduler tick: due continuations first, then the live
    /// timer on its interval.
    pub fn on_tick(&mut self, tick: u64) {
        self.current_tick = tick;
        for task in self.deferred.drain_due(tick) {
            self.run_continuation(task);
        }
        if self.config.timer.enabled && tick % self.config.timer.interval_ticks == 0 {
            self.run_live_timer();
        }
    }

    /// [`on_tick`](Self::on_tick) for the tick after the current one.
    pub fn advance_tick(&mut self) {
        self.on_tick(self.current_tick + 1);
    }

    /// Saves every resumable session, discards the marked ones, and clears
    /// the engine. Pending continuations are dropped. Returns how many
    /// sessions were saved.
    pub fn shutdown(&mut self) -> usize {
        let now = Instant::now();
        let mut saved = 0;
        for session in self.sessions.drain() {
            let player = session.player_id;
            let course = session.course_name().to_string();
            if session.is_marked_for_deletion() {
                self.store.delete_session(player, &course);
                continue;
            }
            self.store.save_session(player, session.snapshot(now));
            self.store
                .update_profile(player, |p| p.existing_session_course = Some(course));
            saved += 1;
        }
        let dropped = self.deferred.len();
        self.deferred.clear();
        info!(saved, dropped, "progression engine shut down");
        saved
    }

    // -- Helpers --------------------------------------------------------------

    fn reject(&mut self, player: PlayerId, notice: Notice) {
        debug!(%player, %notice, "transition rejected");
        self.host.notify(player, Channel::Chat, notice);
    }
}
