//! Integration tests for the progression engine with in-memory collaborators.

use std::time::Duration;

use parkforge_course::{Course, CourseCatalog, ItemStack, Location, PlayerId};
use parkforge_engine::{
    CheckpointOutcome, CourseEvent, DeathOutcome, EngineConfig, EngineError, FinishOutcome,
    HostCall, JoinPolicy, Leaderboard, LeaveOutcome, Limit, MemoryLeaderboard, Notice,
    ParkourTool, ProgressionEngine, RankUnlock, RecordingHost, RestartKind, ScoreboardUpdate,
    TimeResult,
};
use parkforge_session::{CoursePhase, JoinKind, MemoryProfileStore, ProfileStore, SessionError};
use tokio::sync::broadcast;

type Engine = ProgressionEngine<CourseCatalog, MemoryProfileStore, MemoryLeaderboard, RecordingHost>;

const P1: PlayerId = PlayerId(1);
const P2: PlayerId = PlayerId(2);

// =========================================================================
// Fixtures
// =========================================================================

fn course(name: &str, checkpoints: usize) -> Course {
    let mut course = Course::new(name, Location::new("world", 0.0, 64.0, 0.0));
    for i in 1..=checkpoints {
        course = course.with_checkpoint(Location::new("world", i as f64 * 10.0, 64.0, 0.0));
    }
    course
}

fn engine_with(courses: Vec<Course>, config: EngineConfig) -> Engine {
    let mut catalog = CourseCatalog::new();
    for course in courses {
        catalog.insert(course).unwrap();
    }
    ProgressionEngine::new(
        config,
        catalog,
        MemoryProfileStore::new(),
        MemoryLeaderboard::new(),
        RecordingHost::new(),
    )
}

fn engine(courses: Vec<Course>) -> Engine {
    engine_with(courses, EngineConfig::default())
}

fn drain(rx: &mut broadcast::Receiver<CourseEvent>) -> Vec<CourseEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn reach_all(engine: &mut Engine, player: PlayerId, checkpoints: usize) {
    for i in 1..=checkpoints {
        engine.achieve_checkpoint(player, i).unwrap();
    }
}

fn items_given(engine: &Engine, player: PlayerId) -> usize {
    engine
        .host()
        .count(|call| matches!(call, HostCall::Item(p, _) if *p == player))
}

// =========================================================================
// Join
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_starts_fresh_session_at_start() {
    let mut engine = engine(vec![course("a", 3)]);
    let mut rx = engine.subscribe();

    let kind = engine.join(P1, "A", JoinPolicy::Announced).unwrap();
    assert_eq!(kind, JoinKind::Fresh);
    assert!(engine.is_playing(P1));

    let view = engine.session_view(P1).unwrap();
    assert_eq!(view.checkpoint, 0);
    assert_eq!(view.checkpoint_count, 3);
    assert_eq!(view.phase, CoursePhase::Joined);

    let host = engine.host();
    assert_eq!(host.teleports(P1), vec![&Location::new("world", 0.0, 64.0, 0.0)]);
    assert!(host.has_notice(P1, |n| matches!(n, Notice::Joined { .. })));
    assert!(host.calls.contains(&HostCall::Tool(P1, ParkourTool::LastCheckpoint)));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [CourseEvent::Joined { kind: JoinKind::Fresh, policy: JoinPolicy::Announced, .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_rejections_leave_no_session() {
    let mut leveled = course("hard", 1);
    leveled.settings.min_level = Some(5);
    let mut engine = engine(vec![course("a", 1), leveled]);

    let err = engine.join(P1, "missing", JoinPolicy::Announced).unwrap_err();
    assert_eq!(err, EngineError::CourseNotFound("missing".into()));

    let err = engine.join(P1, "hard", JoinPolicy::Announced).unwrap_err();
    assert!(matches!(err, EngineError::JoinDenied(_)));

    engine.host_mut().deny(P2, "no permission");
    let err = engine.join(P2, "a", JoinPolicy::Announced).unwrap_err();
    assert_eq!(err, EngineError::JoinDenied("no permission".into()));

    assert!(engine.sessions().is_empty());
    assert!(engine.host().has_notice(P1, |n| matches!(n, Notice::CourseNotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_join_same_course_twice_is_rejected() {
    let mut engine = engine(vec![course("a", 2)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    let err = engine.join(P1, "A", JoinPolicy::Announced).unwrap_err();
    assert_eq!(
        err,
        EngineError::Session(SessionError::AlreadyPlaying(P1, "a".into()))
    );
    assert_eq!(engine.session_view(P1).unwrap().checkpoint, 1, "progress untouched");
}

#[tokio::test(start_paused = true)]
async fn test_full_course_denies_next_player() {
    let mut small = course("small", 1);
    small.settings.max_players = Some(1);
    let mut engine = engine(vec![small]);

    engine.join(P1, "small", JoinPolicy::Announced).unwrap();
    let err = engine.join(P2, "small", JoinPolicy::Announced).unwrap_err();
    assert!(matches!(err, EngineError::JoinDenied(_)));
}

#[tokio::test(start_paused = true)]
async fn test_joining_another_course_replaces_the_session() {
    let mut engine = engine(vec![course("a", 2), course("b", 2)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    engine.join(P1, "b", JoinPolicy::Announced).unwrap();

    assert_eq!(engine.sessions().len(), 1);
    assert_eq!(engine.session_view(P1).unwrap().course, "b");
    let saved = engine.store().saved_session(P1, "a").unwrap();
    assert_eq!(saved.checkpoint, 1, "old course saved for later");
}

// =========================================================================
// Checkpoints
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_checkpoints_only_advance_in_order() {
    let mut engine = engine(vec![course("a", 3)]);
    let mut rx = engine.subscribe();
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    assert_eq!(engine.achieve_checkpoint(P1, 2).unwrap(), CheckpointOutcome::Ignored);
    assert_eq!(engine.achieve_checkpoint(P1, 1).unwrap(), CheckpointOutcome::Advanced(1));
    assert_eq!(engine.achieve_checkpoint(P1, 1).unwrap(), CheckpointOutcome::Ignored);
    assert_eq!(engine.achieve_checkpoint(P1, 2).unwrap(), CheckpointOutcome::Advanced(2));
    assert_eq!(engine.achieve_checkpoint(P1, 3).unwrap(), CheckpointOutcome::AllCheckpoints);
    assert_eq!(engine.achieve_checkpoint(P1, 4).unwrap(), CheckpointOutcome::Ignored);

    assert_eq!(engine.session_view(P1).unwrap().phase, CoursePhase::AllCheckpoints);
    let achieved = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CourseEvent::CheckpointAchieved { .. }))
        .count();
    assert_eq!(achieved, 3);
}

#[tokio::test(start_paused = true)]
async fn test_set_checkpoint_rejects_out_of_range() {
    let mut engine = engine(vec![course("a", 2)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    let err = engine.set_checkpoint(P1, 3).unwrap_err();
    assert_eq!(
        err,
        EngineError::Session(SessionError::InvalidCheckpoint { requested: 3, max: 2 })
    );
    assert_eq!(engine.set_checkpoint(P1, 2).unwrap(), CheckpointOutcome::AllCheckpoints);
    assert_eq!(engine.set_checkpoint(P1, 1).unwrap(), CheckpointOutcome::Advanced(1));
}

#[tokio::test(start_paused = true)]
async fn test_last_checkpoint_can_finish_the_course() {
    let mut config = EngineConfig::default();
    config.on_course.treat_last_checkpoint_as_finish = true;
    let mut engine = engine_with(vec![course("a", 2)], config);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    engine.achieve_checkpoint(P1, 1).unwrap();
    assert_eq!(engine.achieve_checkpoint(P1, 2).unwrap(), CheckpointOutcome::Finished);
    assert!(!engine.is_playing(P1));
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_without_session_is_an_error() {
    let mut engine = engine(vec![course("a", 2)]);
    let err = engine.achieve_checkpoint(P1, 1).unwrap_err();
    assert_eq!(err, EngineError::Session(SessionError::NotPlaying(P1)));
    assert!(engine.host().has_notice(P1, |n| *n == Notice::NotOnCourse));
}

// =========================================================================
// Death
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_death_respawns_at_current_checkpoint() {
    let mut engine = engine(vec![course("a", 3)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    assert_eq!(engine.die(P1).unwrap(), DeathOutcome::Respawned { deaths: 1 });
    let last = engine.host().teleports(P1).last().cloned().cloned();
    assert_eq!(last, Some(Location::new("world", 10.0, 64.0, 0.0)));
    assert_eq!(engine.session_view(P1).unwrap().checkpoint, 1);
}

#[tokio::test(start_paused = true)]
async fn test_death_limit_ejects_on_the_next_death() {
    let mut limited = course("a", 3);
    limited.settings.max_deaths = Some(2);
    let mut engine = engine(vec![limited]);
    let mut rx = engine.subscribe();

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();
    assert_eq!(engine.die(P1).unwrap(), DeathOutcome::Respawned { deaths: 1 });
    assert_eq!(engine.die(P1).unwrap(), DeathOutcome::Respawned { deaths: 2 });
    assert_eq!(engine.die(P1).unwrap(), DeathOutcome::Ejected);

    assert!(!engine.is_playing(P1));
    assert!(engine.store().saved_session(P1, "a").is_none());
    assert!(engine.host().has_notice(P1, |n| *n == Notice::MaxDeaths { max: 2 }));
    assert!(engine.host().has_notice(P1, |n| *n == Notice::LifeCount { remaining: 1 }));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CourseEvent::Left { deaths: 2, deleted: true, .. }
    )));
    assert!(!events.iter().any(|e| matches!(e, CourseEvent::Finished { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_death_before_first_checkpoint_can_reset_the_clock() {
    let mut config = EngineConfig::default();
    config.on_die.reset_progress_with_no_checkpoint = true;
    let mut engine = engine_with(vec![course("a", 2)], config);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    tokio::time::advance(Duration::from_secs(8)).await;
    engine.die(P1).unwrap();

    assert_eq!(engine.session_view(P1).unwrap().elapsed, Duration::ZERO);
    assert!(engine.host().has_notice(P1, |n| matches!(
        n,
        Notice::Died { checkpoint: 0, time_reset: true }
    )));
}

// =========================================================================
// Finish
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_finish_short_of_last_checkpoint_counts_as_death() {
    let mut engine = engine(vec![course("a", 2)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    assert_eq!(engine.finish(P1).unwrap(), FinishOutcome::Incomplete);
    assert!(engine.is_playing(P1));
    assert_eq!(engine.session_view(P1).unwrap().deaths, 1);
    assert!(engine.host().has_notice(P1, |n| *n == Notice::Cheating { checkpoints: 2 }));
}

#[tokio::test(start_paused = true)]
async fn test_finish_without_enforcement_skips_checkpoints() {
    let mut config = EngineConfig::default();
    config.on_finish.enforce_completion = false;
    let mut engine = engine_with(vec![course("a", 2)], config);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    assert!(matches!(engine.finish(P1).unwrap(), FinishOutcome::Finished { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_finish_is_idempotent_and_rewards_after_delay() {
    let mut config = EngineConfig::default();
    config.on_finish.teleport_delay_ticks = 3;
    let mut engine = engine_with(vec![course("a", 2)], config);
    let mut rx = engine.subscribe();

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    reach_all(&mut engine, P1, 2);
    tokio::time::advance(Duration::from_secs(42)).await;

    let outcome = engine.finish(P1).unwrap();
    assert_eq!(
        outcome,
        FinishOutcome::Finished { elapsed: Duration::from_secs(42), deaths: 0 }
    );
    assert_eq!(engine.finish(P1).unwrap(), FinishOutcome::Ignored);
    assert!(!engine.is_playing(P1));
    assert_eq!(engine.pending_tasks(), 1);

    engine.advance_tick();
    engine.advance_tick();
    assert_eq!(items_given(&engine, P1), 0, "rewards wait for the delay");
    engine.advance_tick();
    assert_eq!(items_given(&engine, P1), 1);
    assert!(engine
        .host()
        .calls
        .contains(&HostCall::Item(P1, ItemStack::new("COOKIE", 1))));
    assert!(engine.host().calls.contains(&HostCall::Lobby(P1, None)));

    assert_eq!(
        engine.leaderboard().player_best(P1, "a"),
        Some(Duration::from_secs(42))
    );
    let profile = engine.store().profile(P1);
    assert!(profile.has_completed("a"));
    assert_eq!(profile.last_completed_course.as_deref(), Some("a"));
    assert!(profile.saved_state.is_none(), "state restored after rewards");

    let events = drain(&mut rx);
    let finished = events
        .iter()
        .filter(|e| matches!(e, CourseEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        CourseEvent::CourseRecord { result: TimeResult::GlobalBest, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_finish_past_time_limit_removes_player() {
    let mut timed = course("sprint", 0);
    timed.settings.max_time_secs = Some(5);
    let mut config = EngineConfig::default();
    config.timer.enabled = false;
    let mut engine = engine_with(vec![timed], config);

    engine.join(P1, "sprint", JoinPolicy::Announced).unwrap();
    tokio::time::advance(Duration::from_secs(6)).await;

    let err = engine.finish(P1).unwrap_err();
    assert_eq!(err, EngineError::LimitExceeded(Limit::Time(5)));
    assert!(!engine.is_playing(P1));
    assert_eq!(engine.pending_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_offline_player_gets_no_rewards() {
    let mut engine = engine(vec![course("a", 0)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();

    engine.host_mut().set_online(P1, false);
    engine.advance_tick();

    assert_eq!(items_given(&engine, P1), 0);
    assert!(engine.leaderboard().entries().is_empty());
}

// =========================================================================
// Rewards
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_rewards_once_then_no_prize() {
    let mut rewarding = course("a", 0);
    rewarding.rewards.reward_once = true;
    rewarding.rewards.level = Some(3);
    rewarding.rewards.parkoins = 5.0;
    let mut config = EngineConfig::default();
    config.ranks.unlocks = vec![RankUnlock { level: 3, rank: "Runner".into() }];
    let mut engine = engine_with(vec![rewarding], config);
    let mut rx = engine.subscribe();

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.advance_tick();

    let profile = engine.store().profile(P1);
    assert_eq!(profile.level, 3);
    assert_eq!(profile.rank.as_deref(), Some("Runner"));
    assert_eq!(profile.parkoins, 5.0);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.advance_tick();

    assert_eq!(items_given(&engine, P1), 1);
    assert_eq!(engine.store().profile(P1).parkoins, 5.0);
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, CourseEvent::NoPrize { .. })));
    assert!(events.iter().any(|e| matches!(e, CourseEvent::RankChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_reward_delay_blocks_repeat_prizes() {
    let mut delayed = course("a", 0);
    delayed.rewards.reward_delay_secs = Some(3600);
    let mut engine = engine(vec![delayed]);

    for _ in 0..2 {
        engine.join(P1, "a", JoinPolicy::Announced).unwrap();
        engine.finish(P1).unwrap();
        engine.advance_tick();
    }

    assert_eq!(items_given(&engine, P1), 1);
    assert!(engine
        .host()
        .has_notice(P1, |n| matches!(n, Notice::PrizeCooldown { .. })));
    assert!(engine.store().profile(P1).last_rewarded.contains_key("a"));
}

#[tokio::test(start_paused = true)]
async fn test_reward_delay_survives_an_engine_restart() {
    let mut delayed = course("a", 0);
    delayed.rewards.reward_delay_secs = Some(3600);
    let mut engine = engine(vec![delayed.clone()]);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.advance_tick();
    assert_eq!(items_given(&engine, P1), 1);
    engine.shutdown();

    let mut catalog = CourseCatalog::new();
    catalog.insert(delayed).unwrap();
    let mut restarted: Engine = ProgressionEngine::new(
        EngineConfig::default(),
        catalog,
        engine.store().clone(),
        MemoryLeaderboard::new(),
        RecordingHost::new(),
    );
    restarted.join(P1, "a", JoinPolicy::Announced).unwrap();
    restarted.finish(P1).unwrap();
    restarted.advance_tick();

    assert_eq!(items_given(&restarted, P1), 0);
    assert!(restarted
        .host()
        .has_notice(P1, |n| matches!(n, Notice::PrizeCooldown { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_finish_leaves_the_next_course_alone() {
    let mut config = EngineConfig::default();
    config.on_finish.teleport_delay_ticks = 10;
    let mut engine = engine_with(vec![course("a", 0), course("b", 2)], config);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.join(P1, "b", JoinPolicy::Announced).unwrap();
    engine.host_mut().clear();
    for _ in 0..10 {
        engine.advance_tick();
    }

    assert_eq!(engine.session_view(P1).unwrap().course, "b");
    let host = engine.host();
    assert_eq!(host.count(|call| matches!(call, HostCall::Restore(..))), 0);
    assert_eq!(host.count(|call| matches!(call, HostCall::Lobby(..))), 0);
    assert!(!host
        .calls
        .contains(&HostCall::Scoreboard(P1, ScoreboardUpdate::Remove)));
    assert_eq!(items_given(&engine, P1), 1, "prize is still paid");
    assert!(engine.leaderboard().has_player_time(P1, "a"));
    assert!(engine.store().profile(P1).saved_state.is_some());

    // The pre-join state is still there for the real leave.
    engine.leave(P1).unwrap();
    assert_eq!(
        engine
            .host()
            .count(|call| matches!(call, HostCall::Restore(p, _) if *p == P1)),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_slower_time_is_not_a_record() {
    let mut engine = engine(vec![course("a", 0)]);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    engine.finish(P1).unwrap();
    engine.advance_tick();

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    tokio::time::advance(Duration::from_secs(45)).await;
    engine.finish(P1).unwrap();
    engine.advance_tick();

    let board = engine.leaderboard();
    assert_eq!(board.entries().len(), 2);
    assert_eq!(board.course_best("a"), Some(Duration::from_secs(30)));
    let records = engine
        .host()
        .count(|call| matches!(call, HostCall::Notify(_, _, Notice::CourseRecord { .. })));
    assert_eq!(records, 1);
}

#[tokio::test(start_paused = true)]
async fn test_linked_course_joins_after_finish() {
    let mut first = course("a", 0);
    first.settings.linked_course = Some("b".into());
    let mut engine = engine(vec![first, course("b", 1)]);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.advance_tick();
    assert!(!engine.is_playing(P1));
    engine.advance_tick();

    assert_eq!(engine.session_view(P1).unwrap().course, "b");
}

// =========================================================================
// Leave / restart
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_then_rejoin_resumes_progress() {
    let mut engine = engine(vec![course("a", 3)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(engine.leave(P1).unwrap(), LeaveOutcome::Saved);
    assert!(!engine.is_playing(P1));
    tokio::time::advance(Duration::from_secs(100)).await;

    assert_eq!(engine.join(P1, "a", JoinPolicy::Announced).unwrap(), JoinKind::Resumed);
    let view = engine.session_view(P1).unwrap();
    assert_eq!(view.checkpoint, 1);
    assert_eq!(view.elapsed, Duration::from_secs(10), "time away doesn't count");
    let last = engine.host().teleports(P1).last().cloned().cloned();
    assert_eq!(last, Some(Location::new("world", 10.0, 64.0, 0.0)));
}

#[tokio::test(start_paused = true)]
async fn test_leave_restores_captured_state() {
    let mut engine = engine(vec![course("a", 1)]);
    engine.host_mut().state.xp_level = 30;
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    assert!(engine.store().profile(P1).saved_state.is_some());

    engine.leave(P1).unwrap();

    assert!(engine
        .host()
        .calls
        .iter()
        .any(|call| matches!(call, HostCall::Restore(p, state) if *p == P1 && state.xp_level == 30)));
    let profile = engine.store().profile(P1);
    assert!(profile.saved_state.is_none());
    assert!(profile.existing_session_course.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_non_resumable_course_deletes_on_leave() {
    let mut oneshot = course("a", 2);
    oneshot.settings.resumable = false;
    let mut engine = engine(vec![oneshot]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    assert_eq!(engine.leave(P1).unwrap(), LeaveOutcome::Deleted);
    assert_eq!(engine.join(P1, "a", JoinPolicy::Announced).unwrap(), JoinKind::Fresh);
}

#[tokio::test(start_paused = true)]
async fn test_leave_after_time_limit_discards_progress() {
    let mut timed = course("sprint", 2);
    timed.settings.max_time_secs = Some(5);
    let mut config = EngineConfig::default();
    config.timer.enabled = false;
    let mut engine = engine_with(vec![timed], config);
    let mut rx = engine.subscribe();

    engine.join(P1, "sprint", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();
    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(engine.leave(P1).unwrap(), LeaveOutcome::Deleted);
    assert!(engine.store().saved_session(P1, "sprint").is_none());
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, CourseEvent::Left { deleted: true, .. })));
    assert_eq!(
        engine.join(P1, "sprint", JoinPolicy::Announced).unwrap(),
        JoinKind::Fresh
    );
}

#[tokio::test(start_paused = true)]
async fn test_leave_without_session_is_an_error() {
    let mut engine = engine(vec![course("a", 1)]);
    let err = engine.leave(P1).unwrap_err();
    assert_eq!(err, EngineError::Session(SessionError::NotPlaying(P1)));
}

#[tokio::test(start_paused = true)]
async fn test_soft_restart_resets_in_place() {
    let mut free = course("a", 3);
    free.settings.manual_checkpoints = true;
    let mut engine = engine(vec![free]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();
    engine.host_mut().place(P1, Location::new("world", 15.0, 70.0, 0.0));
    engine.set_manual_checkpoint(P1).unwrap();
    engine.die(P1).unwrap();
    assert_eq!(
        engine.host().teleports(P1).last().cloned().cloned(),
        Some(Location::new("world", 15.0, 70.0, 0.0))
    );

    assert_eq!(engine.restart(P1).unwrap(), RestartKind::Soft);

    let view = engine.session_view(P1).unwrap();
    assert_eq!(view.checkpoint, 0);
    assert_eq!(view.deaths, 0);
    assert_eq!(
        engine.host().teleports(P1).last().cloned().cloned(),
        Some(Location::new("world", 0.0, 64.0, 0.0)),
        "manual checkpoint cleared"
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_restart_discards_saved_progress() {
    let mut config = EngineConfig::default();
    config.on_restart.full_restart = true;
    let mut engine = engine_with(vec![course("a", 3)], config);
    let mut rx = engine.subscribe();
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    assert_eq!(engine.restart(P1).unwrap(), RestartKind::Full);

    assert_eq!(engine.session_view(P1).unwrap().checkpoint, 0);
    assert!(engine.store().saved_session(P1, "a").is_none());
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CourseEvent::Joined { kind: JoinKind::Fresh, policy: JoinPolicy::Silent, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_manual_checkpoint_needs_permission_from_course() {
    let mut engine = engine(vec![course("a", 1)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    let err = engine.set_manual_checkpoint(P1).unwrap_err();
    assert!(matches!(err, EngineError::ActionDenied(_)));
    assert!(engine
        .host()
        .has_notice(P1, |n| *n == Notice::ManualCheckpointUnavailable));
}

// =========================================================================
// Timer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_live_timer_counts_up_every_interval() {
    let mut engine = engine(vec![course("a", 1)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    tokio::time::advance(Duration::from_secs(3)).await;
    engine.on_tick(19);
    engine.on_tick(20);

    let timers: Vec<_> = engine
        .host()
        .notices(P1)
        .into_iter()
        .filter(|n| matches!(n, Notice::LiveTimer { .. }))
        .cloned()
        .collect();
    assert_eq!(timers, vec![Notice::LiveTimer { seconds: 3, urgent: false }]);
}

#[tokio::test(start_paused = true)]
async fn test_live_timer_countdown_ejects_at_zero() {
    let mut timed = course("sprint", 2);
    timed.settings.max_time_secs = Some(5);
    let mut engine = engine(vec![timed]);
    let mut rx = engine.subscribe();
    engine.join(P1, "sprint", JoinPolicy::Announced).unwrap();

    tokio::time::advance(Duration::from_secs(2)).await;
    engine.on_tick(20);
    assert!(engine.is_playing(P1));
    assert!(engine
        .host()
        .has_notice(P1, |n| *n == Notice::LiveTimer { seconds: 3, urgent: true }));

    tokio::time::advance(Duration::from_secs(3)).await;
    engine.on_tick(40);

    assert!(!engine.is_playing(P1));
    assert!(engine.host().has_notice(P1, |n| *n == Notice::MaxTime { max_secs: 5 }));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, CourseEvent::Left { deleted: true, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_timer_can_wait_for_start_trigger() {
    let mut config = EngineConfig::default();
    config.on_join.treat_first_checkpoint_as_start = true;
    let mut engine = engine_with(vec![course("a", 1)], config);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(engine.session_view(P1).unwrap().elapsed, Duration::ZERO);

    assert!(engine.start_timer(P1).unwrap());
    assert!(!engine.start_timer(P1).unwrap());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(engine.session_view(P1).unwrap().elapsed, Duration::from_secs(2));
}

// =========================================================================
// Tools
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tool_cooldown_denies_rapid_use() {
    let mut engine = engine(vec![course("a", 1)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    engine.use_tool(P1, ParkourTool::LastCheckpoint).unwrap();
    let err = engine.use_tool(P1, ParkourTool::LastCheckpoint).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Session(SessionError::CooldownActive { .. })
    ));
    assert_eq!(engine.session_view(P1).unwrap().deaths, 1, "denied use did nothing");

    tokio::time::advance(Duration::from_secs(1)).await;
    engine.use_tool(P1, ParkourTool::LastCheckpoint).unwrap();
    assert_eq!(engine.session_view(P1).unwrap().deaths, 2);
}

#[tokio::test(start_paused = true)]
async fn test_privileged_players_skip_cooldown() {
    let mut engine = engine(vec![course("a", 1)]);
    engine.host_mut().set_privileged(P1);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();

    engine.use_tool(P1, ParkourTool::LastCheckpoint).unwrap();
    engine.use_tool(P1, ParkourTool::LastCheckpoint).unwrap();
    assert_eq!(engine.session_view(P1).unwrap().deaths, 2);
}

#[tokio::test(start_paused = true)]
async fn test_rockets_launch_only_on_rockets_course() {
    let mut rockets = course("rockets", 1);
    rockets.mode = parkforge_course::ParkourMode::Rockets;
    let mut engine = engine(vec![course("a", 1), rockets]);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    assert!(matches!(
        engine.use_tool(P1, ParkourTool::Rockets),
        Err(EngineError::ActionDenied(_))
    ));

    engine.join(P2, "rockets", JoinPolicy::Announced).unwrap();
    engine.use_tool(P2, ParkourTool::Rockets).unwrap();
    assert!(engine.host().calls.contains(&HostCall::Launch(P2, 1.5)));
}

// =========================================================================
// Connection lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_and_reconnect_resume_silently() {
    let mut engine = engine(vec![course("a", 3)]);
    let mut rx = engine.subscribe();
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P1, 1).unwrap();

    assert!(engine.disconnect(P1));
    assert!(!engine.disconnect(P1));
    assert!(!engine.is_playing(P1));
    assert_eq!(
        engine.store().profile(P1).existing_session_course.as_deref(),
        Some("a")
    );

    assert_eq!(engine.reconnect(P1).unwrap(), Some(JoinKind::Resumed));
    assert_eq!(engine.session_view(P1).unwrap().checkpoint, 1);
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        CourseEvent::Joined { kind: JoinKind::Resumed, policy: JoinPolicy::Silent, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_without_saved_course_does_nothing() {
    let mut engine = engine(vec![course("a", 1)]);
    assert_eq!(engine.reconnect(P1).unwrap(), None);
    assert!(!engine.is_playing(P1));
}

#[tokio::test(start_paused = true)]
async fn test_reset_player_clears_everything() {
    let mut config = EngineConfig::default();
    config.on_finish.teleport_delay_ticks = 5;
    let mut engine = engine_with(vec![course("a", 0), course("b", 2)], config);

    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.finish(P1).unwrap();
    engine.join(P1, "b", JoinPolicy::Announced).unwrap();
    engine.leave(P1).unwrap();
    engine.join(P1, "b", JoinPolicy::Announced).unwrap();

    engine.reset_player(P1);

    assert!(!engine.is_playing(P1));
    assert!(!engine.store().has_profile(P1));
    assert!(engine.store().saved_session(P1, "b").is_none());
    assert_eq!(engine.pending_tasks(), 0);
    for _ in 0..5 {
        engine.advance_tick();
    }
    assert_eq!(items_given(&engine, P1), 0);
    assert!(engine.leaderboard().entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_saves_every_session() {
    let mut engine = engine(vec![course("a", 2), course("b", 2)]);
    engine.join(P1, "a", JoinPolicy::Announced).unwrap();
    engine.join(P2, "b", JoinPolicy::Announced).unwrap();
    engine.achieve_checkpoint(P2, 1).unwrap();

    assert_eq!(engine.shutdown(), 2);

    assert!(engine.sessions().is_empty());
    assert_eq!(engine.store().saved_session(P2, "b").unwrap().checkpoint, 1);
    assert_eq!(
        engine.store().profile(P1).existing_session_course.as_deref(),
        Some("a")
    );
}
