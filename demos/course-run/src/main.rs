//! Scripted players running Parkforge courses.
//!
//! Loads the bundled courses and config, spawns the course runtime with a
//! console host that logs everything the engine asks the world to do, and
//! plays a few runs:
//!
//! - alice climbs the tower, dies once, finishes, and is sent on to the
//!   linked lava course
//! - bob joins the timed sprint and idles until the clock runs out
//! - carol leaves the tower halfway and later resumes
//!
//! ```text
//! RUST_LOG=debug cargo run -p course-run
//! ```

use std::collections::HashMap;
use std::time::Duration;

use parkforge::course::ItemStack;
use parkforge::engine::{BroadcastScope, Channel, ParkourTool, ScoreboardUpdate, Sound};
use parkforge::prelude::*;
use parkforge::session::SavedPlayerState;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const COURSES: &str = include_str!("courses.json");
const CONFIG: &str = include_str!("config.json");

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);
const CAROL: PlayerId = PlayerId(3);

/// A host with no world behind it: side effects become log lines.
#[derive(Debug, Default)]
struct ConsoleHost {
    locations: HashMap<PlayerId, Location>,
}

impl Host for ConsoleHost {
    fn location(&self, player: PlayerId) -> Option<Location> {
        self.locations.get(&player).cloned()
    }

    fn teleport(&mut self, player: PlayerId, to: &Location) {
        debug!(%player, to = %to, "teleport");
        self.locations.insert(player, to.clone());
    }

    fn notify(&mut self, player: PlayerId, channel: Channel, notice: Notice) {
        match channel {
            // The live timer would flood the log.
            Channel::ActionBar => debug!(%player, "[action bar] {notice}"),
            _ => info!(%player, ?channel, "{notice}"),
        }
    }

    fn broadcast(&mut self, scope: BroadcastScope, _origin: PlayerId, notice: Notice) {
        info!(?scope, "[broadcast] {notice}");
    }

    fn play_sound(&mut self, player: PlayerId, sound: Sound) {
        trace!(%player, ?sound, "sound");
    }

    fn scoreboard(&mut self, player: PlayerId, update: ScoreboardUpdate) {
        trace!(%player, ?update, "scoreboard");
    }

    fn capture_state(&mut self, player: PlayerId) -> SavedPlayerState {
        debug!(%player, "inventory stashed");
        SavedPlayerState {
            health: 20.0,
            food_level: 20,
            xp_level: 5,
            inventory: vec![ItemStack::new("STONE_SWORD", 1)],
            armor: Vec::new(),
        }
    }

    fn restore_state(&mut self, player: PlayerId, state: &SavedPlayerState) {
        debug!(%player, items = state.inventory.len(), "inventory restored");
    }

    fn give_item(&mut self, player: PlayerId, item: &ItemStack) {
        info!(%player, material = %item.material, amount = item.amount, "prize");
    }

    fn give_tool(&mut self, player: PlayerId, tool: ParkourTool) {
        trace!(%player, ?tool, "tool");
    }

    fn set_walk_speed(&mut self, player: PlayerId, speed: f32) {
        debug!(%player, speed, "walk speed");
    }

    fn join_lobby(&mut self, player: PlayerId, lobby: Option<&str>) -> bool {
        info!(%player, lobby = lobby.unwrap_or("default"), "sent to lobby");
        true
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn alice(runtime: RuntimeHandle) -> Result<(), ParkforgeError> {
    runtime.join(ALICE, "tower").await?;
    runtime.checkpoint(ALICE, 1).await?;
    tokio::time::sleep(Duration::from_millis(800)).await;
    runtime.die(ALICE).await?;
    runtime.checkpoint(ALICE, 2).await?;
    runtime.checkpoint(ALICE, 3).await?;
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    runtime.finish(ALICE).await?;

    // Rewards, then the linked course join, run on later ticks.
    tokio::time::sleep(Duration::from_millis(800)).await;
    match runtime.session(ALICE).await? {
        Some(view) => info!(player = %ALICE, course = %view.course, "now on linked course"),
        None => warn!(player = %ALICE, "linked course join did not happen"),
    }
    runtime.leave(ALICE).await?;
    Ok(())
}

async fn bob(runtime: RuntimeHandle) -> Result<(), ParkforgeError> {
    runtime.join(BOB, "sprint").await?;
    tokio::time::sleep(Duration::from_secs(4)).await;
    if runtime.session(BOB).await?.is_none() {
        info!(player = %BOB, "ran out of time");
    }
    Ok(())
}

async fn carol(runtime: RuntimeHandle) -> Result<(), ParkforgeError> {
    runtime.join(CAROL, "tower").await?;
    runtime.checkpoint(CAROL, 1).await?;
    runtime.checkpoint(CAROL, 2).await?;
    runtime.leave(CAROL).await?;

    tokio::time::sleep(Duration::from_secs(1)).await;
    let kind = runtime.join(CAROL, "tower").await?;
    if let Some(view) = runtime.session(CAROL).await? {
        info!(player = %CAROL, ?kind, checkpoint = view.checkpoint, "back on the tower");
    }

    // Finishing short of the last checkpoint counts as a death.
    let outcome = runtime.finish(CAROL).await?;
    info!(player = %CAROL, ?outcome, "early finish attempt");
    runtime.disconnect(CAROL).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ParkforgeError> {
    setup_logging();

    let courses = CourseCatalog::from_json(COURSES)?;
    let config = EngineConfig::from_json(CONFIG)?;
    info!(courses = ?courses.course_names(), "parkforge demo starting");

    let engine = ProgressionEngine::new(
        config,
        courses,
        MemoryProfileStore::new(),
        MemoryLeaderboard::new(),
        ConsoleHost::default(),
    );
    let (runtime, task) = CourseRuntime::spawn(engine, TickConfig::default());

    let mut events = runtime.subscribe().await?;
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(player = %event.player(), ?event, "course event"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (a, b, c) = tokio::join!(
        alice(runtime.clone()),
        bob(runtime.clone()),
        carol(runtime.clone()),
    );
    for result in [a, b, c] {
        if let Err(err) = result {
            warn!(%err, "scripted player failed");
        }
    }

    let saved = runtime.shutdown().await?;
    info!(saved, "runtime shut down");
    event_log.abort();

    match task.await {
        Ok(engine) => {
            for entry in engine.leaderboard().top("tower", 10) {
                info!(
                    player = %entry.player,
                    time = %parkforge::session::format_duration(entry.elapsed),
                    deaths = entry.deaths,
                    "tower leaderboard"
                );
            }
            let profile = engine.store().profile(ALICE);
            info!(
                player = %ALICE,
                level = profile.level,
                rank = profile.rank.as_deref().unwrap_or("-"),
                parkoins = profile.parkoins,
                "final profile"
            );
        }
        Err(err) => warn!(%err, "runtime task failed"),
    }

    Ok(())
}
