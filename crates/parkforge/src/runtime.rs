//! The course runtime: one Tokio task that owns the engine.
//!
//! Player actions arrive as commands over an mpsc channel and the tick
//! scheduler fires in the same `select!` loop, so every engine mutation
//! happens on this one task, one at a time. Callers talk to it through a
//! cheap, cloneable [`RuntimeHandle`].

use parkforge_course::{CourseRegistry, PlayerId};
use parkforge_engine::{
    CheckpointOutcome, CourseEvent, DeathOutcome, EngineError, FinishOutcome, Host, JoinPolicy,
    Leaderboard, LeaveOutcome, ParkourTool, ProgressionEngine, RestartKind,
};
use parkforge_session::{JoinKind, ProfileStore, SessionView};
use parkforge_tick::{TickConfig, TickMetrics, TickScheduler};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ParkforgeError;

/// Commands queued before the sender waits.
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Commands sent to the runtime task.
///
/// Each carries a `oneshot` reply channel; the caller awaits the result of
/// its transition.
enum Command {
    Join {
        player: PlayerId,
        course: String,
        policy: JoinPolicy,
        reply: Reply<JoinKind>,
    },
    Leave {
        player: PlayerId,
        reply: Reply<LeaveOutcome>,
    },
    Checkpoint {
        player: PlayerId,
        checkpoint: usize,
        reply: Reply<CheckpointOutcome>,
    },
    SetCheckpoint {
        player: PlayerId,
        checkpoint: usize,
        reply: Reply<CheckpointOutcome>,
    },
    ManualCheckpoint {
        player: PlayerId,
        reply: Reply<()>,
    },
    Die {
        player: PlayerId,
        reply: Reply<DeathOutcome>,
    },
    Finish {
        player: PlayerId,
        reply: Reply<FinishOutcome>,
    },
    Restart {
        player: PlayerId,
        reply: Reply<RestartKind>,
    },
    StartTimer {
        player: PlayerId,
        reply: Reply<bool>,
    },
    UseTool {
        player: PlayerId,
        tool: ParkourTool,
        reply: Reply<()>,
    },
    Disconnect {
        player: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Reconnect {
        player: PlayerId,
        reply: Reply<Option<JoinKind>>,
    },
    Reset {
        player: PlayerId,
        reply: oneshot::Sender<()>,
    },
    View {
        player: PlayerId,
        reply: oneshot::Sender<Option<SessionView>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<CourseEvent>>,
    },
    Metrics {
        reply: oneshot::Sender<TickMetrics>,
    },
    Pause,
    Resume,
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to a running course runtime.
///
/// Cloning is cheap: it is an `mpsc::Sender` underneath. Once the runtime
/// has stopped every call returns [`ParkforgeError::RuntimeClosed`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    sender: mpsc::Sender<Command>,
}

impl RuntimeHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ParkforgeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| ParkforgeError::RuntimeClosed)?;
        reply_rx.await.map_err(|_| ParkforgeError::RuntimeClosed)
    }

    async fn transition<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ParkforgeError> {
        Ok(self.request(command).await??)
    }

    async fn send(&self, command: Command) -> Result<(), ParkforgeError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ParkforgeError::RuntimeClosed)
    }

    /// Joins a course with announcements.
    pub async fn join(
        &self,
        player: PlayerId,
        course: impl Into<String>,
    ) -> Result<JoinKind, ParkforgeError> {
        self.join_with(player, course, JoinPolicy::Announced).await
    }

    pub async fn join_with(
        &self,
        player: PlayerId,
        course: impl Into<String>,
        policy: JoinPolicy,
    ) -> Result<JoinKind, ParkforgeError> {
        let course = course.into();
        self.transition(|reply| Command::Join {
            player,
            course,
            policy,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player: PlayerId) -> Result<LeaveOutcome, ParkforgeError> {
        self.transition(|reply| Command::Leave { player, reply }).await
    }

    /// An in-world checkpoint trigger.
    pub async fn checkpoint(
        &self,
        player: PlayerId,
        checkpoint: usize,
    ) -> Result<CheckpointOutcome, ParkforgeError> {
        self.transition(|reply| Command::Checkpoint {
            player,
            checkpoint,
            reply,
        })
        .await
    }

    /// Administrative checkpoint set.
    pub async fn set_checkpoint(
        &self,
        player: PlayerId,
        checkpoint: usize,
    ) -> Result<CheckpointOutcome, ParkforgeError> {
        self.transition(|reply| Command::SetCheckpoint {
            player,
            checkpoint,
            reply,
        })
        .await
    }

    pub async fn set_manual_checkpoint(&self, player: PlayerId) -> Result<(), ParkforgeError> {
        self.transition(|reply| Command::ManualCheckpoint { player, reply })
            .await
    }

    pub async fn die(&self, player: PlayerId) -> Result<DeathOutcome, ParkforgeError> {
        self.transition(|reply| Command::Die { player, reply }).await
    }

    pub async fn finish(&self, player: PlayerId) -> Result<FinishOutcome, ParkforgeError> {
        self.transition(|reply| Command::Finish { player, reply }).await
    }

    pub async fn restart(&self, player: PlayerId) -> Result<RestartKind, ParkforgeError> {
        self.transition(|reply| Command::Restart { player, reply }).await
    }

    pub async fn start_timer(&self, player: PlayerId) -> Result<bool, ParkforgeError> {
        self.transition(|reply| Command::StartTimer { player, reply })
            .await
    }

    pub async fn use_tool(&self, player: PlayerId, tool: ParkourTool) -> Result<(), ParkforgeError> {
        self.transition(|reply| Command::UseTool {
            player,
            tool,
            reply,
        })
        .await
    }

    /// Returns whether the player was on a course.
    pub async fn disconnect(&self, player: PlayerId) -> Result<bool, ParkforgeError> {
        self.request(|reply| Command::Disconnect { player, reply })
            .await
    }

    pub async fn reconnect(&self, player: PlayerId) -> Result<Option<JoinKind>, ParkforgeError> {
        self.transition(|reply| Command::Reconnect { player, reply })
            .await
    }

    pub async fn reset_player(&self, player: PlayerId) -> Result<(), ParkforgeError> {
        self.request(|reply| Command::Reset { player, reply }).await
    }

    pub async fn session(&self, player: PlayerId) -> Result<Option<SessionView>, ParkforgeError> {
        self.request(|reply| Command::View { player, reply }).await
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CourseEvent>, ParkforgeError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    pub async fn metrics(&self) -> Result<TickMetrics, ParkforgeError> {
        self.request(|reply| Command::Metrics { reply }).await
    }

    /// Stops ticking. Commands are still handled.
    pub async fn pause(&self) -> Result<(), ParkforgeError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ParkforgeError> {
        self.send(Command::Resume).await
    }

    /// Persists every session and stops the runtime. Returns how many
    /// sessions were saved.
    pub async fn shutdown(&self) -> Result<usize, ParkforgeError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

/// The runtime task state.
pub struct CourseRuntime<R, S, L, H> {
    engine: ProgressionEngine<R, S, L, H>,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<Command>,
}

impl<R, S, L, H> CourseRuntime<R, S, L, H>
where
    R: CourseRegistry + Send + 'static,
    S: ProfileStore + Send + 'static,
    L: Leaderboard + Send + 'static,
    H: Host + Send + 'static,
{
    /// Spawns the runtime task.
    ///
    /// The join handle resolves to the engine once the runtime stops, either
    /// through [`RuntimeHandle::shutdown`] or because every handle was
    /// dropped. Both paths persist live sessions first.
    pub fn spawn(
        engine: ProgressionEngine<R, S, L, H>,
        tick: TickConfig,
    ) -> (RuntimeHandle, JoinHandle<ProgressionEngine<R, S, L, H>>) {
        let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
        let runtime = Self {
            engine,
            scheduler: TickScheduler::new(tick),
            receiver,
        };
        let task = tokio::spawn(runtime.run());
        (RuntimeHandle { sender }, task)
    }

    async fn run(mut self) -> ProgressionEngine<R, S, L, H> {
        info!(
            rate_hz = self.scheduler.config().tick_rate_hz,
            "course runtime started"
        );

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let saved = self.engine.shutdown();
                        let _ = reply.send(saved);
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => {
                        debug!("all runtime handles dropped");
                        self.engine.shutdown();
                        break;
                    }
                },
                info = self.scheduler.wait_for_tick() => {
                    self.engine.on_tick(info.tick);
                    self.scheduler.record_tick_end();
                }
            }
        }

        info!(ticks = self.scheduler.tick_count(), "course runtime stopped");
        self.engine
    }

    fn handle(&mut self, command: Command) {
        let engine = &mut self.engine;
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::Join {
                player,
                course,
                policy,
                reply,
            } => {
                let _ = reply.send(engine.join(player, &course, policy));
            }
            Command::Leave { player, reply } => {
                let _ = reply.send(engine.leave(player));
            }
            Command::Checkpoint {
                player,
                checkpoint,
                reply,
            } => {
                let _ = reply.send(engine.achieve_checkpoint(player, checkpoint));
            }
            Command::SetCheckpoint {
                player,
                checkpoint,
                reply,
            } => {
                let _ = reply.send(engine.set_checkpoint(player, checkpoint));
            }
            Command::ManualCheckpoint { player, reply } => {
                let _ = reply.send(engine.set_manual_checkpoint(player));
            }
            Command::Die { player, reply } => {
                let _ = reply.send(engine.die(player));
            }
            Command::Finish { player, reply } => {
                let _ = reply.send(engine.finish(player));
            }
            Command::Restart { player, reply } => {
                let _ = reply.send(engine.restart(player));
            }
            Command::StartTimer { player, reply } => {
                let _ = reply.send(engine.start_timer(player));
            }
            Command::UseTool {
                player,
                tool,
                reply,
            } => {
                let _ = reply.send(engine.use_tool(player, tool));
            }
            Command::Disconnect { player, reply } => {
                let _ = reply.send(engine.disconnect(player));
            }
            Command::Reconnect { player, reply } => {
                let _ = reply.send(engine.reconnect(player));
            }
            Command::Reset { player, reply } => {
                engine.reset_player(player);
                let _ = reply.send(());
            }
            Command::View { player, reply } => {
                let _ = reply.send(engine.session_view(player));
            }
            Command::Subscribe { reply } => {
                let _ = reply.send(engine.subscribe());
            }
            Command::Metrics { reply } => {
                let _ = reply.send(self.scheduler.metrics().clone());
            }
            Command::Pause => self.scheduler.pause(),
            Command::Resume => self.scheduler.resume(),
            // Handled in the run loop.
            Command::Shutdown { .. } => {}
        }
    }
}
