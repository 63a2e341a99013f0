//! Course lifecycle notifications for other subsystems.
//!
//! The engine publishes on a `tokio::sync::broadcast` channel and never
//! waits for, or reads, anything back. Slow subscribers lag and lose the
//! oldest events; the engine carries on.

use std::time::Duration;

use parkforge_course::PlayerId;
use parkforge_session::JoinKind;
use tokio::sync::broadcast;

use crate::{JoinPolicy, TimeResult};

#[derive(Debug, Clone, PartialEq)]
pub enum CourseEvent {
    Joined {
        player: PlayerId,
        course: String,
        kind: JoinKind,
        policy: JoinPolicy,
    },
    Left {
        player: PlayerId,
        course: String,
        deaths: u32,
        /// The session was discarded rather than saved for resuming.
        deleted: bool,
        policy: JoinPolicy,
    },
    CheckpointAchieved {
        player: PlayerId,
        course: String,
        checkpoint: usize,
    },
    AllCheckpoints {
        player: PlayerId,
        course: String,
    },
    Died {
        player: PlayerId,
        course: String,
        deaths: u32,
    },
    Finished {
        player: PlayerId,
        course: String,
        elapsed: Duration,
        deaths: u32,
    },
    RankChanged {
        player: PlayerId,
        course: String,
        rank: String,
    },
    LevelChanged {
        player: PlayerId,
        course: String,
        level: u32,
    },
    /// A finish time beat a stored best.
    CourseRecord {
        player: PlayerId,
        course: String,
        elapsed: Duration,
        result: TimeResult,
    },
    Prize {
        player: PlayerId,
        course: String,
    },
    /// The course rewards once and the player already has a time.
    NoPrize {
        player: PlayerId,
        course: String,
    },
}

impl CourseEvent {
    pub fn player(&self) -> PlayerId {
        match self {
            Self::Joined { player, .. }
            | Self::Left { player, .. }
            | Self::CheckpointAchieved { player, .. }
            | Self::AllCheckpoints { player, .. }
            | Self::Died { player, .. }
            | Self::Finished { player, .. }
            | Self::RankChanged { player, .. }
            | Self::LevelChanged { player, .. }
            | Self::CourseRecord { player, .. }
            | Self::Prize { player, .. }
            | Self::NoPrize { player, .. } => *player,
        }
    }
}

/// Fan-out publisher for [`CourseEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CourseEvent>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CourseEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Having no subscribers is fine.
    pub fn emit(&self, event: CourseEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("course event dropped, no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
