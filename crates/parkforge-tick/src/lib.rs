//! Fixed-cadence tick scheduling for Parkforge.
//!
//! Two pieces live here:
//!
//! - [`TickScheduler`]: wakes the engine at a fixed rate (20 Hz by default,
//!   the cadence of the host game loop), watches the per-tick budget, and
//!   handles overruns.
//! - [`TaskQueue`]: deferred work keyed by the tick it should fire on. A
//!   transition that needs a delayed follow-up (post-finish rewards, the
//!   linked-course join) pushes an entry here instead of spawning a timer,
//!   so the follow-up runs on the same task as everything else.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => engine.handle(cmd),
//!         info = scheduler.wait_for_tick() => {
//!             for task in queue.drain_due(info.tick) {
//!                 engine.run(task);
//!             }
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod config;
mod queue;
mod scheduler;

pub use config::{TickConfig, TickPolicy};
pub use queue::{TaskId, TaskQueue};
pub use scheduler::{TickInfo, TickMetrics, TickScheduler};
