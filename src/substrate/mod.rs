//! Event substrate: where task entities live and how events reach the runner.
//!
//! The runner only talks to a substrate through [`EventSubstrate`]. Two
//! realisations exist:
//! - [`ThreadedSubstrate`]: one OS thread per task, crossbeam channels in
//!   both directions, and a ticker thread for the periodic timer.
//! - [`DeterministicSubstrate`]: tasks run inline; a permit's outcome is
//!   queued before the next virtual tick, so runs are exactly reproducible.
//!
//! Both funnel every inbound event into a single ordered queue consumed by
//! one loop, so controller handlers never interleave.

use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpawnError;
use crate::scheduler::event::{Event, Notice};
use crate::task::TaskEntity;

pub mod deterministic;
pub mod threaded;

pub use deterministic::DeterministicSubstrate;
pub use threaded::ThreadedSubstrate;

/// Opaque reference to a spawned task, issued by the substrate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskHandle(u64);

impl TaskHandle {
    #[inline(always)]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution environment consumed by the runner.
pub trait EventSubstrate {
    /// Start a task entity. Failure is fatal for the run.
    fn spawn(&mut self, entity: TaskEntity) -> Result<TaskHandle, SpawnError>;

    /// Deliver a notice to a task. Notices for finished tasks are dropped.
    fn notify(&mut self, target: TaskHandle, notice: Notice);

    /// Block until the next inbound event. `None` means no event can ever
    /// arrive again.
    fn await_next_event(&mut self) -> Option<Event>;

    /// Non-blocking poll for tasks that have fully exited since the last call.
    fn reap_terminated(&mut self) -> Vec<TaskHandle>;

    /// Start delivering [`Event::Tick`] every `interval`.
    fn schedule_periodic(&mut self, interval: Duration) -> io::Result<()>;

    /// Stop the timer, release every task, and join them all. Idempotent.
    fn shutdown(&mut self);
}
