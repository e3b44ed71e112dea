//! Round-robin scheduling core.
//!
//! # Architecture
//!
//! The [`Controller`] owns every piece of scheduling state:
//! - [`PcbTable`]: one [`Pcb`] per task, the authoritative state record
//! - [`ReadyQueue`]: FIFO of READY ids with O(1) dedupe
//! - [`SleepSet`]: SLEEP ids keyed by wake epoch
//!
//! Inbound [`Event`]s (tick, I/O request, termination) are the only way state
//! changes. Outbound [`Directive`]s (permit, wake) are the only way tasks
//! learn about it.

pub mod controller;
pub mod event;
pub mod pcb;
pub mod ready_queue;
pub mod report;
pub mod sleep_set;

pub use controller::Controller;
pub use event::{Directive, Event, Notice};
pub use pcb::{Pcb, PcbTable, TaskId, TaskState};
pub use ready_queue::{Popped, ReadyQueue};
pub use report::{Report, TaskSummary};
pub use sleep_set::SleepSet;
