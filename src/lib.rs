//! Deterministic round-robin CPU scheduling simulator.
//!
//! ## Scope
//! A central controller schedules a fixed population of simulated tasks in
//! fixed time slices. Tasks perform one unit of work per permission grant,
//! then either keep waiting, block on simulated I/O, or exit. The controller
//! tracks per-task state and wait time and reports the mean wait once every
//! task has exited.
//!
//! ## Key invariants
//! - At most one task is RUNNING at any time.
//! - Ready-queue membership is exactly the set of READY tasks, without
//!   duplicates; sleep-set membership is exactly the set of SLEEP tasks.
//! - DONE is absorbing.
//! - Wait time grows by one per epoch spent READY.
//!
//! ## Flow
//! `Runner -> EventSubstrate::await_next_event -> Controller::handle -> Directive -> EventSubstrate::notify -> TaskEntity`
//!
//! All inbound events go through one queue and one consumer, so controller
//! handlers never run concurrently. Time is a virtual epoch counter; only the
//! threaded substrate uses the wall clock, and only to pace ticks.
//!
//! ## Notable entry points
//! - `Runner`, `run_deterministic`, `run_threaded`: drive a full run.
//! - `Controller`: the scheduling state machine, usable on its own.
//! - `TaskEntity`, `Entropy`: task behaviour and its randomness.
//! - `SimConfig`, `WorkloadPlan`: run configuration.

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod scheduler;
pub mod sim;
pub mod substrate;
pub mod task;

pub use config::{parse_base_quantum, SimConfig, WorkloadPlan};
pub use error::{InvariantViolation, SimError, SpawnError};
pub use runner::{run_deterministic, run_threaded, Runner};
pub use scheduler::{
    Controller, Directive, Event, Notice, Pcb, Report, TaskId, TaskState, TaskSummary,
};
pub use sim::{EpochClock, SimRng, TraceEvent, TraceRing};
pub use substrate::{DeterministicSubstrate, EventSubstrate, TaskHandle, ThreadedSubstrate};
pub use task::{
    BurstOutcome, Entropy, ScriptedEntropy, SeededEntropy, TaskEntity, TaskPhase, TaskScript,
    WorkloadProfile,
};
