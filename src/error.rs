//! Error types for the simulator.
//!
//! Only conditions that stop a run are errors. Dropped notifications,
//! duplicate queue pushes, quantum underflow, and empty pops are normal
//! scheduling outcomes: they are traced and logged, never returned.
//!
//! All enums are `#[non_exhaustive]`; consumers should include a fallback arm.

use std::fmt;
use std::io;

use crate::scheduler::pcb::{TaskId, TaskState};

/// A task entity could not be created at startup. Always fatal.
#[derive(Debug)]
#[non_exhaustive]
pub enum SpawnError {
    /// The OS refused to start the task's thread.
    Thread { task: TaskId, source: io::Error },
    /// Failure injected by the deterministic substrate.
    Injected { task: TaskId },
}

impl SpawnError {
    pub fn task(&self) -> TaskId {
        match self {
            Self::Thread { task, .. } | Self::Injected { task } => *task,
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread { task, source } => {
                write!(f, "failed to spawn thread for {task}: {source}")
            }
            Self::Injected { task } => write!(f, "injected spawn failure for {task}"),
        }
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Thread { source, .. } => Some(source),
            Self::Injected { .. } => None,
        }
    }
}

/// A broken controller invariant, with a stable numeric code.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvariantViolation {
    /// More than one PCB is RUNNING.
    MultipleRunning { first: TaskId, second: TaskId },
    /// `running_id` disagrees with the PCB table.
    RunningMismatch {
        recorded: Option<TaskId>,
        actual: Option<TaskId>,
    },
    /// A ready-queue entry names a task that is not READY.
    QueuedNotReady { task: TaskId, state: TaskState },
    /// A READY task is missing from the ready queue.
    ReadyNotQueued { task: TaskId },
    /// A sleep-set entry names a task that is not SLEEP.
    SleepingNotSleep { task: TaskId, state: TaskState },
    /// A SLEEP task is missing from the sleep set.
    SleepNotInSet { task: TaskId },
    /// `alive_count` disagrees with the number of non-DONE PCBs.
    AliveMismatch { recorded: u32, counted: u32 },
}

impl InvariantViolation {
    pub fn code(&self) -> u32 {
        match self {
            Self::MultipleRunning { .. } => 1,
            Self::RunningMismatch { .. } => 2,
            Self::QueuedNotReady { .. } => 3,
            Self::ReadyNotQueued { .. } => 4,
            Self::SleepingNotSleep { .. } => 5,
            Self::SleepNotInSet { .. } => 6,
            Self::AliveMismatch { .. } => 7,
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleRunning { first, second } => {
                write!(f, "both {first} and {second} are RUNNING")
            }
            Self::RunningMismatch { recorded, actual } => {
                write!(f, "running_id is {recorded:?} but RUNNING task is {actual:?}")
            }
            Self::QueuedNotReady { task, state } => {
                write!(f, "{task} is queued as ready while {state:?}")
            }
            Self::ReadyNotQueued { task } => write!(f, "{task} is READY but not queued"),
            Self::SleepingNotSleep { task, state } => {
                write!(f, "{task} is in the sleep set while {state:?}")
            }
            Self::SleepNotInSet { task } => write!(f, "{task} is SLEEP but has no wake entry"),
            Self::AliveMismatch { recorded, counted } => {
                write!(f, "alive_count is {recorded} but {counted} tasks are alive")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Errors that end a simulation run.
#[derive(Debug)]
#[non_exhaustive]
pub enum SimError {
    /// Startup aborted because a task entity could not be spawned.
    Spawn(SpawnError),
    /// Configuration rejected before any task was spawned.
    InvalidConfig { detail: String },
    /// The periodic timer could not be started.
    Timer(io::Error),
    /// A controller invariant broke after handling an event.
    Invariant {
        epoch: u64,
        violation: InvariantViolation,
    },
    /// The population did not finish within the configured epoch cap.
    EpochLimit { limit: u64 },
    /// The event substrate stopped delivering events before completion.
    SubstrateClosed { epoch: u64 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "startup aborted: {err}"),
            Self::InvalidConfig { detail } => write!(f, "invalid configuration: {detail}"),
            Self::Timer(err) => write!(f, "failed to start timer: {err}"),
            Self::Invariant { epoch, violation } => write!(
                f,
                "invariant {} violated at epoch {epoch}: {violation}",
                violation.code()
            ),
            Self::EpochLimit { limit } => {
                write!(f, "tasks still alive after {limit} epochs")
            }
            Self::SubstrateClosed { epoch } => {
                write!(f, "event substrate closed at epoch {epoch}")
            }
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Timer(err) => Some(err),
            Self::Invariant { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

impl From<SpawnError> for SimError {
    fn from(err: SpawnError) -> Self {
        Self::Spawn(err)
    }
}
